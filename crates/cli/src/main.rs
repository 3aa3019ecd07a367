use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compass_agents::NavigatorAgent;
use compass_core::{Recommendation, ServiceCatalog, TurnInput};
use compass_observability::{init_tracing, AppMetrics};
use compass_reasoning::Reasoner;
use compass_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "compass")]
#[command(about = "Compass student support triage CLI")]
struct Cli {
    /// Catalog file override; defaults to the embedded catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive triage conversation.
    Chat,
    /// Print the loaded service catalog.
    Catalog,
    /// Run one turn against a fresh session and print the reply as JSON.
    Classify { text: String },
    /// Delete expired conversation state from the configured store.
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("compass_cli");
    let cli = Cli::parse();

    let agent = build_agent(cli.catalog.as_deref()).await?;

    match cli.command {
        Command::Chat => run_chat(agent).await?,
        Command::Catalog => {
            for service in agent.catalog().services() {
                println!("{} — {}", service.key, service.service_name);
                println!("  contact:  {}", service.contact);
                println!("  timeline: {}", service.timeline);
                println!("  keywords: {}", service.keywords.join(", "));
            }
        }
        Command::Classify { text } => {
            let reply = agent
                .handle_turn(TurnInput {
                    session_id: None,
                    text,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Purge => {
            let removed = agent.purge_expired_sessions().await?;
            println!("purged {removed} expired session(s)");
        }
    }

    Ok(())
}

async fn run_chat(agent: NavigatorAgent<Store>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Compass triage chat. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent
            .handle_turn(TurnInput {
                session_id: session_id.clone(),
                text: message.to_string(),
            })
            .await?;

        session_id = Some(reply.session_id.clone());

        if let Some(message) = &reply.message {
            println!("\n{message}\n");
        }
        if let Some(question) = &reply.clarifying_question {
            println!("\n{question}\n");
        }
        if let Some(recommendations) = &reply.recommended_services {
            for recommendation in recommendations {
                print_recommendation(recommendation);
            }
        }
    }

    Ok(())
}

fn print_recommendation(recommendation: &Recommendation) {
    println!("#{} {}", recommendation.priority_rank, recommendation.service_name);
    println!(
        "  confidence: {} ({})",
        recommendation.confidence_level.as_str(),
        recommendation.confidence_score
    );
    println!("  why:        {}", recommendation.reason);
    println!("  contact:    {}", recommendation.contact);
    println!("  timeline:   {}", recommendation.timeline);
    println!("  next steps: {}", recommendation.next_steps);
    println!("\n{}\n", recommendation.email_draft);
}

async fn build_agent(catalog_path: Option<&std::path::Path>) -> Result<NavigatorAgent<Store>> {
    let metrics = AppMetrics::shared();

    let catalog = match catalog_path {
        Some(path) => ServiceCatalog::load(path)
            .with_context(|| format!("failed loading catalog from {}", path.display()))?,
        None => match env::var("COMPASS_CATALOG_PATH") {
            Ok(path) if !path.trim().is_empty() => ServiceCatalog::load(path.trim())
                .context("failed loading catalog from COMPASS_CATALOG_PATH")?,
            _ => ServiceCatalog::builtin().context("builtin catalog failed validation")?,
        },
    };

    let store = Arc::new(Store::from_env().await?);
    let reasoner = Reasoner::from_env()?;

    Ok(NavigatorAgent::new(
        Arc::new(catalog),
        reasoner,
        store,
        metrics,
    ))
}
