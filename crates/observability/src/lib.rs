use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    turns_total: AtomicU64,
    crisis_total: AtomicU64,
    model_inference_total: AtomicU64,
    keyword_fallback_total: AtomicU64,
    recommendations_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub turns_total: u64,
    pub crisis_total: u64,
    pub model_inference_total: u64,
    pub keyword_fallback_total: u64,
    pub recommendations_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_turn(&self) {
        self.turns_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_crisis(&self) {
        self.crisis_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_inference(&self) {
        self.model_inference_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_keyword_fallback(&self) {
        self.keyword_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_recommendations(&self, count: usize) {
        self.recommendations_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let turns = self.turns_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            turns_total: turns,
            crisis_total: self.crisis_total.load(Ordering::Relaxed),
            model_inference_total: self.model_inference_total.load(Ordering::Relaxed),
            keyword_fallback_total: self.keyword_fallback_total.load(Ordering::Relaxed),
            recommendations_total: self.recommendations_total.load(Ordering::Relaxed),
            avg_latency_millis: if turns == 0 {
                0.0
            } else {
                latency as f64 / turns as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,compass_api=info,compass_agents=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
