pub mod catalog;
pub mod crisis;
pub mod matcher;
pub mod models;
pub mod recommend;

pub use catalog::{CatalogError, ServiceCatalog, ServiceDefinition};
pub use crisis::{is_crisis, CRISIS_MESSAGE};
pub use matcher::match_services;
pub use models::*;
pub use recommend::{
    build_recommendations, compose_clarifying_question, draft_outreach_email,
    DECLINED_FOLLOW_UP, NO_MATCH_MESSAGE, RECOMMENDATION_PREAMBLE,
};
