mod client;
pub mod types;

pub use client::{DEFAULT_HEALTH_PATH, TemplateClient};
