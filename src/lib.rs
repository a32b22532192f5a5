//! Sales Insight Orchestrator
//!
//! Answers natural-language analytics questions about a sales/product
//! dataset:
//! - Classifies intent (analytics vs. chat) with the generation service
//! - Translates approved questions into a validated aggregation pipeline
//! - Injects date-window filters deterministically, never via the model
//! - Executes against MongoDB under a fixed time bound
//! - Summarizes the records, suggests a chart and renders an image
//!
//! PER-REQUEST FLOW:
//! CLASSIFY → TRANSLATE → FILTER → EXECUTE → SUMMARIZE → ASSEMBLE

pub mod agent;
pub mod api;
pub mod assembler;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fence;
pub mod filters;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod store;
pub mod summarizer;
pub mod translator;

pub use error::Result;

// Re-export common types
pub use agent::{Answer, Orchestrator, RequestOutcome};
pub use config::AppConfig;
pub use models::*;
