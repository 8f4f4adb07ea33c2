//! Meta Supervisor
//!
//! Single entry point for Korean/English natural-language requests about
//! stock markets and trading strategies:
//! - Extracts an intent and entities from the query with a keyword table
//! - Routes each intent to exactly one backend operation
//! - Falls back to a degraded answer when market analysis is unreachable
//! - Wraps every outcome in a uniform response envelope
//! - Offers a conversational agent path with tool calling beside the table
//!
//! DISPATCH LOOP:
//! QUERY → EXTRACT → DISPATCH TABLE → ADAPTER → BACKEND → ENVELOPE

pub mod adapters;
pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routing;
pub mod supervisor;
pub mod tokenizer;
pub mod transport;

pub use error::{OrchestrationError, Result};

// Re-export common types
pub use classifier::IntentAnalyzer;
pub use config::Settings;
pub use envelope::{extract_answer, ResponseEnvelope};
pub use models::*;
pub use supervisor::Supervisor;
