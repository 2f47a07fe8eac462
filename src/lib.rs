//! Football Match Analysis Context Service
//!
//! A match is analyzed once: data collection (~25 provider calls), eight
//! bet-type analyzers, then the context is persisted and every subsequent
//! question is served from the store (0 provider calls).

pub mod agent;
pub mod analyzers;
pub mod api;
pub mod bundle;
pub mod collector;
pub mod config;
pub mod context;
pub mod entity_cache;
pub mod error;
pub mod http;
pub mod jsonutil;
pub mod lock;
pub mod status;
pub mod store;

pub use agent::{ContextAgent, ContextResult, ContextSource};
pub use bundle::RawBundle;
pub use config::Config;
pub use context::{BetAnalysisData, MatchContext, MatchMetadata};
pub use error::{AgentError, ApiError, LockError, StoreError};
