//! Query execution module

pub mod orchestrator;

pub use orchestrator::{QueryOrchestrator, QueryRun, EMPTY_QUERY_MESSAGE};
