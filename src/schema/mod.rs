//! Schema application module
//!
//! Turns a stream of schema edits into debounced, strictly sequential applies
//! against the engine:
//! - `machine`: the pure debounce/apply/report state machine
//! - `pipeline`: the tokio driver owning timers and engine calls

pub mod machine;
pub mod pipeline;

pub use machine::{ApplyReport, ApplyStage, Effect, SchemaMachine, SchemaState};
pub use pipeline::{PipelineOptions, SchemaPipeline, SchemaSnapshot};
