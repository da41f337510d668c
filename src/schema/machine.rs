//! Schema application state machine
//!
//! [`SchemaMachine`] holds the debounce/apply/report state for the schema
//! document and nothing else: it owns no timers and performs no I/O. Every
//! input returns the [`Effect`]s the driver must carry out. Timer expiries and
//! apply completions carry the sequence number they were issued for, and any
//! whose sequence is no longer live is discarded.

use serde::Serialize;
use tracing::debug;

use crate::model::{ExecutionOutcome, SchemaApplyError, SourceDocument};
use crate::resolver;

/// Externally visible pipeline state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchemaState {
    /// Nothing edited yet
    Idle,
    /// An edit is waiting for its debounce timer
    Scheduled { seq: u64 },
    /// An apply is running against the engine
    Applying { seq: u64 },
    /// The last apply finished
    Settled {
        seq: u64,
        outcome: ExecutionOutcome,
    },
}

/// Work the driver must perform after an input
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the debounce timer for `seq`
    ArmTimer { seq: u64 },
    /// Cancel the debounce timer of a superseded edit
    DisarmTimer { seq: u64 },
    /// Tear down and apply `document` against the engine
    BeginApply { seq: u64, document: SourceDocument },
}

/// Which step of an apply failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStage {
    Teardown,
    Schema,
}

/// Completion report of one apply
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyReport {
    Applied { elapsed_ms: f64 },
    Failed { stage: ApplyStage, message: String },
}

/// A scheduled apply that has not started yet
#[derive(Debug, Clone)]
struct PendingApplication {
    seq: u64,
    document: SourceDocument,
    /// The debounce timer already fired while another apply was running
    due: bool,
}

/// The apply currently running
#[derive(Debug, Clone)]
struct InFlight {
    seq: u64,
    document: SourceDocument,
}

/// Debounce/apply/report state machine for the schema document
#[derive(Debug, Default)]
pub struct SchemaMachine {
    clear_error_on_edit: bool,
    latest_seq: u64,
    pending: Option<PendingApplication>,
    in_flight: Option<InFlight>,
    settled: Option<(u64, ExecutionOutcome)>,
    error: Option<SchemaApplyError>,
    refresh_generation: u64,
}

impl SchemaMachine {
    /// Create an idle machine
    pub fn new(clear_error_on_edit: bool) -> Self {
        Self {
            clear_error_on_edit,
            ..Self::default()
        }
    }

    /// The document changed.
    ///
    /// `seq` must increase with every edit; an edit that is not newer than the
    /// latest one seen is ignored.
    pub fn edit(&mut self, seq: u64, document: SourceDocument) -> Vec<Effect> {
        if seq <= self.latest_seq {
            debug!(seq, latest = self.latest_seq, "Ignoring out-of-order schema edit");
            return Vec::new();
        }
        self.latest_seq = seq;

        let mut effects = Vec::new();
        if let Some(old) = self.pending.take() {
            debug!(superseded = old.seq, seq, "Schema edit supersedes pending apply");
            effects.push(Effect::DisarmTimer { seq: old.seq });
        }

        self.pending = Some(PendingApplication {
            seq,
            document,
            due: false,
        });
        if self.clear_error_on_edit {
            self.error = None;
        }

        effects.push(Effect::ArmTimer { seq });
        effects
    }

    /// The debounce timer of `seq` elapsed
    pub fn timer_elapsed(&mut self, seq: u64) -> Vec<Effect> {
        let pending = match self.pending.as_mut() {
            Some(pending) if pending.seq == seq => pending,
            _ => {
                debug!(seq, "Discarding stale debounce timer");
                return Vec::new();
            }
        };

        if self.in_flight.is_some() {
            debug!(seq, "Debounce elapsed during apply, deferring");
            pending.due = true;
            return Vec::new();
        }

        self.start_pending()
    }

    /// The apply of `seq` finished
    pub fn apply_settled(&mut self, seq: u64, report: ApplyReport) -> Vec<Effect> {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.seq == seq => in_flight,
            other => {
                debug!(seq, "Discarding stale apply completion");
                self.in_flight = other;
                return Vec::new();
            }
        };

        let outcome = match report {
            ApplyReport::Applied { elapsed_ms } => {
                self.error = None;
                self.refresh_generation += 1;
                ExecutionOutcome::Success {
                    rows: Vec::new(),
                    elapsed_ms,
                }
            }
            ApplyReport::Failed { stage, message } => {
                let location = match stage {
                    ApplyStage::Schema => resolver::resolve(&message, &in_flight.document),
                    ApplyStage::Teardown => None,
                };
                self.error = Some(SchemaApplyError {
                    message: message.clone(),
                    location,
                    seq,
                    source: in_flight.document.clone(),
                });
                ExecutionOutcome::Failure { message, location }
            }
        };
        self.settled = Some((seq, outcome));

        match &self.pending {
            Some(pending) if pending.due => self.start_pending(),
            _ => Vec::new(),
        }
    }

    /// Drop the scheduled apply, if any. A running apply is unaffected.
    pub fn cancel_pending(&mut self) -> Option<u64> {
        self.pending.take().map(|p| p.seq)
    }

    fn start_pending(&mut self) -> Vec<Effect> {
        match self.pending.take() {
            Some(PendingApplication { seq, document, .. }) => {
                self.in_flight = Some(InFlight {
                    seq,
                    document: document.clone(),
                });
                vec![Effect::BeginApply { seq, document }]
            }
            None => Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> SchemaState {
        if let Some(in_flight) = &self.in_flight {
            SchemaState::Applying { seq: in_flight.seq }
        } else if let Some(pending) = &self.pending {
            SchemaState::Scheduled { seq: pending.seq }
        } else if let Some((seq, outcome)) = &self.settled {
            SchemaState::Settled {
                seq: *seq,
                outcome: outcome.clone(),
            }
        } else {
            SchemaState::Idle
        }
    }

    /// Sequence number of the scheduled apply, if any
    pub fn pending_seq(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.seq)
    }

    /// Whether an apply is running
    pub fn is_applying(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Highest edit sequence number seen
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// The standing schema error
    pub fn error(&self) -> Option<&SchemaApplyError> {
        self.error.as_ref()
    }

    /// Number of successful applies so far
    pub fn refresh_generation(&self) -> u64 {
        self.refresh_generation
    }
}
