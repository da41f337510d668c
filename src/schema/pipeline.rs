//! Schema pipeline driver
//!
//! Runs a [`SchemaMachine`] inside a tokio task. Edits arrive over a command
//! channel; timer expiries and apply completions come back over an internal
//! event channel tagged with their sequence number. Observers read
//! [`SchemaSnapshot`]s from a `watch` channel.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::machine::{ApplyReport, ApplyStage, Effect, SchemaMachine, SchemaState};
use crate::config::{PlaygroundConfig, TeardownPolicy};
use crate::engine::SharedEngine;
use crate::error::{Error, Result};
use crate::model::{SchemaApplyError, SourceDocument};

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Quiet period before an edit is applied
    pub debounce: Duration,
    /// Step run before every apply
    pub teardown: TeardownPolicy,
    /// Clear the standing error on every edit
    pub clear_error_on_edit: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PlaygroundConfig::default())
    }
}

impl From<&PlaygroundConfig> for PipelineOptions {
    fn from(config: &PlaygroundConfig) -> Self {
        Self {
            debounce: config.debounce(),
            teardown: config.teardown.clone(),
            clear_error_on_edit: config.clear_error_on_edit,
        }
    }
}

/// Point-in-time view of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    pub state: SchemaState,
    /// Scheduled apply waiting behind a running one
    pub pending: Option<u64>,
    /// Standing schema error
    pub error: Option<SchemaApplyError>,
    /// Increases by one on every successful apply
    pub refresh_generation: u64,
    /// Highest edit sequence number the pipeline has received
    pub latest_seq: u64,
}

impl SchemaSnapshot {
    fn capture(machine: &SchemaMachine) -> Self {
        Self {
            state: machine.state(),
            pending: machine.pending_seq(),
            error: machine.error().cloned(),
            refresh_generation: machine.refresh_generation(),
            latest_seq: machine.latest_seq(),
        }
    }

    /// Nothing scheduled and nothing running
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_none()
            && matches!(self.state, SchemaState::Idle | SchemaState::Settled { .. })
    }
}

enum Command {
    Edit { seq: u64, document: SourceDocument },
    Shutdown,
}

enum Event {
    TimerElapsed(u64),
    Settled(u64, ApplyReport),
}

/// Handle to a running schema pipeline
pub struct SchemaPipeline {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SchemaSnapshot>,
    next_seq: AtomicU64,
    task: JoinHandle<()>,
}

impl SchemaPipeline {
    /// Start the pipeline on the current tokio runtime
    pub fn spawn(engine: SharedEngine, options: PipelineOptions) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let machine = SchemaMachine::new(options.clear_error_on_edit);
        let (snapshot_tx, snapshots) = watch::channel(SchemaSnapshot::capture(&machine));

        let driver = Driver {
            engine,
            options,
            machine,
            snapshots: snapshot_tx,
            timer: None,
        };
        let task = tokio::spawn(driver.run(command_rx));

        Self {
            commands,
            snapshots,
            next_seq: AtomicU64::new(0),
            task,
        }
    }

    /// Report a new version of the schema document.
    ///
    /// Returns the sequence number assigned to the edit.
    pub fn edit(&self, document: impl Into<SourceDocument>) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.commands
            .send(Command::Edit {
                seq,
                document: document.into(),
            })
            .map_err(|_| Error::PipelineClosed)?;
        Ok(seq)
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> SchemaSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<SchemaSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until every edit issued so far has been applied or superseded
    /// and no apply is running.
    pub async fn settled(&self) -> Result<SchemaSnapshot> {
        let target = self.next_seq.load(Ordering::SeqCst);
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| s.latest_seq >= target && s.is_quiescent())
            .await
            .map_err(|_| Error::PipelineClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop accepting edits without waiting for the driver to exit.
    ///
    /// A running apply finishes; a scheduled one is dropped.
    pub fn close(&self) {
        // The driver may already be gone.
        let _ = self.commands.send(Command::Shutdown);
    }

    /// Stop the pipeline and wait for the driver to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.close();
        self.task
            .await
            .map_err(|e| Error::Internal(format!("schema pipeline task failed: {}", e)))
    }
}

struct Driver {
    engine: SharedEngine,
    options: PipelineOptions,
    machine: SchemaMachine,
    snapshots: watch::Sender<SchemaSnapshot>,
    timer: Option<(u64, JoinHandle<()>)>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let mut closing = false;

        loop {
            if closing && !self.machine.is_applying() {
                break;
            }

            let effects = tokio::select! {
                command = commands.recv(), if !closing => match command {
                    Some(Command::Edit { seq, document }) => self.machine.edit(seq, document),
                    Some(Command::Shutdown) | None => {
                        debug!("Schema pipeline shutting down");
                        closing = true;
                        self.machine.cancel_pending();
                        self.disarm_all();
                        Vec::new()
                    }
                },
                Some(event) = events.recv() => match event {
                    Event::TimerElapsed(seq) => self.machine.timer_elapsed(seq),
                    Event::Settled(seq, report) => self.machine.apply_settled(seq, report),
                },
            };

            for effect in effects {
                if closing {
                    break;
                }
                self.perform(effect, &event_tx);
            }
            self.snapshots
                .send_replace(SchemaSnapshot::capture(&self.machine));
        }

        debug!("Schema pipeline stopped");
    }

    fn perform(&mut self, effect: Effect, events: &mpsc::UnboundedSender<Event>) {
        match effect {
            Effect::ArmTimer { seq } => {
                let delay = self.options.debounce;
                let events = events.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(Event::TimerElapsed(seq));
                });
                if let Some((_, old)) = self.timer.replace((seq, handle)) {
                    old.abort();
                }
            }
            Effect::DisarmTimer { seq } => {
                if let Some((armed, handle)) = self.timer.take() {
                    if armed == seq {
                        handle.abort();
                    } else {
                        self.timer = Some((armed, handle));
                    }
                }
            }
            Effect::BeginApply { seq, document } => {
                let engine = self.engine.clone();
                let teardown = self.options.teardown.clone();
                let events = events.clone();
                let span = info_span!("schema_apply", seq);
                tokio::spawn(
                    async move {
                        let report = apply_schema(&engine, &teardown, &document).await;
                        let _ = events.send(Event::Settled(seq, report));
                    }
                    .instrument(span),
                );
            }
        }
    }

    fn disarm_all(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.abort();
        }
    }
}

/// Tear down the previous schema, then apply `document`.
///
/// A failed teardown skips the apply.
async fn apply_schema(
    engine: &SharedEngine,
    teardown: &TeardownPolicy,
    document: &SourceDocument,
) -> ApplyReport {
    let started = Instant::now();

    let reset = match teardown {
        TeardownPolicy::DropAll => engine.reset().await,
        TeardownPolicy::Script { sql } => engine.apply(sql).await,
    };
    if let Err(e) = reset {
        warn!(error = %e, "Schema teardown failed");
        return ApplyReport::Failed {
            stage: ApplyStage::Teardown,
            message: e.message(),
        };
    }

    match engine.apply(document.text()).await {
        Ok(()) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            info!(elapsed_ms, "Database schema updated");
            ApplyReport::Applied { elapsed_ms }
        }
        Err(e) => {
            warn!(error = %e, "Schema update failed");
            ApplyReport::Failed {
                stage: ApplyStage::Schema,
                message: e.message(),
            }
        }
    }
}
