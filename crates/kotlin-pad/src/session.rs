//! Execution Session Controller
//!
//! Drives one submission at a time through
//! `Idle -> Submitting -> Streaming -> (Completed | Failed) -> Idle`.
//!
//! The controller is owned by the event loop and never shared: the output
//! buffer and the in-flight latch are plain fields. The only concurrent piece
//! is the engine's `run`, which is spawned as a task once the output
//! subscription is live. Chunks and the task's result are pulled back in by
//! [`ExecutionController::pump`], which the event loop selects on alongside
//! terminal input.

use crate::engine::{EngineError, ExecutionEngine, OUTPUT_CHANNEL, Subscription};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where the controller is in a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Waiting for the output subscription
    Submitting,
    /// Run command issued, chunks flowing
    Streaming,
}

/// How the most recent submission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

/// Why a submission was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// A previous submission is still running
    Busy,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Busy => write!(f, "Still running, wait for the current run to finish"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// What [`ExecutionController::pump`] just applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A chunk was appended to the output
    Output,
    Finished(Outcome),
}

/// Something that happened to the active run
#[derive(Debug)]
enum SessionEvent {
    Chunk(String),
    Finished(Result<(), EngineError>),
}

/// Append-only output of the current submission
#[derive(Debug, Clone, Default)]
struct OutputBuffer {
    text: String,
    chunks: usize,
}

impl OutputBuffer {
    fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }

    fn clear(&mut self) {
        self.text.clear();
        self.chunks = 0;
    }
}

struct ActiveRun {
    subscription: Subscription,
    handle: JoinHandle<Result<(), EngineError>>,
}

pub struct ExecutionController {
    engine: Arc<dyn ExecutionEngine>,
    in_flight: bool,
    phase: Phase,
    output: OutputBuffer,
    active: Option<ActiveRun>,
    last_outcome: Option<Outcome>,
}

impl ExecutionController {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine,
            in_flight: false,
            phase: Phase::Idle,
            output: OutputBuffer::default(),
            active: None,
            last_outcome: None,
        }
    }

    /// Start running `code`.
    ///
    /// Rejected with [`SubmitError::Busy`] while a run is in flight, leaving
    /// output and latch untouched. Otherwise the output is cleared, the
    /// subscription is awaited, and only then is the run command spawned.
    /// A subscription failure is reported in the output and ends the
    /// submission without issuing the run.
    pub async fn submit(&mut self, code: String) -> Result<(), SubmitError> {
        if self.in_flight {
            warn!("submission rejected, run already in flight");
            return Err(SubmitError::Busy);
        }

        self.in_flight = true;
        self.phase = Phase::Submitting;
        self.output.clear();
        self.last_outcome = None;
        info!(bytes = code.len(), "submission accepted");

        let subscription = match self.engine.subscribe(OUTPUT_CHANNEL).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.finish(Err(e));
                return Ok(());
            }
        };
        debug!(channel = subscription.channel(), "output subscription open");

        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(async move { engine.run(code).await });
        self.active = Some(ActiveRun {
            subscription,
            handle,
        });
        self.phase = Phase::Streaming;
        Ok(())
    }

    /// Wait for the next chunk or the end of the active run and apply it.
    ///
    /// Never resolves while idle, so it can sit in a `select!` permanently.
    /// Cancel-safe: dropping the future loses nothing.
    pub async fn pump(&mut self) -> SessionUpdate {
        let Some(active) = self.active.as_mut() else {
            return std::future::pending().await;
        };

        let event = tokio::select! {
            biased;
            Some(chunk) = active.subscription.recv() => SessionEvent::Chunk(chunk),
            joined = &mut active.handle => {
                SessionEvent::Finished(joined.unwrap_or_else(|e| {
                    Err(EngineError::Rejected(format!("execution task failed: {}", e)))
                }))
            }
        };
        self.apply(event)
    }

    /// Apply one event to the session state
    fn apply(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::Chunk(chunk) => {
                self.output.push(&chunk);
                SessionUpdate::Output
            }
            SessionEvent::Finished(result) => SessionUpdate::Finished(self.finish(result)),
        }
    }

    /// Teardown shared by success and failure: drain, release, unlatch
    fn finish(&mut self, result: Result<(), EngineError>) -> Outcome {
        if let Some(mut active) = self.active.take() {
            active.subscription.unsubscribe();
            while let Some(chunk) = active.subscription.try_recv() {
                self.output.push(&chunk);
            }
            debug!(chunks = self.output.chunks, "output subscription released");
        }

        let outcome = match result {
            Ok(()) => {
                info!("run completed");
                Outcome::Completed
            }
            Err(e) => {
                error!("run failed: {}", e);
                self.output.push(&format!("\nSystem Error: {}", e));
                Outcome::Failed
            }
        };

        self.last_outcome = Some(outcome);
        self.phase = Phase::Idle;
        self.in_flight = false;
        outcome
    }

    /// Concatenated output of the current (or last) submission
    pub fn output(&self) -> &str {
        &self.output.text
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// In flight and nothing received yet
    pub fn awaiting_output(&self) -> bool {
        self.in_flight && self.output.text.is_empty()
    }

    /// Clear the console. Only allowed while idle; returns whether it did.
    pub fn clear_output(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.output.clear();
        self.last_outcome = None;
        true
    }
}
