//! In-memory engine for controller and app tests.

use super::{EngineError, EventBus, ExecutionEngine, OUTPUT_CHANNEL, Subscription};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Emits a fixed list of chunks, then resolves with a fixed result
pub struct ScriptedEngine {
    pub bus: EventBus,
    chunks: Vec<String>,
    failure: Option<String>,
    fail_subscribe: bool,
    panic_on_run: bool,
    gate: Option<Notify>,
    runs: AtomicUsize,
    submitted: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bus: EventBus::new(),
            chunks: chunks.into_iter().map(Into::into).collect(),
            failure: None,
            fail_subscribe: false,
            panic_on_run: false,
            gate: None,
            runs: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Reject the run with this message after emitting the chunks
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_run = true;
        self
    }

    /// Emit the first chunk, then hold the run open until [`Self::release`]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn listeners(&self) -> usize {
        self.bus.listener_count(OUTPUT_CHANNEL)
    }
}

#[async_trait]
impl ExecutionEngine for ScriptedEngine {
    async fn subscribe(&self, channel: &str) -> Result<Subscription, EngineError> {
        if self.fail_subscribe {
            return Err(EngineError::Subscribe("channel unavailable".to_string()));
        }
        Ok(self.bus.subscribe(channel))
    }

    async fn run(&self, code: String) -> Result<(), EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(code);
        }
        if self.panic_on_run {
            panic!("engine crashed");
        }

        let mut chunks = self.chunks.iter();
        if let Some(gate) = &self.gate {
            if let Some(first) = chunks.next() {
                self.bus.emit(OUTPUT_CHANNEL, first.clone());
            }
            gate.notified().await;
        }
        for chunk in chunks {
            self.bus.emit(OUTPUT_CHANNEL, chunk.clone());
        }

        match &self.failure {
            Some(message) => Err(EngineError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}
