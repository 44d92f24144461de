//! Execution Engine Boundary
//!
//! Whatever runs the code is reached through two calls: subscribe to a named
//! output channel, then run a snapshot of the buffer. Output chunks arrive on
//! the subscription while the run is pending; the run's result is the only
//! terminal signal.

mod bus;
mod kotlin;
mod shell_env;
#[cfg(test)]
pub(crate) mod testing;

pub use bus::{EventBus, Subscription};
pub use kotlin::{KotlinEngine, STDERR_MARKER};
pub use shell_env::{ShellEnv, locate_compiler};

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

/// Channel carrying execution output chunks
pub const OUTPUT_CHANNEL: &str = "stream-data";

/// Why a run (or the subscription before it) was rejected
#[derive(Debug)]
pub enum EngineError {
    /// No compiler on PATH or in the usual install locations
    CompilerNotFound,
    /// The compiler could not be started
    Spawn { program: String, source: io::Error },
    /// The script exited unsuccessfully
    Exit(ExitStatus),
    /// The script ran longer than the configured limit and was killed
    Timeout(Duration),
    /// Temp file or process I/O failed
    Io(io::Error),
    /// The output channel could not be opened
    Subscribe(String),
    /// Any other rejection reported by an engine
    Rejected(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::CompilerNotFound => write!(f, "Kotlin compiler not found"),
            EngineError::Spawn { program, source } => {
                write!(f, "Failed to start {}: {}", program, source)
            }
            EngineError::Exit(status) => write!(f, "Process exited with: {}", status),
            EngineError::Timeout(limit) => write!(
                f,
                "Timeout: execution exceeded {}s (infinite loop? blocking I/O?)",
                limit.as_secs()
            ),
            EngineError::Io(e) => write!(f, "I/O error: {}", e),
            EngineError::Subscribe(msg) => write!(f, "Could not subscribe to output: {}", msg),
            EngineError::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Spawn { source, .. } => Some(source),
            EngineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::Io(e)
    }
}

/// Runs source text and streams its output on named channels
#[async_trait]
pub trait ExecutionEngine: Send + Sync + 'static {
    /// Open a listener on `channel`. The returned subscription is live
    /// (receiving) by the time this resolves.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, EngineError>;

    /// Run `code` to completion. Output goes to [`OUTPUT_CHANNEL`].
    async fn run(&self, code: String) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        assert_eq!(
            EngineError::CompilerNotFound.to_string(),
            "Kotlin compiler not found"
        );
        assert_eq!(EngineError::Rejected("boom".into()).to_string(), "boom");
        assert!(
            EngineError::Timeout(Duration::from_secs(5))
                .to_string()
                .contains("5s")
        );
    }

    #[test]
    fn test_error_source() {
        let err = EngineError::Spawn {
            program: "kotlinc".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("kotlinc"));
        assert!(EngineError::CompilerNotFound.source().is_none());
    }
}
