//! Kotlin script engine
//!
//! Writes the submitted snapshot to a temp `.kts` file and runs
//! `kotlinc -script` on it, streaming stdout and stderr line by line onto
//! the output channel as they are produced.

use super::{EngineError, EventBus, ExecutionEngine, OUTPUT_CHANNEL, ShellEnv, Subscription};
use crate::config::EngineConfig;
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

/// Prefix for lines the script wrote to stderr
pub const STDERR_MARKER: &str = "⚠️ ";

const COMPLETED_MESSAGE: &str = "\n✅ Execution completed\n";

const INSTALL_HINT: &str = "❌ Kotlin compiler not found!\n\n\
     Please install Kotlin:\n\
     • macOS: brew install kotlin\n\
     • Linux: sudo snap install kotlin --classic\n\
     • Or via SDKMAN: sdk install kotlin\n";

/// Runs Kotlin scripts through the local `kotlinc`
pub struct KotlinEngine {
    bus: EventBus,
    config: EngineConfig,
    shell_env: ShellEnv,
}

impl KotlinEngine {
    /// Create an engine, resolving PATH from the login shell
    pub fn new(config: EngineConfig) -> Self {
        Self::with_shell_env(config, ShellEnv::resolve())
    }

    pub fn with_shell_env(config: EngineConfig, shell_env: ShellEnv) -> Self {
        Self {
            bus: EventBus::new(),
            config,
            shell_env,
        }
    }

    fn locate_compiler(&self) -> Option<PathBuf> {
        super::locate_compiler(
            &self.config.compiler,
            self.shell_env.path.as_deref(),
            home::home_dir().as_deref(),
        )
    }

    fn emit(&self, chunk: impl Into<String>) {
        self.bus.emit(OUTPUT_CHANNEL, chunk);
    }
}

/// Forward each line of a child stream as its own chunk
async fn forward_lines<R>(stream: Option<R>, bus: &EventBus, prefix: &str)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                bus.emit(OUTPUT_CHANNEL, format!("{}{}\n", prefix, line));
            }
            Ok(None) => break,
            Err(e) => {
                warn!("stopped reading script output: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl ExecutionEngine for KotlinEngine {
    async fn subscribe(&self, channel: &str) -> Result<Subscription, EngineError> {
        Ok(self.bus.subscribe(channel))
    }

    async fn run(&self, code: String) -> Result<(), EngineError> {
        let Some(compiler) = self.locate_compiler() else {
            self.emit(INSTALL_HINT);
            return Err(EngineError::CompilerNotFound);
        };

        // Kept alive until the child exits
        let mut script = tempfile::Builder::new()
            .prefix("kpad-")
            .suffix(&self.config.file_suffix)
            .tempfile()?;
        writeln!(script, "{}", code)?;
        script.flush()?;

        let mut command = Command::new(&compiler);
        command
            .arg(&self.config.script_flag)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = &self.shell_env.path {
            command.env("PATH", path);
        }
        if let Some(java_home) = &self.shell_env.java_home {
            command.env("JAVA_HOME", java_home);
        }

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: compiler.display().to_string(),
            source,
        })?;
        info!(compiler = %compiler.display(), script = %script.path().display(), "script started");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.config.timeout();

        let finished = tokio::time::timeout(limit, async {
            let (status, (), ()) = tokio::join!(
                child.wait(),
                forward_lines(stdout, &self.bus, ""),
                forward_lines(stderr, &self.bus, STDERR_MARKER),
            );
            status
        })
        .await;

        let status = match finished {
            Ok(status) => status?,
            Err(_) => {
                warn!(limit_secs = limit.as_secs(), "script timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!("failed to kill timed out script: {}", e);
                }
                return Err(EngineError::Timeout(limit));
            }
        };

        info!(%status, "script exited");
        if status.success() {
            self.emit(COMPLETED_MESSAGE);
            Ok(())
        } else {
            Err(EngineError::Exit(status))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// A stand-in compiler: a shell script invoked as `<script> -script <file>`
    fn fake_compiler(dir: &Path, body: &str) -> Result<PathBuf, String> {
        let path = dir.join("fake-kotlinc");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).map_err(|e| e.to_string())?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(|e| e.to_string())?;
        Ok(path)
    }

    fn engine_for(compiler: &Path, timeout_secs: u64) -> KotlinEngine {
        let config = EngineConfig {
            compiler: compiler.display().to_string(),
            timeout_secs,
            ..EngineConfig::default()
        };
        KotlinEngine::with_shell_env(config, ShellEnv::inherited())
    }

    fn drain(sub: &mut Subscription) -> String {
        let mut out = String::new();
        while let Some(chunk) = sub.try_recv() {
            out.push_str(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn test_streams_stdout_and_stderr() -> Result<(), String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let compiler = fake_compiler(dir.path(), "cat \"$2\"\necho \"careful\" >&2")?;
        let engine = engine_for(&compiler, 10);

        let mut sub = engine
            .subscribe(OUTPUT_CHANNEL)
            .await
            .map_err(|e| e.to_string())?;
        engine
            .run("println(\"hi\")".to_string())
            .await
            .map_err(|e| e.to_string())?;

        let out = drain(&mut sub);
        assert!(out.contains("println(\"hi\")\n"), "output: {:?}", out);
        assert!(out.contains("⚠️ careful\n"), "output: {:?}", out);
        assert!(out.ends_with(COMPLETED_MESSAGE), "output: {:?}", out);
        Ok(())
    }

    #[tokio::test]
    async fn test_script_flag_and_suffix() -> Result<(), String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let compiler = fake_compiler(dir.path(), "echo \"$1 ${2##*.}\"")?;
        let engine = engine_for(&compiler, 10);

        let mut sub = engine
            .subscribe(OUTPUT_CHANNEL)
            .await
            .map_err(|e| e.to_string())?;
        engine.run(String::new()).await.map_err(|e| e.to_string())?;

        assert!(drain(&mut sub).starts_with("-script kts\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_rejection() -> Result<(), String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let compiler = fake_compiler(dir.path(), "echo partial\nexit 3")?;
        let engine = engine_for(&compiler, 10);

        let mut sub = engine
            .subscribe(OUTPUT_CHANNEL)
            .await
            .map_err(|e| e.to_string())?;
        let result = engine.run("x".to_string()).await;

        assert!(matches!(result, Err(EngineError::Exit(status)) if status.code() == Some(3)));
        let out = drain(&mut sub);
        assert_eq!(out, "partial\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_kills_script() -> Result<(), String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let compiler = fake_compiler(dir.path(), "echo started\nexec sleep 30")?;
        let engine = engine_for(&compiler, 1);

        let result = engine.run("x".to_string()).await;
        assert!(matches!(result, Err(EngineError::Timeout(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_compiler() -> Result<(), String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let engine = engine_for(&dir.path().join("no-kotlinc"), 10);

        let mut sub = engine
            .subscribe(OUTPUT_CHANNEL)
            .await
            .map_err(|e| e.to_string())?;
        let result = engine.run("x".to_string()).await;

        assert!(matches!(result, Err(EngineError::CompilerNotFound)));
        assert!(drain(&mut sub).contains("brew install kotlin"));
        Ok(())
    }
}
