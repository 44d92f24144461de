//! Login-shell environment and compiler discovery
//!
//! A terminal launched from a desktop launcher or IDE often has a stripped
//! PATH that misses Homebrew/SDKMAN installs. The login shell's PATH (and on
//! macOS its JAVA_HOME) is captured once and handed to child processes
//! explicitly; the process environment itself is never modified.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

const PATH_MARKER: &str = "__PATH__";
const JAVA_MARKER: &str = "__JAVA__";

/// Environment variables recovered from the user's login shell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellEnv {
    pub path: Option<String>,
    pub java_home: Option<String>,
}

impl ShellEnv {
    /// Ask the login shell for PATH and JAVA_HOME, falling back to our own
    pub fn resolve() -> Self {
        let mut resolved = query_login_shell().unwrap_or_default();
        if resolved.path.is_none() {
            resolved.path = env::var("PATH").ok();
        }
        info!(path = ?resolved.path, java_home = ?resolved.java_home, "resolved shell environment");
        resolved
    }

    /// The current process environment only; no shell is spawned
    pub fn inherited() -> Self {
        Self {
            path: env::var("PATH").ok(),
            java_home: env::var("JAVA_HOME").ok(),
        }
    }
}

#[cfg(unix)]
fn query_login_shell() -> Option<ShellEnv> {
    let default_shell = if cfg!(target_os = "macos") {
        "/bin/zsh"
    } else {
        "/bin/bash"
    };
    let shell = env::var("SHELL").unwrap_or_else(|_| default_shell.to_string());

    let mut command = Command::new(&shell);
    command.arg("-l");
    if cfg!(target_os = "macos") {
        // zsh only reads .zshrc for interactive shells
        command.arg("-i");
    }
    let output = command
        .arg("-c")
        .arg(format!(
            "echo \"{}$PATH\" && echo \"{}$JAVA_HOME\"",
            PATH_MARKER, JAVA_MARKER
        ))
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;

    debug!(shell = %shell, status = %output.status, "queried login shell");
    Some(parse_markers(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(not(unix))]
fn query_login_shell() -> Option<ShellEnv> {
    None
}

/// Pick the marker lines out of shell output (rc files may print noise)
fn parse_markers(stdout: &str) -> ShellEnv {
    let mut env = ShellEnv::default();
    for line in stdout.lines() {
        if let Some(path) = line.strip_prefix(PATH_MARKER) {
            let path = path.trim();
            if !path.is_empty() {
                env.path = Some(path.to_string());
            }
        } else if let Some(java_home) = line.strip_prefix(JAVA_MARKER) {
            let java_home = java_home.trim();
            if !java_home.is_empty() {
                env.java_home = Some(java_home.to_string());
            }
        }
    }
    env
}

/// Well-known install locations, checked after PATH
fn common_locations(program: &str, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![
        // Homebrew (Apple Silicon)
        PathBuf::from("/opt/homebrew/bin").join(program),
        // Homebrew (Intel)
        PathBuf::from("/usr/local/bin").join(program),
        PathBuf::from("/usr/bin").join(program),
        // Snap (Linux)
        PathBuf::from("/snap/bin").join(program),
    ];
    if let Some(home) = home {
        // SDKMAN
        paths.push(home.join(".sdkman/candidates/kotlin/current/bin").join(program));
        paths.push(
            home.join(".local/share/JetBrains/Toolbox/scripts")
                .join(program),
        );
    }
    paths
}

/// Find the compiler executable.
///
/// `program` may be an explicit path (used as-is if it exists) or a bare
/// name, which is searched on `path` and then in the usual install
/// locations.
pub fn locate_compiler(program: &str, path: Option<&str>, home: Option<&Path>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let on_path = path
        .into_iter()
        .flat_map(env::split_paths)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file());
    if let Some(found) = on_path {
        debug!(path = %found.display(), "found compiler on PATH");
        return Some(found);
    }

    let found = common_locations(program, home)
        .into_iter()
        .find(|p| p.is_file());
    match &found {
        Some(p) => debug!(path = %p.display(), "found compiler in install location"),
        None => info!(program, "compiler not found on PATH or in install locations"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_markers_ignores_noise() {
        let out = "Welcome to zsh!\n__PATH__/opt/homebrew/bin:/usr/bin\n__JAVA__/Library/Java/Home\n";
        let env = parse_markers(out);
        assert_eq!(env.path.as_deref(), Some("/opt/homebrew/bin:/usr/bin"));
        assert_eq!(env.java_home.as_deref(), Some("/Library/Java/Home"));
    }

    #[test]
    fn test_parse_markers_empty_values() {
        let env = parse_markers("__PATH__\n__JAVA__\n");
        assert_eq!(env, ShellEnv::default());
    }

    #[test]
    fn test_locate_on_path() -> Result<(), String> {
        let first = TempDir::new().map_err(|e| e.to_string())?;
        let second = TempDir::new().map_err(|e| e.to_string())?;
        let compiler = second.path().join("kotlinc-test");
        fs::write(&compiler, "#!/bin/sh\n").map_err(|e| e.to_string())?;

        let path = env::join_paths([first.path(), second.path()]).map_err(|e| e.to_string())?;
        let found = locate_compiler("kotlinc-test", path.to_str(), None);
        assert_eq!(found, Some(compiler));
        Ok(())
    }

    #[test]
    fn test_locate_in_sdkman_home() -> Result<(), String> {
        let home = TempDir::new().map_err(|e| e.to_string())?;
        let bin = home.path().join(".sdkman/candidates/kotlin/current/bin");
        fs::create_dir_all(&bin).map_err(|e| e.to_string())?;
        fs::write(bin.join("kotlinc-sdk-test"), "").map_err(|e| e.to_string())?;

        let found = locate_compiler("kotlinc-sdk-test", Some(""), Some(home.path()));
        assert_eq!(found, Some(bin.join("kotlinc-sdk-test")));
        Ok(())
    }

    #[test]
    fn test_explicit_path() -> Result<(), String> {
        let dir = TempDir::new().map_err(|e| e.to_string())?;
        let compiler = dir.path().join("kotlinc");
        fs::write(&compiler, "").map_err(|e| e.to_string())?;

        let program = compiler.to_str().ok_or("non-utf8 temp path")?;
        assert_eq!(locate_compiler(program, None, None), Some(compiler.clone()));

        let missing = dir.path().join("nope");
        let program = missing.to_str().ok_or("non-utf8 temp path")?;
        assert_eq!(locate_compiler(program, None, None), None);
        Ok(())
    }

    #[test]
    fn test_not_found() {
        assert_eq!(
            locate_compiler("definitely-not-a-kotlin-compiler", Some(""), None),
            None
        );
    }
}
