//! Access to the operating system: running commands and reading files.
//!
//! Every probe in the crate goes through [`Host`], so a whole report can be
//! produced against a [`ScriptedHost`] without touching the real machine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Default upper bound for a single command invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured result of running an external program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit code, or `None` when the program could not run to completion
    /// (not installed, spawn failure, killed by timeout or signal).
    pub status: Option<i32>,
    /// Raw standard output, lossily decoded as UTF-8.
    pub stdout: String,
}

impl CommandOutput {
    /// Output of a program that exited with status 0.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
        }
    }

    /// Output of a program that ran but exited non-zero.
    pub fn failed(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: stdout.into(),
        }
    }

    /// A program that could not be run at all.
    pub fn missing() -> Self {
        Self::default()
    }

    /// Whether the program ran and exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Whether the program could be run at all.
    pub fn ran(&self) -> bool {
        self.status.is_some()
    }

    /// Trimmed standard output.
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

/// The operating-system capabilities the diagnostics need.
#[async_trait]
pub trait Host: Send + Sync {
    /// Run `program` with `args` directly (no shell) and capture stdout.
    async fn run(&self, program: &str, args: &[&str]) -> CommandOutput;

    /// Read a file as text, `None` on any error.
    async fn read_file(&self, path: &str) -> Option<String>;

    /// Sorted entry names of a directory, empty on any error.
    async fn list_dir(&self, path: &str) -> Vec<String>;
}

/// Probe-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Upper bound for each command invocation
    pub command_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    /// Set the per-command timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// The real machine.
#[derive(Debug, Clone)]
pub struct LocalHost {
    timeout: Duration,
}

impl LocalHost {
    /// Create a host handle with the default command timeout.
    pub fn new() -> Self {
        Self::with_config(&ProbeConfig::default())
    }

    /// Create a host handle from probe settings.
    pub fn with_config(config: &ProbeConfig) -> Self {
        Self {
            timeout: config.command_timeout,
        }
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => CommandOutput {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            },
            Ok(Err(err)) => {
                debug!(program, error = %err, "command could not be started");
                CommandOutput::missing()
            }
            Err(_elapsed) => {
                debug!(program, timeout = ?self.timeout, "command timed out");
                CommandOutput::missing()
            }
        }
    }

    async fn read_file(&self, path: &str) -> Option<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Some(content),
            Err(err) => {
                debug!(path, error = %err, "file not readable");
                None
            }
        }
    }

    async fn list_dir(&self, path: &str) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(path).await else {
            return names;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }
}

/// A canned host answering from lookup tables.
///
/// Commands are keyed by their full command line (`"vcgencmd measure_temp"`).
/// Anything not scripted behaves like a missing program or file.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    commands: HashMap<String, CommandOutput>,
    files: HashMap<String, String>,
    dirs: HashMap<String, Vec<String>>,
}

impl ScriptedHost {
    /// An empty host where every command is missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful command.
    pub fn with_command(self, command_line: &str, stdout: &str) -> Self {
        self.with_output(command_line, CommandOutput::ok(stdout))
    }

    /// Script a command with an explicit outcome.
    pub fn with_output(mut self, command_line: &str, output: CommandOutput) -> Self {
        self.commands.insert(command_line.to_string(), output);
        self
    }

    /// Script a file's contents.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Script a directory listing.
    pub fn with_dir(mut self, path: &str, entries: &[&str]) -> Self {
        let mut entries: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
        entries.sort();
        self.dirs.insert(path.to_string(), entries);
        self
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Host for ScriptedHost {
    async fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        self.commands
            .get(&command_line(program, args))
            .cloned()
            .unwrap_or_default()
    }

    async fn read_file(&self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }

    async fn list_dir(&self, path: &str) -> Vec<String> {
        self.dirs.get(path).cloned().unwrap_or_default()
    }
}

/// Whether the process runs with root privileges.
pub async fn is_privileged(host: &dyn Host) -> bool {
    host.run("id", &["-u"]).await.text() == "0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_host_answers_scripted_commands() {
        let host = ScriptedHost::new().with_command("vcgencmd measure_temp", "temp=48.3'C\n");
        let output = host.run("vcgencmd", &["measure_temp"]).await;
        assert!(output.success());
        assert_eq!(output.text(), "temp=48.3'C");
    }

    #[tokio::test]
    async fn test_scripted_host_defaults_to_missing() {
        let host = ScriptedHost::new();
        let output = host.run("lsusb", &[]).await;
        assert!(!output.ran());
        assert!(output.text().is_empty());
        assert!(host.read_file("/proc/cpuinfo").await.is_none());
        assert!(host.list_dir("/dev").await.is_empty());
    }

    #[tokio::test]
    async fn test_local_host_missing_program() {
        let host = LocalHost::new();
        let output = host
            .run("definitely-not-a-real-program-pi-diagnostics", &[])
            .await;
        assert_eq!(output, CommandOutput::missing());
    }

    #[tokio::test]
    async fn test_local_host_times_out() {
        let config = ProbeConfig::default().with_command_timeout(Duration::from_millis(200));
        let host = LocalHost::with_config(&config);

        let started = std::time::Instant::now();
        let output = host.run("sleep", &["5"]).await;
        assert_eq!(output, CommandOutput::missing());
        assert!(output.status.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_local_host_lists_sorted_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b"), "").unwrap();
        std::fs::write(dir.path().join("a"), "").unwrap();

        let host = LocalHost::new();
        let names = host.list_dir(dir.path().to_str().unwrap()).await;
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_privilege_check() {
        let root = ScriptedHost::new().with_command("id -u", "0\n");
        let user = ScriptedHost::new().with_command("id -u", "1000\n");
        assert!(is_privileged(&root).await);
        assert!(!is_privileged(&user).await);
    }
}
