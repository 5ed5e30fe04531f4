//! External tool invocation
//!
//! Actions never spawn processes directly. They describe each call as a
//! [`ToolCommand`] and hand it to the [`CommandRunner`] carried by the build
//! context, which lets the pipeline run against the host or a scripted
//! stand-in.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Error raised when an external tool cannot be run to success
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (usually not on PATH)
    #[error("failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the program failed
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but did not exit successfully
    #[error("{label}: '{program}' {}", describe_exit(.code))]
    Exit {
        label: String,
        program: String,
        code: Option<i32>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// A single external tool call: program, arguments and a log label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    label: String,
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a command; `label` tags every log line the tool produces
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Program and arguments joined for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external tools on behalf of actions
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion. Success means exit status zero.
    async fn run(&self, command: &ToolCommand) -> Result<(), CommandError>;
}

/// Runs tools on the host, resolving programs through PATH
///
/// Stdout and stderr are streamed into the log line by line, tagged with
/// the command's label.
#[derive(Debug, Default, Clone)]
pub struct HostRunner;

#[async_trait]
impl CommandRunner for HostRunner {
    async fn run(&self, command: &ToolCommand) -> Result<(), CommandError> {
        debug!(label = %command.label(), command = %command.command_line(), "Spawning");

        let mut child = Command::new(command.program())
            .args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain both pipes while waiting so a chatty tool cannot block on a full pipe
        let (_, _, status) = tokio::join!(
            forward_lines(stdout, command.label()),
            forward_lines(stderr, command.label()),
            child.wait()
        );

        let status = status.map_err(|source| CommandError::Wait {
            program: command.program().to_string(),
            source,
        })?;

        if !status.success() {
            return Err(CommandError::Exit {
                label: command.label().to_string(),
                program: command.program().to_string(),
                code: status.code(),
            });
        }

        debug!(label = %command.label(), "Exited successfully");
        Ok(())
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, label: &str) {
    let Some(reader) = reader else {
        return;
    };

    // Raw lines: tool output and pacman.log are not guaranteed UTF-8
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                info!(label = %label, "{}", line.trim_end_matches(|c| c == '\n' || c == '\r'));
            }
            Err(e) => {
                debug!(label = %label, error = %e, "Stopped forwarding tool output");
                // The pipe must stay open until EOF or the tool dies of SIGPIPE
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
}

/// A runner that records invocations and returns scripted exit codes
///
/// Programs without a scripted outcome succeed.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<ToolCommand>>,
    exit_codes: Mutex<HashMap<String, i32>>,
    missing: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `program` exit with `code`
    pub fn exit_with(self, program: impl Into<String>, code: i32) -> Self {
        self.exit_codes.lock().unwrap().insert(program.into(), code);
        self
    }

    /// Make every call to `program` fail to spawn
    pub fn missing(self, program: impl Into<String>) -> Self {
        self.missing.lock().unwrap().push(program.into());
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Programs invoked so far, in order
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &ToolCommand) -> Result<(), CommandError> {
        self.calls.lock().unwrap().push(command.clone());

        if self
            .missing
            .lock()
            .unwrap()
            .iter()
            .any(|p| p == command.program())
        {
            return Err(CommandError::Spawn {
                program: command.program().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        match self.exit_codes.lock().unwrap().get(command.program()) {
            Some(&code) if code != 0 => Err(CommandError::Exit {
                label: command.label().to_string(),
                program: command.program().to_string(),
                code: Some(code),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_command_builder() {
        let cmd = ToolCommand::new("Pacstrap", "pacstrap")
            .args(["-M", "-C"])
            .arg_path(Path::new("/recipe/pacman.conf"))
            .arg("/rootfs");

        assert_eq!(cmd.label(), "Pacstrap");
        assert_eq!(cmd.program(), "pacstrap");
        assert_eq!(cmd.get_args(), ["-M", "-C", "/recipe/pacman.conf", "/rootfs"]);
        assert_eq!(
            cmd.command_line(),
            "pacstrap -M -C /recipe/pacman.conf /rootfs"
        );
    }

    #[test]
    fn test_exit_error_display() {
        let err = CommandError::Exit {
            label: "Pacstrap".to_string(),
            program: "pacstrap".to_string(),
            code: None,
        };
        assert_eq!(err.to_string(), "Pacstrap: 'pacstrap' was terminated by a signal");
    }

    #[tokio::test]
    async fn test_host_runner_success() {
        let cmd = ToolCommand::new("Echo", "sh").args(["-c", "echo hello; echo oops >&2"]);
        assert!(HostRunner.run(&cmd).await.is_ok());
    }

    #[tokio::test]
    async fn test_host_runner_survives_non_utf8_output() {
        // Enough output after the invalid byte to overflow the pipe buffer
        let script = "printf 'caf\\351\\n'; sleep 0.3; \
                      i=0; while [ $i -lt 2000 ]; do echo \"line $i\"; echo \"err $i\" >&2; i=$((i+1)); done; \
                      exit 0";
        let cmd = ToolCommand::new("Latin1", "sh").args(["-c", script]);

        assert!(HostRunner.run(&cmd).await.is_ok());
    }

    #[tokio::test]
    async fn test_host_runner_exit_code() {
        let cmd = ToolCommand::new("Exit", "sh").args(["-c", "exit 3"]);

        let err = HostRunner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, CommandError::Exit { code: Some(3), .. }));
        assert!(err.to_string().contains("exited with code 3"));
    }

    #[tokio::test]
    async fn test_host_runner_missing_program() {
        let cmd = ToolCommand::new("Missing", "imagesmith-no-such-tool");

        let err = HostRunner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_scripted_runner() {
        let runner = ScriptedRunner::new()
            .exit_with("pacstrap", 1)
            .missing("cat");

        assert!(runner.run(&ToolCommand::new("Key", "pacman-key")).await.is_ok());
        assert!(matches!(
            runner.run(&ToolCommand::new("Pacstrap", "pacstrap")).await,
            Err(CommandError::Exit { code: Some(1), .. })
        ));
        assert!(matches!(
            runner.run(&ToolCommand::new("Log", "cat")).await,
            Err(CommandError::Spawn { .. })
        ));

        assert_eq!(runner.programs(), vec!["pacman-key", "pacstrap", "cat"]);
    }
}
