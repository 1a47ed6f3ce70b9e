//! Command and file execution on the real system
//!
//! Every external command is a token vector, never a shell string. Child
//! output is forwarded to the terminal as it arrives; stderr is also kept in a
//! small tail buffer so permission denials can be told apart from other
//! failures after the child exits.

use crate::error::ExecError;
use crate::executor::{CommandRunner, FileAccess};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

/// How much of the child's stderr is kept for classification
const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// Messages package managers and coreutils print when they lack privileges
const PERMISSION_MARKERS: &[&str] = &[
    "permission denied",
    "operation not permitted",
    "are you root",
    "unless you are root",
    "must be root",
    "superuser privileges",
];

/// Whether command output reads like a privilege failure
pub fn looks_like_permission_denial(output: &str) -> bool {
    let lower = output.to_lowercase();
    PERMISSION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Quote a command for display
pub fn display_command(command: &[String]) -> String {
    command
        .iter()
        .map(|t| {
            if t.is_empty() || t.contains(char::is_whitespace) {
                format!("'{}'", t)
            } else {
                t.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Copy a child stream to our own stream chunk by chunk.
/// Progress bars use `\r` without newlines, so this does not wait for lines.
fn forward<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    mut tail: Option<&mut Vec<u8>>,
) -> io::Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        writer.flush()?;

        if let Some(tail) = tail.as_deref_mut() {
            tail.extend_from_slice(&buf[..n]);
            if tail.len() > STDERR_TAIL_BYTES {
                let excess = tail.len() - STDERR_TAIL_BYTES;
                tail.drain(..excess);
            }
        }
    }
}

fn spawn_error(program: &str, err: io::Error) -> ExecError {
    match err.kind() {
        io::ErrorKind::NotFound => ExecError::NotFound(program.to_string()),
        _ => ExecError::from_io(err),
    }
}

fn classify_exit(status: std::process::ExitStatus, stderr: &str) -> Result<(), ExecError> {
    if status.success() {
        return Ok(());
    }
    if looks_like_permission_denial(stderr) {
        return Err(ExecError::PermissionDenied);
    }
    match status.code() {
        Some(code) => Err(ExecError::ExitStatus(code)),
        None => Err(ExecError::Signaled),
    }
}

/// Runs commands on the host with live output
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Print the command line before running it
    pub echo: bool,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self { echo: true }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &[String]) -> Result<(), ExecError> {
        let (program, args) = command.split_first().ok_or(ExecError::EmptyCommand)?;

        if self.echo {
            eprintln!("🔄 Running: {}", display_command(command));
        }
        tracing::info!(command = %display_command(command), "spawning child");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let stdout_pump = child
            .stdout
            .take()
            .map(|out| thread::spawn(move || forward(out, io::stdout(), None)));

        let mut tail = Vec::new();
        if let Some(err) = child.stderr.take() {
            if let Err(e) = forward(err, io::stderr(), Some(&mut tail)) {
                tracing::warn!("stderr forwarding stopped: {}", e);
            }
        }

        if let Some(pump) = stdout_pump {
            match pump.join() {
                Ok(Err(e)) => tracing::warn!("stdout forwarding stopped: {}", e),
                Err(_) => tracing::warn!("stdout forwarding thread panicked"),
                Ok(Ok(())) => {}
            }
        }

        let status = child.wait()?;
        tracing::debug!(?status, "child exited");
        classify_exit(status, &String::from_utf8_lossy(&tail))
    }
}

/// File access on the host.
/// Elevated operations go through `sudo -k` helpers, never raw syscalls.
#[derive(Debug, Clone, Default)]
pub struct SystemFiles;

impl SystemFiles {
    fn helper(args: &[&str], path: &Path) -> Command {
        let mut cmd = Command::new("sudo");
        cmd.arg("-k").args(args).arg(path);
        cmd
    }

    /// Run a helper feeding `input` on stdin, capturing stdout and stderr.
    /// Stdin is fed from a separate thread so an echoing child (`tee`) can
    /// never fill its output pipe while we are still writing.
    fn run_with_input(mut cmd: Command, input: &[u8]) -> Result<Vec<u8>, ExecError> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&program, e))?;

        let feeder = child.stdin.take().map(|mut stdin| {
            let data = input.to_vec();
            thread::spawn(move || stdin.write_all(&data))
        });

        let output = child.wait_with_output()?;

        if let Some(feeder) = feeder {
            match feeder.join() {
                // A child that exits early closes its stdin; the exit status tells the story
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(ExecError::from_io(e)),
                Err(_) => tracing::warn!("stdin feeder thread panicked"),
                Ok(Ok(())) => {}
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            eprint!("{}", stderr);
        }
        classify_exit(output.status, &stderr)?;
        Ok(output.stdout)
    }

    /// `sudo -k test -e <path>`: exit 0 means present, 1 means absent
    fn elevated_exists(path: &Path) -> Result<bool, ExecError> {
        let status = Self::helper(&["test", "-e"], path)
            .status()
            .map_err(|e| spawn_error("sudo", e))?;
        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => classify_exit(status, "").map(|_| false),
        }
    }
}

impl FileAccess for SystemFiles {
    fn exists(&mut self, path: &Path, elevated: bool) -> Result<bool, ExecError> {
        if elevated {
            return Self::elevated_exists(path);
        }
        // A denied stat is not "absent": surface it so the caller can escalate
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ExecError::from_io(e)),
        }
    }

    fn read(&mut self, path: &Path, elevated: bool) -> Result<Vec<u8>, ExecError> {
        if !elevated {
            return fs::read(path).map_err(ExecError::from_io);
        }
        tracing::info!(path = %path.display(), "reading through privileged helper");
        let output = Self::helper(&["cat"], path)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| spawn_error("sudo", e))?;
        classify_exit(output.status, "")?;
        Ok(output.stdout)
    }

    fn write(&mut self, path: &Path, data: &[u8], elevated: bool) -> Result<(), ExecError> {
        if !elevated {
            return fs::write(path, data).map_err(ExecError::from_io);
        }
        tracing::info!(path = %path.display(), "writing through privileged helper");
        Self::run_with_input(Self::helper(&["tee"], path), data).map(|_| ())
    }

    fn backup(&mut self, path: &Path, backup: &Path, elevated: bool) -> Result<(), ExecError> {
        if !elevated {
            return fs::copy(path, backup).map(|_| ()).map_err(ExecError::from_io);
        }
        let status = Command::new("sudo")
            .args(["-k", "cp", "-p"])
            .arg(path)
            .arg(backup)
            .status()
            .map_err(|e| spawn_error("sudo", e))?;
        classify_exit(status, "")
    }

    fn patch(&mut self, path: &Path, diff: &str, elevated: bool) -> Result<(), ExecError> {
        let mut cmd = if elevated {
            let mut cmd = Command::new("sudo");
            cmd.args(["-k", "patch"]);
            cmd
        } else {
            Command::new("patch")
        };
        cmd.args(["--forward", "--silent"]).arg(path);
        Self::run_with_input(cmd, diff.as_bytes()).map(|_| ())
    }
}
