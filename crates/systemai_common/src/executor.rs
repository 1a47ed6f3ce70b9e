//! Executor - sequential plan runner with privilege escalation
//!
//! Runs every action of an approved plan in plan order and produces exactly one
//! outcome per action. Each action walks a small state machine:
//!
//! ```text
//! Pending -> Resolving -> Running(user)
//!                           | permission denied + allow_root_execute
//!                           v
//!                  AwaitingEscalation -> Running(elevated) -> Done
//! ```
//!
//! The process, the file system and the operator are capabilities passed in
//! by the caller, so the whole pipeline runs in tests without a terminal,
//! root, or a package manager.

use crate::action::{Action, Plan};
use crate::error::ExecError;
use crate::pm::PackageManagerKind;
use crate::resolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Characters of file content shown after a successful read
pub const DISPLAY_LIMIT: usize = 500;

pub const REASON_UNSUPPORTED: &str = "unsupported for this package manager";
pub const REASON_PERMISSION_DENIED: &str = "permission denied";
pub const REASON_ESCALATION_DECLINED: &str = "escalation declined";
pub const REASON_ABORTED: &str = "aborted after earlier failure";

/// Runs a command line with live output
pub trait CommandRunner {
    fn run(&mut self, command: &[String]) -> Result<(), ExecError>;
}

/// File operations, each with an unprivileged and an elevated form
pub trait FileAccess {
    fn exists(&mut self, path: &Path, elevated: bool) -> Result<bool, ExecError>;
    fn read(&mut self, path: &Path, elevated: bool) -> Result<Vec<u8>, ExecError>;
    fn write(&mut self, path: &Path, data: &[u8], elevated: bool) -> Result<(), ExecError>;
    fn backup(&mut self, path: &Path, backup: &Path, elevated: bool) -> Result<(), ExecError>;
    fn patch(&mut self, path: &Path, diff: &str, elevated: bool) -> Result<(), ExecError>;
}

/// The operator's yes/no answers ("retry as root?")
pub trait Decider {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Progress hooks for the front-end
pub trait ExecutionObserver {
    fn action_started(&mut self, _index: usize, _total: usize, _action: &Action) {}
    fn action_finished(&mut self, _index: usize, _action: &Action, _outcome: &Outcome) {}
}

/// What to do with the rest of the plan after an action fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going and report every outcome
    #[default]
    ContinueOnFailure,
    /// Skip every action after the first failure
    AbortRemaining,
}

/// Explicit policy handed to the executor; nothing is read from global state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionPolicy {
    pub package_manager: PackageManagerKind,
    pub allow_root_execute: bool,
    pub on_failure: FailurePolicy,
}

/// Terminal result of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// `detail` carries read content or the backup location
    Succeeded(Option<String>),
    Failed(String),
    Skipped(String),
    /// The operator answered "no" to the root retry
    PermissionRetryDeclined,
}

impl Outcome {
    pub fn succeeded() -> Self {
        Outcome::Succeeded(None)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    /// Failed or declined; skips are not failures
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_) | Outcome::PermissionRetryDeclined)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    /// Reason shown to the operator, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded(_) => None,
            Outcome::Failed(reason) | Outcome::Skipped(reason) => Some(reason),
            Outcome::PermissionRetryDeclined => Some(REASON_ESCALATION_DECLINED),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded(detail) => detail.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded(_) => write!(f, "succeeded"),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            Outcome::PermissionRetryDeclined => write!(f, "failed: {}", REASON_ESCALATION_DECLINED),
        }
    }
}

/// Counts over a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ExecutionSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut s, o| {
            if o.is_success() {
                s.succeeded += 1;
            } else if o.is_failure() {
                s.failed += 1;
            } else {
                s.skipped += 1;
            }
            s
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Per-action state
#[derive(Debug)]
enum ActionState {
    Pending,
    Resolving,
    Running { elevated: bool },
    AwaitingEscalation,
    Done(Outcome),
}

/// Edit payload
#[derive(Debug)]
enum EditChange<'a> {
    Replace(&'a str),
    Patch(&'a str),
}

/// Concrete operation an action resolved to
#[derive(Debug)]
enum Operation<'a> {
    Command(Vec<String>),
    Read(&'a Path),
    Create { path: &'a Path, content: &'a str },
    Edit {
        path: &'a Path,
        change: EditChange<'a>,
        /// Chosen once per action so an elevated retry reuses it
        backup: PathBuf,
        backed_up: bool,
    },
}

impl Operation<'_> {
    /// Whether a root-wrapped form exists for this operation
    fn can_elevate(&self) -> bool {
        match self {
            Operation::Command(command) => !resolver::is_elevated(command),
            Operation::Read(_) | Operation::Create { .. } | Operation::Edit { .. } => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            Operation::Command(command) => crate::exec::display_command(command),
            Operation::Read(path) => format!("read {}", path.display()),
            Operation::Create { path, .. } => format!("create {}", path.display()),
            Operation::Edit { path, .. } => format!("edit {}", path.display()),
        }
    }
}

/// Backup location for an edited file: `<path>.bak.<YYYYMMDD-HHMMSS>`
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".bak.{}", stamp));
    PathBuf::from(name)
}

/// Cut text to the display limit on a character boundary
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Sequential plan executor
pub struct Executor<'a> {
    policy: ExecutionPolicy,
    runner: &'a mut dyn CommandRunner,
    files: &'a mut dyn FileAccess,
    decider: &'a mut dyn Decider,
    observer: Option<&'a mut dyn ExecutionObserver>,
}

impl<'a> Executor<'a> {
    pub fn new(
        policy: ExecutionPolicy,
        runner: &'a mut dyn CommandRunner,
        files: &'a mut dyn FileAccess,
        decider: &'a mut dyn Decider,
    ) -> Self {
        Self {
            policy,
            runner,
            files,
            decider,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn ExecutionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Run every action in order; one outcome per action, same order
    pub fn execute(&mut self, plan: &Plan) -> Vec<Outcome> {
        let total = plan.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut aborted = false;

        for (index, action) in plan.actions.iter().enumerate() {
            if let Some(observer) = self.observer.as_deref_mut() {
                observer.action_started(index, total, action);
            }

            let outcome = if aborted {
                Outcome::Skipped(REASON_ABORTED.to_string())
            } else {
                self.run_action(index, action)
            };

            if outcome.is_failure() && self.policy.on_failure == FailurePolicy::AbortRemaining {
                aborted = true;
            }

            tracing::info!(index, kind = action.kind(), %outcome, "action finished");
            if let Some(observer) = self.observer.as_deref_mut() {
                observer.action_finished(index, action, &outcome);
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Drive one action through its state machine
    fn run_action(&mut self, index: usize, action: &Action) -> Outcome {
        let mut state = ActionState::Pending;
        let mut operation: Option<Operation<'_>> = None;

        loop {
            tracing::debug!(index, ?state, "action state");
            state = match state {
                ActionState::Pending => ActionState::Resolving,

                ActionState::Resolving => match self.resolve(action) {
                    Ok(op) => {
                        operation = Some(op);
                        ActionState::Running { elevated: false }
                    }
                    Err(outcome) => ActionState::Done(outcome),
                },

                ActionState::Running { elevated } => {
                    let Some(op) = operation.as_mut() else {
                        return Outcome::Failed("no operation resolved".to_string());
                    };
                    match self.perform(op, elevated) {
                        Ok(detail) => ActionState::Done(Outcome::Succeeded(detail)),
                        Err(err) if err.is_permission_denied() && !elevated => {
                            if self.policy.allow_root_execute && op.can_elevate() {
                                ActionState::AwaitingEscalation
                            } else {
                                ActionState::Done(Outcome::Failed(
                                    REASON_PERMISSION_DENIED.to_string(),
                                ))
                            }
                        }
                        Err(err) => ActionState::Done(Outcome::Failed(err.to_string())),
                    }
                }

                ActionState::AwaitingEscalation => {
                    let description = operation
                        .as_ref()
                        .map(Operation::describe)
                        .unwrap_or_else(|| action.to_string());
                    let question = format!(
                        "Permission denied for `{}`. Retry as root?",
                        description
                    );
                    if self.decider.confirm(&question) {
                        tracing::info!(index, "escalation accepted");
                        ActionState::Running { elevated: true }
                    } else {
                        tracing::info!(index, "escalation declined");
                        ActionState::Done(Outcome::PermissionRetryDeclined)
                    }
                }

                ActionState::Done(outcome) => return outcome,
            };
        }
    }

    /// Resolving: turn an action into a concrete operation
    fn resolve<'p>(&self, action: &'p Action) -> Result<Operation<'p>, Outcome> {
        match action {
            Action::InstallPackage { .. } | Action::RemovePackage { .. } => {
                resolver::resolve(self.policy.package_manager, action)
                    .map(Operation::Command)
                    .ok_or_else(|| Outcome::Skipped(REASON_UNSUPPORTED.to_string()))
            }
            Action::RunCommand { command, .. } => Ok(Operation::Command(command.clone())),
            Action::ReadFile { path, .. } => Ok(Operation::Read(Path::new(path))),
            Action::CreateFile { path, content, .. } => Ok(Operation::Create {
                path: Path::new(path),
                content: content.as_deref().unwrap_or(""),
            }),
            Action::EditFile {
                path,
                content,
                diff,
                ..
            } => {
                let change = match (content.as_deref(), diff.as_deref()) {
                    (Some(content), _) => EditChange::Replace(content),
                    (None, Some(diff)) => EditChange::Patch(diff),
                    (None, None) => {
                        return Err(Outcome::Failed(
                            "edit_file carries neither content nor diff".to_string(),
                        ))
                    }
                };
                let path = Path::new(path);
                Ok(Operation::Edit {
                    path,
                    change,
                    backup: backup_path(path),
                    backed_up: false,
                })
            }
            Action::Unknown { .. } => Err(Outcome::Skipped("unknown action type".to_string())),
        }
    }

    /// Running: perform the operation once, as the user or elevated
    fn perform(&mut self, op: &mut Operation<'_>, elevated: bool) -> Result<Option<String>, ExecError> {
        match op {
            Operation::Command(command) => {
                if elevated {
                    let wrapped = resolver::elevate(command).ok_or(ExecError::PermissionDenied)?;
                    self.runner.run(&wrapped)?;
                } else {
                    self.runner.run(command)?;
                }
                Ok(None)
            }
            Operation::Read(path) => {
                let data = self.files.read(path, elevated)?;
                let text = String::from_utf8_lossy(&data);
                Ok(Some(truncate_for_display(&text, DISPLAY_LIMIT)))
            }
            Operation::Create { path, content } => {
                if self.files.exists(path, elevated)? {
                    return Err(ExecError::AlreadyExists(path.display().to_string()));
                }
                self.files.write(path, content.as_bytes(), elevated)?;
                Ok(Some(format!("created {}", path.display())))
            }
            Operation::Edit {
                path,
                change,
                backup,
                backed_up,
            } => {
                if !*backed_up {
                    self.files.backup(path, backup, elevated)?;
                    *backed_up = true;
                }
                match change {
                    EditChange::Replace(content) => {
                        self.files.write(path, content.as_bytes(), elevated)?
                    }
                    EditChange::Patch(diff) => self.files.patch(path, diff, elevated)?,
                }
                Ok(Some(format!("backup saved to {}", backup.display())))
            }
        }
    }
}
