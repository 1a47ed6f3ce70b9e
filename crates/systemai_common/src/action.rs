//! Action/Plan model
//!
//! The shared vocabulary between the planner, the validator, the resolver and
//! the executor. Actions are a closed tagged union so every consumer matches
//! exhaustively; the wire form is the snake_case `type` tag the planner emits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire tags of the six known action kinds
pub const KNOWN_ACTION_TYPES: &[&str] = &[
    "install_package",
    "remove_package",
    "read_file",
    "edit_file",
    "create_file",
    "run_command",
];

/// Explanation used when the planner identified nothing to do
pub const NO_ACTIONS_EXPLANATION: &str = "No actions identified from user request.";

/// One unit of work proposed by the planner
///
/// `needs_root` is advisory only: the executor decides on escalation from the
/// permission errors it actually observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    InstallPackage {
        #[serde(default)]
        package: String,
        #[serde(default)]
        needs_root: bool,
    },
    RemovePackage {
        #[serde(default)]
        package: String,
        #[serde(default)]
        needs_root: bool,
    },
    ReadFile {
        #[serde(default)]
        path: String,
        #[serde(default)]
        needs_root: bool,
    },
    EditFile {
        #[serde(default)]
        path: String,
        /// Full replacement content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        /// Unified diff applied with `patch`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff: Option<String>,
        #[serde(default)]
        needs_root: bool,
    },
    CreateFile {
        #[serde(default)]
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default)]
        needs_root: bool,
    },
    RunCommand {
        #[serde(default)]
        command: Vec<String>,
        #[serde(default)]
        needs_root: bool,
    },
    /// An object whose `type` tag is missing or not one of the known kinds.
    /// Kept in the plan so the validator can reject it by index.
    #[serde(skip)]
    Unknown { kind: String },
}

impl Action {
    /// Wire tag of this action
    pub fn kind(&self) -> &str {
        match self {
            Action::InstallPackage { .. } => "install_package",
            Action::RemovePackage { .. } => "remove_package",
            Action::ReadFile { .. } => "read_file",
            Action::EditFile { .. } => "edit_file",
            Action::CreateFile { .. } => "create_file",
            Action::RunCommand { .. } => "run_command",
            Action::Unknown { kind } => kind,
        }
    }

    /// Advisory root hint from the planner
    pub fn needs_root(&self) -> bool {
        match self {
            Action::InstallPackage { needs_root, .. }
            | Action::RemovePackage { needs_root, .. }
            | Action::ReadFile { needs_root, .. }
            | Action::EditFile { needs_root, .. }
            | Action::CreateFile { needs_root, .. }
            | Action::RunCommand { needs_root, .. } => *needs_root,
            Action::Unknown { .. } => false,
        }
    }

    /// Decode one untrusted JSON object into an action.
    ///
    /// Unknown or missing tags become `Action::Unknown`; a known tag with
    /// ill-typed fields is a decode error.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_string);

        match kind {
            Some(kind) if KNOWN_ACTION_TYPES.contains(&kind.as_str()) => {
                serde_json::from_value(value)
            }
            Some(kind) => Ok(Action::Unknown { kind }),
            None => Ok(Action::Unknown {
                kind: "<missing>".to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::InstallPackage { package, .. } | Action::RemovePackage { package, .. } => {
                write!(f, "{} [{}]", self.kind(), package)
            }
            Action::ReadFile { path, .. }
            | Action::EditFile { path, .. }
            | Action::CreateFile { path, .. } => write!(f, "{} {}", self.kind(), path),
            Action::RunCommand { command, .. } => {
                write!(f, "{} `{}`", self.kind(), command.join(" "))
            }
            Action::Unknown { kind } => write!(f, "unknown action '{}'", kind),
        }
    }
}

/// Raw wire shape of a plan before per-action decoding
#[derive(Debug, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    actions: Vec<serde_json::Value>,
    #[serde(default)]
    explanation: String,
}

/// Ordered actions plus a human-readable explanation.
///
/// Order is execution order. An empty plan is valid and means the planner
/// found nothing to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct Plan {
    pub actions: Vec<Action>,
    pub explanation: String,
}

impl TryFrom<RawPlan> for Plan {
    type Error = serde_json::Error;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        let actions = raw
            .actions
            .into_iter()
            .map(Action::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let explanation = if actions.is_empty() {
            NO_ACTIONS_EXPLANATION.to_string()
        } else {
            raw.explanation
        };

        Ok(Plan {
            actions,
            explanation,
        })
    }
}

impl Plan {
    pub fn new(actions: Vec<Action>, explanation: impl Into<String>) -> Self {
        Self {
            actions,
            explanation: explanation.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether any action carries the planner's root hint
    pub fn any_needs_root(&self) -> bool {
        self.actions.iter().any(Action::needs_root)
    }
}

/// What the planner is told about the machine and the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub distro_family: String,
    pub package_manager: crate::PackageManagerKind,
    pub cwd: String,
    pub user_query: String,
    /// Grounding only; nothing in the pipeline interprets it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_actions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tagged_actions() {
        let json = r#"{
            "actions": [
                {"type": "install_package", "package": "htop", "needs_root": true},
                {"type": "read_file", "path": "/etc/fstab"},
                {"type": "run_command", "command": ["ls", "-la"]}
            ],
            "explanation": "Install htop and look around"
        }"#;

        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan.actions[0],
            Action::InstallPackage {
                package: "htop".to_string(),
                needs_root: true
            }
        );
        assert_eq!(plan.actions[1].kind(), "read_file");
        assert_eq!(plan.explanation, "Install htop and look around");
        assert!(plan.any_needs_root());
    }

    #[test]
    fn test_unknown_tag_is_kept_for_validator() {
        let json = r#"{"actions": [{"type": "format_disk", "path": "/dev/sda"}], "explanation": "x"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(
            plan.actions[0],
            Action::Unknown {
                kind: "format_disk".to_string()
            }
        );
    }

    #[test]
    fn test_missing_tag() {
        let json = r#"{"actions": [{"package": "htop"}]}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.actions[0].kind(), "<missing>");
    }

    #[test]
    fn test_empty_plan_gets_canned_explanation() {
        let plan: Plan = serde_json::from_str(r#"{"actions": [], "explanation": "hmm"}"#).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.explanation, NO_ACTIONS_EXPLANATION);
    }

    #[test]
    fn test_known_tag_with_bad_fields_is_error() {
        let json = r#"{"actions": [{"type": "run_command", "command": "rm -rf /"}]}"#;
        assert!(serde_json::from_str::<Plan>(json).is_err());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let json = r#"{"actions": [{"type": "create_file", "path": "/tmp/a.py", "language": "python", "content": "print(1)"}], "explanation": "e"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(
            plan.actions[0],
            Action::CreateFile {
                path: "/tmp/a.py".to_string(),
                content: Some("print(1)".to_string()),
                needs_root: false
            }
        );
    }

    #[test]
    fn test_display() {
        let action = Action::RunCommand {
            command: vec!["df".to_string(), "-h".to_string()],
            needs_root: false,
        };
        assert_eq!(action.to_string(), "run_command `df -h`");
    }
}
