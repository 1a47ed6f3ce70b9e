//! Action Validator
//!
//! Pure safety gate between planner output and the executor. Walks the plan in
//! order and reports the first violation only: a rejected plan is never
//! partially trusted. No I/O, no state, same answer every time.

use crate::action::{Action, Plan};
use crate::error::ValidationError;

/// Paths no file action may target
pub const PROTECTED_PATHS: &[&str] = &["/", "/boot", "/proc", "/sys", "/dev"];

/// Substrings that reject a command outright, matched on the space-joined tokens
pub const DESTRUCTIVE_PATTERNS: &[&str] = &["rm -rf /", "mkfs"];

/// Validate a plan, returning the first violation
pub fn validate(plan: &Plan) -> Result<(), ValidationError> {
    for (index, action) in plan.actions.iter().enumerate() {
        if let Err(reason) = check_action(action) {
            tracing::warn!(index, kind = action.kind(), %reason, "plan rejected");
            return Err(ValidationError::new(index, reason));
        }
    }
    Ok(())
}

/// Check one action against the policy
pub fn check_action(action: &Action) -> Result<(), String> {
    match action {
        Action::InstallPackage { package, .. } | Action::RemovePackage { package, .. } => {
            if package.is_empty() {
                return Err("empty package name".to_string());
            }
        }
        Action::ReadFile { path, .. }
        | Action::EditFile { path, .. }
        | Action::CreateFile { path, .. } => check_path(path)?,
        Action::RunCommand { command, .. } => check_command(command)?,
        Action::Unknown { kind } => {
            return Err(format!("unknown action type '{}'", kind));
        }
    }
    Ok(())
}

fn check_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty path".to_string());
    }
    if PROTECTED_PATHS.contains(&path) {
        return Err(format!("protected path '{}'", path));
    }
    Ok(())
}

fn check_command(command: &[String]) -> Result<(), String> {
    if command.is_empty() {
        return Err("empty command".to_string());
    }
    let joined = command.join(" ");
    if let Some(pattern) = DESTRUCTIVE_PATTERNS.iter().find(|p| joined.contains(**p)) {
        return Err(format!("destructive command pattern '{}'", pattern));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(tokens: &[&str]) -> Action {
        Action::RunCommand {
            command: tokens.iter().map(|t| t.to_string()).collect(),
            needs_root: false,
        }
    }

    fn read(path: &str) -> Action {
        Action::ReadFile {
            path: path.to_string(),
            needs_root: false,
        }
    }

    fn install(package: &str) -> Action {
        Action::InstallPackage {
            package: package.to_string(),
            needs_root: true,
        }
    }

    #[test]
    fn test_rejects_rm_rf_root() {
        let plan = Plan::new(vec![cmd(&["rm", "-rf", "/"])], "wipe");
        let err = validate(&plan).unwrap_err();
        assert_eq!(err.index, 0);
        assert!(err.reason.contains("rm -rf /"));
    }

    #[test]
    fn test_rejects_mkfs_anywhere_in_tokens() {
        let plan = Plan::new(vec![cmd(&["sudo", "mkfs.ext4", "/dev/sdb1"])], "format");
        assert!(validate(&plan).is_err());
    }

    #[test]
    fn test_pattern_spanning_tokens() {
        // Tokens are joined before matching
        let plan = Plan::new(vec![cmd(&["rm -rf", "/home"])], "x");
        assert!(validate(&plan).is_err());
    }

    #[test]
    fn test_empty_package() {
        let plan = Plan::new(vec![install("")], "x");
        assert_eq!(
            validate(&plan),
            Err(ValidationError::new(0, "empty package name"))
        );
    }

    #[test]
    fn test_protected_paths_exact_match() {
        for path in PROTECTED_PATHS {
            assert!(validate(&Plan::new(vec![read(path)], "x")).is_err());
        }
        assert!(validate(&Plan::new(vec![read("/etc/fstab")], "x")).is_ok());
        assert!(validate(&Plan::new(vec![read("/proc/cpuinfo")], "x")).is_ok());
    }

    #[test]
    fn test_unknown_kind() {
        let plan = Plan::new(
            vec![
                read("/etc/hosts"),
                Action::Unknown {
                    kind: "reboot".to_string(),
                },
            ],
            "x",
        );
        let err = validate(&plan).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.reason, "unknown action type 'reboot'");
    }

    #[test]
    fn test_fail_fast_reports_first() {
        let plan = Plan::new(
            vec![
                install("htop"),
                read("/etc/hosts"),
                install(""),
                cmd(&["ls"]),
                cmd(&["echo", "hi"]),
                read("/boot"),
            ],
            "x",
        );
        assert_eq!(validate(&plan).unwrap_err().index, 2);
    }

    #[test]
    fn test_empty_plan_is_valid() {
        assert!(validate(&Plan::new(vec![], "nothing")).is_ok());
    }
}
