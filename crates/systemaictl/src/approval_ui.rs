//! Approval UI - plan display and operator confirmation
//!
//! Shows the plan before anything runs and asks for explicit approval. The
//! same yes/no prompt backs the executor's "retry as root?" question.

use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use systemai_common::exec::display_command;
use systemai_common::{Action, Decider, ExecutionSummary, Outcome, Plan};

/// Marker shown next to actions the planner thinks need root
pub const ROOT_MARKER: &str = "🔒";

/// Target of an action as shown to the operator
fn action_target(action: &Action) -> String {
    match action {
        Action::InstallPackage { package, .. } | Action::RemovePackage { package, .. } => {
            format!("[{}]", package)
        }
        Action::ReadFile { path, .. }
        | Action::EditFile { path, .. }
        | Action::CreateFile { path, .. } => path.clone(),
        Action::RunCommand { command, .. } => format!("`{}`", display_command(command)),
        Action::Unknown { .. } => String::new(),
    }
}

/// Render a plan. Root hints are only shown when `show_root_hints` is set.
pub fn render_plan(plan: &Plan, show_root_hints: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n🤖 {} ({} action{}):\n",
        "Plan".bold(),
        plan.len(),
        if plan.len() == 1 { "" } else { "s" }
    ));
    out.push_str(&format!("{}\n", plan.explanation));

    for (idx, action) in plan.actions.iter().enumerate() {
        let mut line = format!("  {}. {}", idx + 1, action.kind().cyan());
        let target = action_target(action);
        if !target.is_empty() {
            line.push(' ');
            line.push_str(&target);
        }
        if show_root_hints && action.needs_root() {
            line.push(' ');
            line.push_str(ROOT_MARKER);
        }
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Result line for one finished action
pub fn render_outcome(action: &Action, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Succeeded(detail) => match (action, detail) {
            (Action::ReadFile { path, .. }, Some(content)) => {
                format!("📄 {}:\n{}", path.bold(), content)
            }
            (_, Some(detail)) => format!("{} {}", "✅".green(), detail),
            (_, None) => format!("{} {}", "✅".green(), "done".green()),
        },
        Outcome::Failed(_) | Outcome::PermissionRetryDeclined => {
            format!("{} {}", "❌".red(), outcome.to_string().red())
        }
        Outcome::Skipped(_) => format!("{} {}", "⏭".yellow(), outcome.to_string().yellow()),
    }
}

/// Closing summary line
pub fn render_summary(summary: &ExecutionSummary) -> String {
    let counts = format!(
        "{} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    if summary.all_succeeded() {
        format!("\n✅ Plan complete: {}", counts.green())
    } else {
        format!("\n⚠️  Plan finished: {}", counts.yellow())
    }
}

/// Ask a yes/no question. Anything but `y`/`yes` is a no, and so is EOF.
pub fn prompt_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
) -> io::Result<bool> {
    write!(out, "{} [y/N]: ", question)?;
    out.flush()?;

    let mut response = String::new();
    if input.read_line(&mut response)? == 0 {
        writeln!(out)?;
        return Ok(false);
    }

    Ok(matches!(response.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Operator decisions read from the terminal
#[derive(Debug, Default)]
pub struct TerminalDecider;

impl Decider for TerminalDecider {
    fn confirm(&mut self, question: &str) -> bool {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        match prompt_yes_no(&mut input, &mut out, question) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("failed to read confirmation: {}", e);
                false
            }
        }
    }
}

/// Decider that answers every question the same way
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub bool);

impl Decider for FixedDecider {
    fn confirm(&mut self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "fixed decision");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn plan() -> Plan {
        Plan::new(
            vec![
                Action::InstallPackage {
                    package: "htop".to_string(),
                    needs_root: true,
                },
                Action::ReadFile {
                    path: "/etc/fstab".to_string(),
                    needs_root: false,
                },
                Action::RunCommand {
                    command: vec!["echo".to_string(), "hello world".to_string()],
                    needs_root: false,
                },
            ],
            "Install htop and look around",
        )
    }

    #[test]
    fn test_render_plan_lists_actions() {
        let text = render_plan(&plan(), false);
        assert!(text.contains("3 actions"));
        assert!(text.contains("Install htop and look around"));
        assert!(text.contains("install_package"));
        assert!(text.contains("[htop]"));
        assert!(text.contains("/etc/fstab"));
        assert!(text.contains("`echo 'hello world'`"));
        assert!(!text.contains(ROOT_MARKER));
    }

    #[test]
    fn test_root_marker_only_when_suggesting() {
        let text = render_plan(&plan(), true);
        assert_eq!(text.matches(ROOT_MARKER).count(), 1);
    }

    #[test]
    fn test_prompt_yes_no() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false), ("", false)] {
            let mut input = Cursor::new(answer.as_bytes().to_vec());
            let mut out = Vec::new();
            assert_eq!(prompt_yes_no(&mut input, &mut out, "Go?").unwrap(), expected);
            assert!(String::from_utf8(out).unwrap().starts_with("Go? [y/N]: "));
        }
    }

    #[test]
    fn test_render_outcome_shows_read_content() {
        let action = Action::ReadFile {
            path: "/etc/hostname".to_string(),
            needs_root: false,
        };
        let text = render_outcome(&action, &Outcome::Succeeded(Some("archbox\n".to_string())));
        assert!(text.contains("/etc/hostname"));
        assert!(text.contains("archbox"));

        let text = render_outcome(&action, &Outcome::PermissionRetryDeclined);
        assert!(text.contains("escalation declined"));
    }
}
