//! Request pipeline: plan, validate, confirm, execute, report
//!
//! One `Session` serves a whole REPL run or a single one-shot command. The
//! planner, the executor's capabilities and the output sink are injected, so
//! the full flow runs in tests with fakes.

use crate::approval_ui::{render_outcome, render_plan, render_summary};
use owo_colors::OwoColorize;
use std::io::Write;
use systemai_common::journal::{generate_req_id, DEFAULT_HISTORY_LEN};
use systemai_common::validator::validate;
use systemai_common::{
    resolver, Action, ActionJournal, CommandRunner, Decider, EnvironmentContext, ExecutionObserver,
    ExecutionSummary, Executor, FailurePolicy, FileAccess, JournalEntry, Outcome, Plan, Planner,
    PlanningError, SystemAiConfig, ValidationError,
};

/// How one request ended
#[derive(Debug)]
pub enum RequestResult {
    /// The planner failed; nothing ran
    PlanningFailed(PlanningError),
    /// The validator refused the plan; nothing ran
    Rejected(ValidationError),
    /// The planner found nothing to do
    NothingToDo,
    /// The operator declined the plan
    Cancelled,
    /// No update sequence exists for the configured package manager
    Unsupported,
    /// The plan ran; one outcome per action
    Executed {
        outcomes: Vec<Outcome>,
        summary: ExecutionSummary,
    },
}

/// Progress printer and journal writer for one execution
struct ReportObserver<'a> {
    out: &'a mut dyn Write,
    journal: Option<&'a ActionJournal>,
    req_id: &'a str,
    query: &'a str,
}

impl ExecutionObserver for ReportObserver<'_> {
    fn action_started(&mut self, index: usize, total: usize, action: &Action) {
        let _ = writeln!(
            self.out,
            "\n{} {}",
            format!("--- Action {}/{} ---", index + 1, total).bold(),
            action
        );
    }

    fn action_finished(&mut self, _index: usize, action: &Action, outcome: &Outcome) {
        let _ = writeln!(self.out, "{}", render_outcome(action, outcome));
        if let Some(journal) = self.journal {
            journal.record(&JournalEntry::new(self.req_id, self.query, action, outcome));
        }
    }
}

/// Everything one operator session needs
pub struct Session {
    pub config: SystemAiConfig,
    /// Skip the plan-level confirmation; escalation still asks
    pub assume_yes: bool,
    planner: Box<dyn Planner>,
    runner: Box<dyn CommandRunner>,
    files: Box<dyn FileAccess>,
    decider: Box<dyn Decider>,
    journal: Option<ActionJournal>,
    out: Box<dyn Write>,
}

impl Session {
    pub fn new(
        config: SystemAiConfig,
        planner: Box<dyn Planner>,
        runner: Box<dyn CommandRunner>,
        files: Box<dyn FileAccess>,
        decider: Box<dyn Decider>,
        out: Box<dyn Write>,
    ) -> Self {
        Self {
            config,
            assume_yes: false,
            planner,
            runner,
            files,
            decider,
            journal: None,
            out,
        }
    }

    pub fn with_journal(mut self, journal: Option<ActionJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Output sink shared with the REPL
    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    /// Context for the planner
    pub fn context(&self, query: &str) -> EnvironmentContext {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "/".to_string());
        let recent_actions = self
            .journal
            .as_ref()
            .map(|j| j.recent_history(DEFAULT_HISTORY_LEN))
            .unwrap_or_default();

        EnvironmentContext {
            distro_family: self.config.distro_family.clone(),
            package_manager: self.config.package_manager,
            cwd,
            user_query: query.to_string(),
            recent_actions,
        }
    }

    /// Full pipeline for one free-text request
    pub fn handle_query(&mut self, query: &str) -> RequestResult {
        let ctx = self.context(query);

        let _ = write!(self.out, "🧠 Planning...");
        let _ = self.out.flush();
        let plan = match self.planner.plan(&ctx) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("planning failed: {}", e);
                let _ = writeln!(self.out, "\n{} {}", "❌ Planner error:".red(), e);
                return RequestResult::PlanningFailed(e);
            }
        };
        let _ = writeln!(self.out);

        self.run_plan(query, plan, FailurePolicy::ContinueOnFailure)
    }

    /// Full system update as a plan that stops at the first failure
    pub fn run_update(&mut self) -> RequestResult {
        let manager = self.config.package_manager;
        let steps = resolver::update_commands(manager);
        if steps.is_empty() {
            let _ = writeln!(
                self.out,
                "{} no update sequence for package manager '{}'",
                "⚠️".yellow(),
                manager
            );
            return RequestResult::Unsupported;
        }

        let actions = steps
            .into_iter()
            .map(|command| Action::RunCommand {
                command,
                needs_root: true,
            })
            .collect();
        let plan = Plan::new(actions, format!("Update the system with {}", manager));
        self.run_plan("update my system", plan, FailurePolicy::AbortRemaining)
    }

    /// Validate, confirm, execute and report an already-planned request
    pub fn run_plan(&mut self, query: &str, plan: Plan, on_failure: FailurePolicy) -> RequestResult {
        if let Err(e) = validate(&plan) {
            let _ = writeln!(self.out, "{} {}", "❌ Unsafe plan:".red(), e);
            return RequestResult::Rejected(e);
        }

        let _ = write!(self.out, "{}", render_plan(&plan, self.config.allow_root_suggest));

        if plan.is_empty() {
            return RequestResult::NothingToDo;
        }

        if !self.assume_yes && !self.decider.confirm("\nExecute plan?") {
            let _ = writeln!(self.out, "Cancelled.");
            return RequestResult::Cancelled;
        }

        let req_id = generate_req_id();
        tracing::info!(%req_id, actions = plan.len(), "executing plan");
        let _ = writeln!(self.out, "🚀 Executing...");

        let policy = self.config.execution_policy(on_failure);
        let mut observer = ReportObserver {
            out: self.out.as_mut(),
            journal: self.journal.as_ref(),
            req_id: &req_id,
            query,
        };
        let outcomes = Executor::new(
            policy,
            self.runner.as_mut(),
            self.files.as_mut(),
            self.decider.as_mut(),
        )
        .with_observer(&mut observer)
        .execute(&plan);

        let summary = ExecutionSummary::from_outcomes(&outcomes);
        let _ = writeln!(self.out, "{}", render_summary(&summary));
        let _ = self.out.flush();

        RequestResult::Executed { outcomes, summary }
    }
}
