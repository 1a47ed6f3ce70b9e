//! SystemAI Common - planning, validation and execution core
//!
//! Plans come from an untrusted planner, pass the validator, and are run by the
//! executor one action at a time. Everything that touches the terminal lives in
//! `systemaictl`; this crate only sees capabilities passed in by the caller.

pub mod action;
pub mod config;
pub mod error;
pub mod exec;
pub mod executor;
pub mod journal;
pub mod planner;
pub mod pm;
pub mod resolver;
pub mod validator;

pub use action::{Action, EnvironmentContext, Plan};
pub use config::SystemAiConfig;
pub use error::{ConfigError, ExecError, PlanningError, ValidationError};
pub use executor::{
    CommandRunner, Decider, ExecutionObserver, ExecutionPolicy, ExecutionSummary, Executor,
    FailurePolicy, FileAccess, Outcome,
};
pub use journal::{ActionJournal, JournalEntry};
pub use planner::{FakePlanner, OllamaPlanner, Planner};
pub use pm::PackageManagerKind;
