//! Action journal
//!
//! Append-only JSON-lines record of executed actions with an XDG-compliant
//! fallback chain. The newest entries double as the recent-action history the
//! planner sees.

use crate::action::Action;
use crate::executor::Outcome;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment override for the journal location
pub const JOURNAL_ENV: &str = "SYSTEMAI_LOG_FILE";

/// How many entries feed the planner's history by default
pub const DEFAULT_HISTORY_LEN: usize = 5;

/// One executed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// RFC 3339 timestamp
    pub ts: String,

    /// Shared by all actions of one plan
    pub req_id: String,

    /// The request that produced the plan
    pub query: String,

    /// Action summary
    pub action: String,

    /// Outcome summary
    pub outcome: String,

    pub ok: bool,
}

impl JournalEntry {
    pub fn new(req_id: &str, query: &str, action: &Action, outcome: &Outcome) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            req_id: req_id.to_string(),
            query: query.to_string(),
            action: action.to_string(),
            outcome: outcome.to_string(),
            ok: outcome.is_success(),
        }
    }

    /// One-line form used as planner history
    pub fn history_line(&self) -> String {
        format!("{}: {}", self.action, self.outcome)
    }
}

/// Generate a request ID for a plan
pub fn generate_req_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// JSON-lines journal file
#[derive(Debug, Clone)]
pub struct ActionJournal {
    path: PathBuf,
}

impl ActionJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Discover the journal path
    ///
    /// Priority:
    /// 1. $SYSTEMAI_LOG_FILE
    /// 2. $XDG_STATE_HOME/systemai/actions.jsonl
    /// 3. ~/.local/state/systemai/actions.jsonl
    pub fn discover() -> Option<Self> {
        if let Ok(path) = std::env::var(JOURNAL_ENV) {
            if !path.is_empty() {
                return Some(Self::new(path));
            }
        }

        if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
            if !xdg_state.is_empty() {
                return Some(Self::new(
                    Path::new(&xdg_state).join("systemai").join("actions.jsonl"),
                ));
            }
        }

        dirs::home_dir().map(|home| {
            Self::new(
                home.join(".local")
                    .join("state")
                    .join("systemai")
                    .join("actions.jsonl"),
            )
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry
    pub fn append(&self, entry: &JournalEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Append, logging instead of failing
    pub fn record(&self, entry: &JournalEntry) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(path = %self.path.display(), "failed to write action journal: {}", e);
        }
    }

    /// Newest `limit` entries, oldest first. Unreadable lines are skipped.
    pub fn recent(&self, limit: usize) -> Vec<JournalEntry> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };

        let entries: Vec<JournalEntry> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }

    /// Recent entries as planner history lines
    pub fn recent_history(&self, limit: usize) -> Vec<String> {
        self.recent(limit)
            .iter()
            .map(JournalEntry::history_line)
            .collect()
    }
}
