//! Planning collaborator
//!
//! Turns an environment context and a free-text request into a candidate
//! plan. The planner is an untrusted oracle: whatever it returns goes through
//! `decode_plan` here and through the validator before anything runs.

use crate::action::{EnvironmentContext, Plan};
use crate::error::PlanningError;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Default Ollama generate endpoint
pub const OLLAMA_GENERATE_URL: &str = "http://127.0.0.1:11434/api/generate";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Bounded wait for one planning round trip
pub const PLANNING_TIMEOUT_SECS: u64 = 60;

/// Anything that can propose a plan
pub trait Planner {
    fn plan(&self, ctx: &EnvironmentContext) -> Result<Plan, PlanningError>;
}

/// Request body for /api/generate
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
    pub options: GenerateOptions,
}

/// Sampling options
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

/// Response envelope from /api/generate (non-streaming)
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: Option<String>,
}

/// Decode the planner's inner payload into a plan.
///
/// The payload is a string the model wrote; it is parsed as untrusted JSON.
/// Blank payloads and non-JSON are errors, never panics.
pub fn decode_plan(payload: &str) -> Result<Plan, PlanningError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(PlanningError::EmptyResponse);
    }
    let plan: Plan = serde_json::from_str(trimmed)?;
    tracing::debug!(actions = plan.len(), "decoded plan");
    Ok(plan)
}

/// Build the planning prompt for a context
pub fn build_prompt(ctx: &EnvironmentContext) -> String {
    let history = if ctx.recent_actions.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = ctx
            .recent_actions
            .iter()
            .map(|a| format!("  - {}", a))
            .collect();
        format!("- Recent actions:\n{}\n", lines.join("\n"))
    };

    format!(
        r#"You are SystemAI, a Linux system assistant.

Context:
- Distro family: {distro}
- Package manager: {pm}
- Working directory: {cwd}
{history}
User: {query}

Allowed action types: install_package, remove_package, read_file, edit_file, create_file, run_command.
Commands are token arrays, never shell strings. Never touch /, /boot, /proc, /sys or /dev.

Output ONLY valid JSON:
{{
  "actions": [
    {{
      "type": "install_package|remove_package|read_file|edit_file|create_file|run_command",
      "package": "name",
      "path": "/full/path",
      "content": "full file content for create_file or edit_file",
      "diff": "unified diff for edit_file",
      "command": ["program", "arg1", "arg2"],
      "needs_root": true
    }}
  ],
  "explanation": "brief explanation"
}}"#,
        distro = ctx.distro_family,
        pm = ctx.package_manager,
        cwd = ctx.cwd,
        history = history,
        query = ctx.user_query,
    )
}

/// Planner backed by a local Ollama server
pub struct OllamaPlanner {
    model: String,
    endpoint: String,
    timeout_secs: u64,
    options: GenerateOptions,
    client: reqwest::blocking::Client,
}

impl OllamaPlanner {
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, PlanningError> {
        Self::with_timeout(model, endpoint, PLANNING_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, PlanningError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PlanningError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            model: model.into(),
            endpoint: endpoint.into(),
            timeout_secs,
            options: GenerateOptions::default(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for a context
    pub fn request_for(&self, ctx: &EnvironmentContext) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: build_prompt(ctx),
            stream: false,
            format: "json".to_string(),
            options: self.options,
        }
    }
}

impl Planner for OllamaPlanner {
    fn plan(&self, ctx: &EnvironmentContext) -> Result<Plan, PlanningError> {
        let request = self.request_for(ctx);
        tracing::info!(model = %self.model, endpoint = %self.endpoint, "requesting plan");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    PlanningError::Timeout(self.timeout_secs)
                } else {
                    PlanningError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PlanningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GenerateResponse = response
            .json()
            .map_err(|e| PlanningError::Envelope(e.to_string()))?;
        let payload = envelope.response.ok_or(PlanningError::EmptyResponse)?;
        tracing::debug!(bytes = payload.len(), "planner payload received");

        decode_plan(&payload)
    }
}

/// Scripted planner for tests
pub struct FakePlanner {
    responses: Mutex<Vec<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakePlanner {
    /// Payloads are returned in order; the last one repeats
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(payload: impl Into<String>) -> Self {
        Self::new(vec![Ok(payload.into())])
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Err(message.into())])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Prompts seen so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Planner for FakePlanner {
    fn plan(&self, ctx: &EnvironmentContext) -> Result<Plan, PlanningError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(build_prompt(ctx));
        }

        let next = {
            let mut responses = self
                .responses
                .lock()
                .map_err(|_| PlanningError::Http("fake planner poisoned".to_string()))?;
            match responses.len() {
                0 => return Err(PlanningError::EmptyResponse),
                1 => responses[0].clone(),
                _ => responses.remove(0),
            }
        };

        match next {
            Ok(payload) => decode_plan(&payload),
            Err(message) => Err(PlanningError::Http(message)),
        }
    }
}
