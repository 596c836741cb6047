//! A single role-playing member of the company.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::llm::{
    ChatMessage, CompletionBackend, CompletionRequest, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use crate::output;
use crate::roles::{RoleCatalog, RoleDefinition, RoleKey};

/// Substituted for the reply whenever the completion call fails.
pub const APOLOGY: &str = "抱歉，我现在无法回答这个问题。";

/// Model parameters shared by every agent in a roster.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    /// Keep at most this many exchanges of history. `None` keeps everything.
    pub history_limit: Option<usize>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            history_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry in an agent's private history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// What [`Agent::process_message`] hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The model's text, or [`APOLOGY`].
    pub raw: String,
    /// Colored, indented rendering for the console.
    pub formatted: String,
}

/// Why an agent could not be created.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("role '{0}' is not defined in the role catalog")]
    UnknownRole(RoleKey),
    #[error("agent name must not be empty")]
    EmptyName,
}

/// The only way a call on an [`Agent`] fails: backend errors become [`APOLOGY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled")]
pub struct Cancelled;

pub struct Agent {
    name: String,
    role: RoleDefinition,
    history: Vec<Turn>,
    backend: Arc<dyn CompletionBackend>,
    settings: AgentSettings,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role.key)
            .field("history", &self.history.len())
            .finish()
    }
}

impl Agent {
    /// Create an agent for a role that must exist in `catalog`.
    pub fn new(
        name: impl Into<String>,
        role: RoleKey,
        catalog: &RoleCatalog,
        backend: Arc<dyn CompletionBackend>,
        settings: AgentSettings,
    ) -> Result<Self, AgentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AgentError::EmptyName);
        }
        let role = catalog
            .get(role)
            .cloned()
            .ok_or(AgentError::UnknownRole(role))?;
        Ok(Self {
            name,
            role,
            history: Vec::new(),
            backend,
            settings,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &RoleDefinition {
        &self.role
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are a {} in a software development company. {}",
            self.role.title, self.role.prompt
        );
        if !self.role.skills.is_empty() {
            prompt.push_str("\nSkills: ");
            prompt.push_str(&self.role.skills.join(", "));
        }
        prompt
    }

    /// Ask the model for this role's reply and render it for the console.
    pub async fn process_message(
        &mut self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<Reply, Cancelled> {
        tracing::info!(
            agent = %self.name,
            role = %self.role.key,
            input_chars = message.chars().count(),
            "Processing message"
        );
        let raw = self.get_completion(message, cancel).await?;
        let formatted = output::render_reply(&self.role.title, &raw, self.role.color);
        Ok(Reply { raw, formatted })
    }

    /// Run one completion call against this agent's history.
    ///
    /// Backend failures are logged and replaced with [`APOLOGY`]. Only
    /// cancellation is returned as an error, and it leaves history untouched.
    pub async fn get_completion(
        &mut self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<String, Cancelled> {
        let request = self.build_request(message);
        tracing::debug!(
            agent = %self.name,
            role = %self.role.key,
            input = %message,
            "Completion input"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled),
            result = self.backend.complete(&request) => result,
        };

        let reply = match result {
            Ok(text) => {
                tracing::debug!(agent = %self.name, output = %text, "Completion output");
                text.trim().to_string()
            }
            Err(e) => {
                tracing::warn!(
                    agent = %self.name,
                    role = %self.role.key,
                    error = %e,
                    "Completion failed"
                );
                APOLOGY.to_string()
            }
        };

        self.record(message, &reply);
        Ok(reply)
    }

    fn build_request(&self, message: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt()));
        for turn in &self.history {
            messages.push(match turn.speaker {
                Speaker::User => ChatMessage::user(turn.text.clone()),
                Speaker::Assistant => ChatMessage::assistant(turn.text.clone()),
            });
        }
        messages.push(ChatMessage::user(message));
        CompletionRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages,
        }
    }

    fn record(&mut self, message: &str, reply: &str) {
        self.history.push(Turn {
            speaker: Speaker::User,
            text: message.to_string(),
        });
        self.history.push(Turn {
            speaker: Speaker::Assistant,
            text: reply.to_string(),
        });
        if let Some(limit) = self.settings.history_limit {
            let keep = limit * 2;
            if self.history.len() > keep {
                let excess = self.history.len() - keep;
                self.history.drain(..excess);
            }
        }
    }
}
