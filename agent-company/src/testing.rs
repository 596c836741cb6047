//! Test doubles: a scripted completion backend and a recording observer.
//!
//! Built for unit tests and, through the `testing` feature, for the
//! integration tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::agent::{Agent, Reply};
use crate::company::CompanyObserver;
use crate::llm::{ChatRole, CompletionBackend, CompletionRequest};
use crate::state::PassKind;

#[derive(Debug)]
enum Mode {
    Script(VecDeque<String>),
    Echo,
    Fail,
    Hang,
}

/// A backend that answers from a script instead of the network.
///
/// Every request is recorded and can be inspected with
/// [`ScriptedBackend::requests`].
#[derive(Debug)]
pub struct ScriptedBackend {
    mode: Mutex<Mode>,
    failures: HashSet<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
}

// A panicking test poisons the lock; later readers still want the data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            failures: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `replies` in order, then fail once they run out.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies = replies.into_iter().map(Into::into).collect();
        Self::with_mode(Mode::Script(replies))
    }

    /// Answer with `reply N` where N counts calls from 1.
    pub fn echo() -> Self {
        Self::with_mode(Mode::Echo)
    }

    /// Fail every call.
    pub fn failing() -> Self {
        Self::with_mode(Mode::Fail)
    }

    /// Never answer; only cancellation gets a caller out.
    pub fn hanging() -> Self {
        Self::with_mode(Mode::Hang)
    }

    /// Make the call with zero-based index `call` fail.
    pub fn fail_on(mut self, call: usize) -> Self {
        self.failures.insert(call);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// The final user message of each recorded request.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| {
                r.messages
                    .iter()
                    .rev()
                    .find(|m| m.role == ChatRole::User)
                    .map(|m| m.content.clone())
            })
            .collect()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let call = {
            let mut requests = lock(&self.requests);
            requests.push(request.clone());
            requests.len() - 1
        };
        if self.failures.contains(&call) {
            anyhow::bail!("scripted failure on call {call}");
        }

        let next = match &mut *lock(&self.mode) {
            Mode::Script(replies) => Some(replies.pop_front()),
            Mode::Echo => Some(Some(format!("reply {}", call + 1))),
            Mode::Fail => Some(None),
            Mode::Hang => None,
        };

        match next {
            Some(Some(reply)) => Ok(reply),
            Some(None) => anyhow::bail!("scripted backend has no reply for call {call}"),
            None => std::future::pending::<Result<String>>().await,
        }
    }
}

/// A reply as an observer saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReply {
    pub agent: String,
    pub title: String,
    pub raw: String,
    /// Transcript length in chars once this reply was appended.
    pub transcript_chars: usize,
}

/// Observer that keeps what it was told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    /// Every callback in order, e.g. `started develop` or `reply Agent1`.
    pub events: Vec<String>,
    pub replies: Vec<RecordedReply>,
    pub deliverables: Vec<String>,
}

impl CompanyObserver for RecordingObserver {
    fn on_pass_started(&mut self, kind: PassKind) {
        self.events.push(format!("started {kind}"));
    }

    fn on_agent_started(&mut self, agent: &Agent) {
        self.events.push(format!("agent {}", agent.name()));
    }

    fn on_agent_reply(&mut self, agent: &Agent, reply: &Reply, transcript: &str) {
        self.events.push(format!("reply {}", agent.name()));
        self.replies.push(RecordedReply {
            agent: agent.name().to_string(),
            title: agent.role().title.clone(),
            raw: reply.raw.clone(),
            transcript_chars: transcript.chars().count(),
        });
    }

    fn on_pass_finished(&mut self, kind: PassKind) {
        self.events.push(format!("finished {kind}"));
    }

    fn on_deliverable(&mut self, kind: PassKind, text: &str) {
        self.events.push(format!("deliverable {kind}"));
        self.deliverables.push(text.to_string());
    }
}
