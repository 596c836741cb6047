//! Progress callbacks, so the orchestration never prints anything itself.

use crate::agent::{Agent, Reply};
use crate::state::PassKind;

/// Receives progress from a [`super::Company`]. Every method defaults to a no-op.
pub trait CompanyObserver: Send {
    fn on_pass_started(&mut self, _kind: PassKind) {}

    fn on_agent_started(&mut self, _agent: &Agent) {}

    /// Called after `reply` has been appended; `transcript` is the new state.
    fn on_agent_reply(&mut self, _agent: &Agent, _reply: &Reply, _transcript: &str) {}

    /// The manager's synthesis, delivered after `on_pass_finished`. This turn
    /// never goes through `on_agent_reply`.
    fn on_deliverable(&mut self, _kind: PassKind, _text: &str) {}

    fn on_pass_finished(&mut self, _kind: PassKind) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl CompanyObserver for NullObserver {}
