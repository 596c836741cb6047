//! Staffing: turn a headcount into an ordered roster of agents.

use std::sync::Arc;

use crate::agent::{Agent, AgentError, AgentSettings};
use crate::llm::CompletionBackend;
use crate::roles::{RoleCatalog, RoleKey, WORKER_SEQUENCE};

/// Smallest company that can hold a discussion: one worker plus the manager.
pub const MIN_AGENTS: usize = 2;
/// Above this the CLI asks for confirmation.
pub const RECOMMENDED_MAX_AGENTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("a company needs at least 2 agents, got {0}")]
    TooFewAgents(usize),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Role assigned to each slot of an `n`-agent roster.
///
/// Slots `0..n-1` cycle through [`WORKER_SEQUENCE`]; the last slot is always
/// the project manager.
pub fn roster_roles(n: usize) -> Result<Vec<RoleKey>, RosterError> {
    if n < MIN_AGENTS {
        return Err(RosterError::TooFewAgents(n));
    }
    let mut roles: Vec<RoleKey> = (0..n - 1)
        .map(|i| WORKER_SEQUENCE[i % WORKER_SEQUENCE.len()])
        .collect();
    roles.push(RoleKey::Manager);
    Ok(roles)
}

/// Build agents `Agent1..AgentN` for an `n`-person company.
pub fn build_roster(
    n: usize,
    catalog: &RoleCatalog,
    backend: Arc<dyn CompletionBackend>,
    settings: &AgentSettings,
) -> Result<Vec<Agent>, RosterError> {
    let roster = roster_roles(n)?
        .into_iter()
        .enumerate()
        .map(|(i, role)| {
            Agent::new(
                format!("Agent{}", i + 1),
                role,
                catalog,
                Arc::clone(&backend),
                settings.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(agents = roster.len(), "Assembled roster");
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    fn build(n: usize) -> Result<Vec<Agent>, RosterError> {
        build_roster(
            n,
            &RoleCatalog::builtin(),
            Arc::new(ScriptedBackend::echo()),
            &AgentSettings::default(),
        )
    }

    #[test]
    fn three_agents() {
        let roster = build(3).unwrap();
        let roles: Vec<RoleKey> = roster.iter().map(|a| a.role().key).collect();
        assert_eq!(
            roles,
            vec![RoleKey::Analyst, RoleKey::Architect, RoleKey::Manager]
        );
        let names: Vec<&str> = roster.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["Agent1", "Agent2", "Agent3"]);
    }

    #[test]
    fn workers_cycle_and_manager_is_last() {
        for n in MIN_AGENTS..=20 {
            let roles = roster_roles(n).unwrap();
            assert_eq!(roles.len(), n);
            assert_eq!(*roles.last().unwrap(), RoleKey::Manager);
            for (i, role) in roles[..n - 1].iter().enumerate() {
                assert_eq!(*role, WORKER_SEQUENCE[i % 6], "n={n} slot={i}");
            }
            assert_eq!(roles.iter().filter(|r| r.is_manager()).count(), 1);
        }
    }

    #[test]
    fn eighth_agent_wraps_to_analyst() {
        let roles = roster_roles(8).unwrap();
        assert_eq!(roles[6], RoleKey::Analyst);
        assert_eq!(roles[7], RoleKey::Manager);
    }

    #[test]
    fn fewer_than_two_is_rejected() {
        assert!(matches!(build(1), Err(RosterError::TooFewAgents(1))));
        assert!(matches!(build(0), Err(RosterError::TooFewAgents(0))));
    }
}
