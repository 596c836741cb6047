//! Company orchestrator: walks the roster and asks the manager to synthesize.

use tokio_util::sync::CancellationToken;

use super::observer::{CompanyObserver, NullObserver};
use crate::agent::{Agent, Cancelled};
use crate::state::{PassKind, ProjectState};

/// Prepended to the full transcript for the manager's final synthesis.
pub const CLOSING_INSTRUCTION: &str = "根据以下团队成员的建议，生成一个完整的项目结构和代码。请按照以下格式输出：\n\
1. 首先列出完整的项目目录结构，每个目录和文件单独一行，使用缩进表示层级关系。\n\
2. 然后，对于每个代码文件，使用以下格式：\n\n\
```文件名\n\
// 文件内容\n\
```\n\n\
确保每个文件都有清晰的开始和结束标记，并提供完整的代码内容。现在，请根据以下团队成员的建议生成项目：\n";

#[derive(Debug, thiserror::Error)]
pub enum CompanyError {
    #[error("invalid roster: {0}")]
    InvalidRoster(&'static str),
    /// `partial` holds whatever the pass recorded before it stopped.
    #[error("{kind} pass cancelled")]
    Cancelled {
        kind: PassKind,
        partial: ProjectState,
    },
}

/// Transcript seed for a refine pass.
pub fn refine_seed(feedback: &str, state: &ProjectState) -> String {
    format!("用户反馈:\n{feedback}\n\n当前项目状态:\n{}", state.dump())
}

/// A roster plus everything it has produced this session.
pub struct Company<O: CompanyObserver = NullObserver> {
    roster: Vec<Agent>,
    state: ProjectState,
    observer: O,
    transcript: String,
}

impl Company<NullObserver> {
    pub fn new(roster: Vec<Agent>) -> Result<Self, CompanyError> {
        Self::with_observer(roster, NullObserver)
    }
}

impl<O: CompanyObserver> Company<O> {
    /// The roster must hold at least one worker followed by exactly one
    /// manager in the last slot.
    pub fn with_observer(roster: Vec<Agent>, observer: O) -> Result<Self, CompanyError> {
        let Some(last) = roster.last() else {
            return Err(CompanyError::InvalidRoster("roster is empty"));
        };
        if !last.role().key.is_manager() {
            return Err(CompanyError::InvalidRoster(
                "the last agent must be the project manager",
            ));
        }
        if roster.len() < 2 {
            return Err(CompanyError::InvalidRoster("roster has no workers"));
        }
        let workers = &roster[..roster.len() - 1];
        if workers.iter().any(|a| a.role().key.is_manager()) {
            return Err(CompanyError::InvalidRoster(
                "only one project manager is allowed",
            ));
        }
        Ok(Self {
            roster,
            state: ProjectState::new(),
            observer,
            transcript: String::new(),
        })
    }

    pub fn roster(&self) -> &[Agent] {
        &self.roster
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Transcript of the most recent pass, without the closing instruction.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn manager(&self) -> &Agent {
        &self.roster[self.roster.len() - 1]
    }

    /// Run the team over a customer requirement and return the deliverable.
    pub async fn develop(
        &mut self,
        requirement: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CompanyError> {
        self.run_pass(PassKind::Develop, requirement.to_string(), cancel)
            .await
    }

    /// Run the team again over feedback and the current project state.
    pub async fn refine(
        &mut self,
        feedback: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CompanyError> {
        let seed = refine_seed(feedback, &self.state);
        self.run_pass(PassKind::Refine, seed, cancel).await
    }

    async fn run_pass(
        &mut self,
        kind: PassKind,
        seed: String,
        cancel: &CancellationToken,
    ) -> Result<String, CompanyError> {
        tracing::info!(pass = %kind, agents = self.roster.len(), "Pass started");
        self.observer.on_pass_started(kind);
        self.transcript = seed;

        for agent in self.roster.iter_mut() {
            self.observer.on_agent_started(agent);
            let reply = match agent.process_message(&self.transcript, cancel).await {
                Ok(reply) => reply,
                Err(Cancelled) => return Err(cancelled(kind, &self.state)),
            };
            let role = agent.role();
            let block = format!("\n\n{}的建议:\n{}", role.title, reply.raw);
            self.transcript.push_str(&block);
            let key = kind.contribution_key(role.key);
            self.state.insert(key, reply.raw.clone());
            let transcript = &self.transcript;
            self.observer.on_agent_reply(agent, &reply, transcript);
        }

        let request = format!("{CLOSING_INSTRUCTION}{}", self.transcript);
        let manager = self
            .roster
            .last_mut()
            .ok_or(CompanyError::InvalidRoster("roster is empty"))?;
        let deliverable = match manager.get_completion(&request, cancel).await {
            Ok(text) => text,
            Err(Cancelled) => return Err(cancelled(kind, &self.state)),
        };

        let key = kind.deliverable_key();
        self.state.insert(key, deliverable.clone());
        self.observer.on_pass_finished(kind);
        self.observer.on_deliverable(kind, &deliverable);
        tracing::info!(pass = %kind, chars = deliverable.chars().count(), "Pass finished");
        Ok(deliverable)
    }
}

fn cancelled(kind: PassKind, state: &ProjectState) -> CompanyError {
    tracing::warn!(pass = %kind, completed = state.len(), "Pass cancelled");
    CompanyError::Cancelled {
        kind,
        partial: state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::{APOLOGY, AgentSettings};
    use crate::llm::CompletionBackend;
    use crate::roles::{RoleCatalog, RoleKey};
    use crate::roster::build_roster;
    use crate::state::{FINAL_PROJECT, REFINED_PROJECT};
    use crate::testing::{RecordingObserver, ScriptedBackend};

    fn company(n: usize, backend: Arc<ScriptedBackend>) -> Company<RecordingObserver> {
        let backend: Arc<dyn CompletionBackend> = backend;
        let catalog = RoleCatalog::builtin();
        let roster = build_roster(n, &catalog, backend, &AgentSettings::default()).unwrap();
        Company::with_observer(roster, RecordingObserver::default()).unwrap()
    }

    fn agent(name: &str, role: RoleKey) -> Agent {
        let backend: Arc<dyn CompletionBackend> = Arc::new(ScriptedBackend::echo());
        let catalog = RoleCatalog::builtin();
        Agent::new(name, role, &catalog, backend, AgentSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn develop_three_agents() {
        let backend = Arc::new(ScriptedBackend::new(["needs", "design", "plan", "tree"]));
        let mut company = company(3, backend.clone());

        let deliverable = company
            .develop("build a todo app", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(deliverable, "tree");
        let keys: Vec<&str> = company.state().keys().collect();
        assert_eq!(keys, vec!["analyst", "architect", "manager", FINAL_PROJECT]);

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 4);
        assert_eq!(prompts[0], "build a todo app");
        assert_eq!(prompts[1], "build a todo app\n\n需求分析师的建议:\nneeds");
        assert!(prompts[2].ends_with("系统架构师的建议:\ndesign"));
        assert!(prompts[3].starts_with(CLOSING_INSTRUCTION));
        assert!(prompts[3].ends_with("项目经理的建议:\nplan"));
    }

    #[tokio::test]
    async fn transcript_grows_by_each_appended_block() {
        let backend = Arc::new(ScriptedBackend::echo());
        let mut company = company(5, backend);
        let cancel = CancellationToken::new();
        company.develop("req", &cancel).await.unwrap();

        let replies = &company.observer().replies;
        assert_eq!(replies.len(), 5);
        let mut previous = "req".chars().count();
        for reply in replies {
            let block = format!("\n\n{}的建议:\n{}", reply.title, reply.raw);
            assert!(reply.transcript_chars >= previous + block.chars().count());
            previous = reply.transcript_chars;
        }
        assert_eq!(company.transcript().chars().count(), previous);
    }

    #[tokio::test]
    async fn failed_agent_contributes_apology_and_pipeline_continues() {
        let backend = Arc::new(ScriptedBackend::echo().fail_on(1));
        let mut company = company(4, backend.clone());
        let cancel = CancellationToken::new();
        company.develop("req", &cancel).await.unwrap();

        assert_eq!(company.state().get("architect"), Some(APOLOGY));
        assert_eq!(company.state().get("frontend"), Some("reply 3"));
        let prompts = backend.prompts();
        assert!(prompts[2].contains(&format!("系统架构师的建议:\n{APOLOGY}")));
        assert_eq!(prompts.len(), 5);
    }

    #[tokio::test]
    async fn refine_seeds_with_feedback_and_state() {
        let backend = Arc::new(ScriptedBackend::echo());
        let mut company = company(2, backend.clone());
        let cancel = CancellationToken::new();
        company.develop("req", &cancel).await.unwrap();
        let dump = company.state().dump();

        let refined = company.refine("add login", &cancel).await.unwrap();

        assert_eq!(refined, "reply 6");
        assert!(company.state().contains_key(FINAL_PROJECT));
        assert!(company.state().contains_key(REFINED_PROJECT));
        assert!(company.state().contains_key("analyst_refinement"));
        assert!(company.state().contains_key("manager_refinement"));

        let seed = &backend.prompts()[3];
        assert!(seed.contains("add login"));
        assert!(seed.contains(&dump));
    }

    #[tokio::test]
    async fn synthesis_is_reported_separately() {
        let backend = Arc::new(ScriptedBackend::echo());
        let mut company = company(2, backend);
        let cancel = CancellationToken::new();
        company.develop("req", &cancel).await.unwrap();

        let obs = company.observer();
        let agents: Vec<&str> = obs.replies.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(agents, vec!["Agent1", "Agent2"]);
        assert_eq!(obs.deliverables, vec!["reply 3".to_string()]);
        // Manager history holds its turn plus the synthesis exchange.
        assert_eq!(company.manager().history().len(), 4);
    }

    #[tokio::test]
    async fn pass_ends_before_deliverable_is_shown() {
        let backend = Arc::new(ScriptedBackend::echo());
        let mut company = company(2, backend);
        let cancel = CancellationToken::new();
        company.develop("req", &cancel).await.unwrap();
        company.refine("more", &cancel).await.unwrap();

        assert_eq!(
            company.observer().events,
            vec![
                "started develop",
                "agent Agent1",
                "reply Agent1",
                "agent Agent2",
                "reply Agent2",
                "finished develop",
                "deliverable develop",
                "started refine",
                "agent Agent1",
                "reply Agent1",
                "agent Agent2",
                "reply Agent2",
                "finished refine",
                "deliverable refine",
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_surfaces_partial_state() {
        let backend = Arc::new(ScriptedBackend::hanging());
        let mut company = company(3, backend);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = company.develop("req", &cancel).await.unwrap_err();
        match err {
            CompanyError::Cancelled { kind, partial } => {
                assert_eq!(kind, PassKind::Develop);
                assert!(partial.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(company.observer().deliverables.is_empty());
    }

    #[test]
    fn roster_without_manager_is_rejected() {
        let roster = vec![
            agent("Agent1", RoleKey::Analyst),
            agent("Agent2", RoleKey::Tester),
        ];
        let result = Company::new(roster);
        assert!(matches!(result, Err(CompanyError::InvalidRoster(_))));
    }

    #[test]
    fn lone_manager_is_rejected() {
        let result = Company::new(vec![agent("Agent1", RoleKey::Manager)]);
        assert!(matches!(result, Err(CompanyError::InvalidRoster(_))));
    }

    #[test]
    fn second_manager_is_rejected() {
        let roster = vec![
            agent("Agent1", RoleKey::Manager),
            agent("Agent2", RoleKey::Analyst),
            agent("Agent3", RoleKey::Manager),
        ];
        let result = Company::new(roster);
        assert!(matches!(result, Err(CompanyError::InvalidRoster(_))));
    }
}
