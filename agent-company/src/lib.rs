//! agent-company: a software company simulated by LLM agents.
//!
//! A roster of role-playing agents (analyst, architect, developers, DBA,
//! tester) takes turns adding advice to a shared transcript. The project
//! manager sits last and turns the whole discussion into a project layout
//! with code for every file.

pub mod agent;
pub mod cli;
pub mod company;
pub mod config;
pub mod deliverable;
pub mod llm;
pub mod output;
pub mod roles;
pub mod roster;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
