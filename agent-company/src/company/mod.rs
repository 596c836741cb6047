//! The simulated software company.
//!
//! A roster of agents passes one growing transcript from worker to worker,
//! each adding its role's advice. The project manager sits last, contributes
//! like everyone else, and then turns the whole transcript into the
//! deliverable: a directory tree followed by one fenced code block per file.
//!
//! Two passes exist:
//! - `develop`: seeded with the customer's requirement
//! - `refine`: seeded with feedback plus a dump of everything produced so far

mod observer;
mod orchestrator;

pub use observer::{CompanyObserver, NullObserver};
pub use orchestrator::{CLOSING_INSTRUCTION, Company, CompanyError, refine_seed};
