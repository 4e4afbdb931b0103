//! Query/download orchestrator.
//!
//! One linear state machine per organization: wait for the query form,
//! select reporting periods, submit, validate the result count, then
//! trigger per-range downloads through the portal's modal.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::QueryRunner;
pub use types::{DocumentType, OrchestratorError, QueryOutcome, QuerySession};
