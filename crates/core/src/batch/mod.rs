//! Batch processing of organization targets.
//!
//! Builds the ordered target list and runs it sequentially over one
//! automation session, isolating per-item failures.

mod runner;
mod targets;
mod types;

pub use runner::{BatchReport, BatchRunner};
pub use targets::{build_targets, parse_organization_list, TargetSpec};
pub use types::{BatchOutcome, BatchStatus, OrganizationTarget, TargetId};
