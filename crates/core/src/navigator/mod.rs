//! Navigation sequencer.
//!
//! Maintains the workflow's position in the fixed stage order and computes
//! the minimal set of forward/backward transitions to reach a target
//! stage, invoking stage-entry side effects only when moving forward.

mod sequencer;
mod stage;

pub use sequencer::{NavigationError, Navigator, StageActions};
pub use stage::{Stage, SEQUENCE};
