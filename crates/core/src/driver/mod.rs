//! Page automation abstraction.
//!
//! This module provides a [`PageDriver`] trait for driving the portal UI.
//! The workflow core (navigator, orchestrator, batch runner) depends only
//! on the trait; the one concrete backend attaches to an already-running
//! Chrome instance over the DevTools protocol.

mod cdp;
mod types;

pub use cdp::CdpDriver;
pub use types::*;
