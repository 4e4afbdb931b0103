//! Query/download orchestrator configuration.
//!
//! Defaults mirror the portal's observed latencies; every knob exists
//! because the portal needed it at some point.

use serde::{Deserialize, Serialize};

/// Timing and retry knobs for one query/download run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How long to wait for the query form to become interactable (ms).
    /// Expiring here is fatal for the item: the form never loaded.
    pub form_timeout_ms: u64,

    /// Settle delay after stage-changing interactions (ms).
    pub settle_delay_ms: u64,

    /// Attempts at the "all periods" aggregate control.
    pub period_select_attempts: u32,

    /// Delay between aggregate-control attempts (ms).
    pub period_retry_delay_ms: u64,

    /// Maximum result-count polls before concluding zero results.
    pub result_poll_attempts: u32,

    /// Delay between result-count polls (ms).
    pub result_poll_interval_ms: u64,

    /// How long to wait for the result-count indicator to render at
    /// all (ms).
    pub result_indicator_timeout_ms: u64,

    /// How long to wait for required controls (download action, range
    /// dropdown) to become visible (ms).
    pub control_timeout_ms: u64,

    /// How long to wait for the download tab inside the modal (ms).
    pub modal_tab_timeout_ms: u64,

    /// Modal open animation allowance (ms).
    pub modal_animation_delay_ms: u64,

    /// Delay for the range `<select>` to populate after tab activation (ms).
    pub range_populate_delay_ms: u64,

    /// Delay around range dropdown open/select clicks (ms).
    pub dropdown_delay_ms: u64,

    /// How long to wait for a spreadsheet response per range before
    /// assuming the download started anyway (ms).
    pub range_response_timeout_ms: u64,

    /// Settle delay between range iterations (ms).
    pub range_settle_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            form_timeout_ms: 20_000,
            settle_delay_ms: 1_500,
            period_select_attempts: 3,
            period_retry_delay_ms: 1_000,
            result_poll_attempts: 24,
            result_poll_interval_ms: 5_000,
            result_indicator_timeout_ms: 180_000,
            control_timeout_ms: 20_000,
            modal_tab_timeout_ms: 15_000,
            modal_animation_delay_ms: 3_000,
            range_populate_delay_ms: 1_000,
            dropdown_delay_ms: 500,
            range_response_timeout_ms: 120_000,
            range_settle_delay_ms: 3_000,
        }
    }
}
