//! Query/download state machine for one organization.
//!
//! Runs `AwaitForm → SelectPeriods → Submit → ValidateResults →
//! {NoResults | Download} → Done` on top of a [`PageDriver`]. Every state
//! owns its timeouts; the runner never loops back.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::driver::{DriverError, PageDriver, ResponseMatcher, SelectOption, WaitOptions};
use crate::portal::Locators;

use super::config::OrchestratorConfig;
use super::types::{DocumentType, OrchestratorError, QueryOutcome, QuerySession};

/// Range option value the portal uses for "no selection".
const RANGE_SENTINEL: &str = "-1";

/// Content types that identify a spreadsheet download response.
const SPREADSHEET_CONTENT_TYPES: [&str; 2] = ["application/vnd.ms-excel", "spreadsheet"];

/// Drives one query/download pass over the information card.
pub struct QueryRunner {
    driver: Arc<dyn PageDriver>,
    locators: Arc<Locators>,
    config: OrchestratorConfig,
    /// URL suffix identifying portal responses (for download matching).
    page_suffix: String,
}

impl QueryRunner {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        locators: Arc<Locators>,
        config: OrchestratorConfig,
        page_suffix: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            locators,
            config,
            page_suffix: page_suffix.into(),
        }
    }

    /// Run the full state machine once.
    ///
    /// Triggered downloads are announced through the driver; the caller
    /// drains and tracks them after every run, failed ones included.
    /// `Ok(NoResults)` is a normal terminal outcome, never an error.
    pub async fn run(&self, doc_type: DocumentType) -> Result<QueryOutcome, OrchestratorError> {
        let mut session = QuerySession::new(doc_type);
        info!("Querying {}", session.doc_type);

        self.redirect_guard()?;
        self.await_form().await?;
        self.select_periods(&mut session).await?;
        self.submit().await?;
        self.redirect_guard()?;

        let total = self.validate_results(&mut session).await?;
        if total == 0 {
            info!("Query validated to zero results");
            return Ok(QueryOutcome::NoResults);
        }
        info!("Query returned {} results", total);

        let ranges = self.download(&mut session, total).await?;
        self.redirect_guard()?;

        Ok(QueryOutcome::Downloaded {
            total_results: total,
            ranges,
        })
    }

    /// Surface a driver-observed session redirect as the recoverable
    /// per-item error.
    fn redirect_guard(&self) -> Result<(), OrchestratorError> {
        if self.driver.take_redirect_flag() {
            return Err(OrchestratorError::RedirectDetected);
        }
        Ok(())
    }

    fn millis(&self, ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    /// Bounded wait for the query form to become interactable.
    async fn await_form(&self) -> Result<(), OrchestratorError> {
        self.driver
            .wait_for(
                &self.locators.query_form_marker,
                WaitOptions::present(self.millis(self.config.form_timeout_ms)),
            )
            .await
            .map_err(|_| OrchestratorError::FormUnavailable)?;

        tokio::time::sleep(self.millis(self.config.settle_delay_ms)).await;
        Ok(())
    }

    /// Check the "all periods" aggregate control, falling back to the
    /// individual period checkboxes when it refuses to stick.
    async fn select_periods(&self, session: &mut QuerySession) -> Result<(), OrchestratorError> {
        for attempt in 1..=self.config.period_select_attempts {
            self.driver.click(&self.locators.all_periods_label).await?;
            tokio::time::sleep(self.millis(self.config.period_retry_delay_ms)).await;

            if self.driver.is_checked(&self.locators.all_periods_checkbox).await? {
                debug!("All-periods control checked on attempt {}", attempt);
                session.periods_selected = 0;
                return Ok(());
            }
            warn!("All-periods control not checked after attempt {}", attempt);
        }

        // Fallback: walk the individual period checkboxes. Best effort,
        // no verification; entries are 1-based.
        let mut index = 1;
        while self.driver.exists(&self.locators.period_checkbox(index)).await? {
            if let Err(e) = self.driver.click(&self.locators.period_checkbox(index)).await {
                warn!("Could not check period #{}: {}", index, e);
            }
            index += 1;
        }
        session.periods_selected = index - 1;
        info!("Selected {} individual periods", session.periods_selected);
        Ok(())
    }

    /// Click the query action exactly once.
    async fn submit(&self) -> Result<(), OrchestratorError> {
        self.driver
            .wait_for(
                &self.locators.query_button,
                WaitOptions::present(self.millis(self.config.control_timeout_ms)),
            )
            .await
            .map_err(|_| OrchestratorError::SubmitControlMissing)?;

        self.driver.click(&self.locators.query_button).await?;
        debug!("Query submitted");
        Ok(())
    }

    /// Poll the result-count indicator until it reads positive or the
    /// attempt budget is spent. All-zero reads mean zero results.
    async fn validate_results(
        &self,
        session: &mut QuerySession,
    ) -> Result<u64, OrchestratorError> {
        self.driver
            .wait_for(
                &self.locators.result_count,
                WaitOptions::present(self.millis(self.config.result_indicator_timeout_ms)),
            )
            .await?;

        for attempt in 1..=self.config.result_poll_attempts {
            let text = self.driver.read_text(&self.locators.result_count).await?;
            let count = parse_result_count(&text);
            session.last_result_count = count;

            if count > 0 {
                debug!("Positive result count after {} polls: {}", attempt, count);
                return Ok(count);
            }
            debug!("Result count still zero (poll {}/{})", attempt, self.config.result_poll_attempts);

            if attempt < self.config.result_poll_attempts {
                tokio::time::sleep(self.millis(self.config.result_poll_interval_ms)).await;
            }
        }
        Ok(0)
    }

    /// Open the download modal and trigger one download per range option.
    ///
    /// Returns the number of range downloads triggered.
    async fn download(
        &self,
        session: &mut QuerySession,
        total_results: u64,
    ) -> Result<usize, OrchestratorError> {
        self.driver
            .wait_for(
                &self.locators.download_button,
                WaitOptions::visible(self.millis(self.config.control_timeout_ms)),
            )
            .await
            .map_err(|_| OrchestratorError::DownloadControlMissing { total_results })?;
        self.driver.click(&self.locators.download_button).await?;
        tokio::time::sleep(self.millis(self.config.modal_animation_delay_ms)).await;

        self.driver
            .wait_for(
                &self.locators.modal_download_tab,
                WaitOptions::visible(self.millis(self.config.modal_tab_timeout_ms)),
            )
            .await
            .map_err(|_| OrchestratorError::ModalActivationFailed)?;
        self.driver.click(&self.locators.modal_download_tab).await?;
        tokio::time::sleep(self.millis(self.config.range_populate_delay_ms)).await;

        let options = self.driver.select_options(&self.locators.range_select).await?;
        session.pending_ranges = options
            .into_iter()
            .filter(|o| o.value != RANGE_SENTINEL)
            .collect();
        info!("{} download ranges to process", session.pending_ranges.len());

        let ranges = session.pending_ranges.clone();
        for (position, option) in ranges.iter().enumerate() {
            self.download_range(option, position + 1, session.pending_ranges.len())
                .await?;
        }

        // Dismissing the modal is best effort; a stuck modal only matters
        // to the next target, which re-navigates anyway.
        if let Err(e) = self.driver.click(&self.locators.modal_surface).await {
            debug!("Could not dismiss download modal: {}", e);
        }
        Ok(ranges.len())
    }

    /// Select one range option and trigger its download.
    async fn download_range(
        &self,
        option: &SelectOption,
        position: usize,
        total: usize,
    ) -> Result<(), OrchestratorError> {
        info!("Downloading range {}/{}: {}", position, total, option.label);

        self.driver.click(&self.locators.range_dropdown_button).await?;
        tokio::time::sleep(self.millis(self.config.dropdown_delay_ms)).await;
        self.driver
            .select_value(&self.locators.range_select, &option.value)
            .await?;
        tokio::time::sleep(self.millis(self.config.dropdown_delay_ms)).await;

        self.driver.click(&self.locators.range_download_button).await?;

        let matcher = ResponseMatcher::from_page(self.page_suffix.clone())
            .or_content_types(SPREADSHEET_CONTENT_TYPES);
        match self
            .driver
            .await_response(&matcher, self.millis(self.config.range_response_timeout_ms))
            .await
        {
            Ok(response) => {
                if let Some(filename) = response.attachment_filename() {
                    debug!("Range {} answered with attachment {}", option.label, filename);
                }
            }
            // No confirming response; the browser download usually starts
            // regardless, so the tracker gets to decide.
            Err(DriverError::ResponseTimeout) => {
                warn!("No spreadsheet response for range {}, assuming download started", option.label);
            }
            Err(e) => return Err(e.into()),
        }

        tokio::time::sleep(self.millis(self.config.range_settle_delay_ms)).await;
        Ok(())
    }
}

/// Parse the portal's result counter, stripping thousands separators.
/// Unparseable or empty text reads as zero.
fn parse_result_count(text: &str) -> u64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
