//! Sequential batch processing with per-item fault isolation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{DriverConfig, PortalConfig};
use crate::driver::PageDriver;
use crate::navigator::{Navigator, Stage, StageActions};
use crate::orchestrator::{OrchestratorConfig, OrchestratorError, QueryOutcome, QueryRunner};
use crate::portal::{Locators, PortalActions};
use crate::tracker::{DownloadResult, DownloadTracker};

use super::types::{BatchOutcome, BatchStatus, OrganizationTarget};

/// Everything a finished batch produced.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Exactly one outcome per target, in target order.
    pub outcomes: Vec<BatchOutcome>,
    /// Resolved download results, joined at batch end.
    pub downloads: Vec<DownloadResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BatchStatus::Success { .. }))
            .count()
    }

    pub fn no_results(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BatchStatus::NoResults))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BatchStatus::Failed(_)))
            .count()
    }
}

/// Runs organization targets one after another over a single automation
/// session.
///
/// Per-item failures become outcomes and never abort the batch; a
/// driver-reported redirect grants the item exactly one re-navigation
/// and retry.
pub struct BatchRunner {
    driver: Arc<dyn PageDriver>,
    locators: Arc<Locators>,
    portal: PortalConfig,
    navigator: Navigator,
    query: QueryRunner,
    tracker: DownloadTracker,
}

impl BatchRunner {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        locators: Arc<Locators>,
        portal: PortalConfig,
        driver_config: &DriverConfig,
        orchestrator: OrchestratorConfig,
        tracker: DownloadTracker,
    ) -> Self {
        let navigator = Navigator::new(Arc::clone(&driver), portal.base_url.clone());
        let query = QueryRunner::new(
            Arc::clone(&driver),
            Arc::clone(&locators),
            orchestrator,
            driver_config.page_suffix.clone(),
        );
        Self {
            driver,
            locators,
            portal,
            navigator,
            query,
            tracker,
        }
    }

    /// Process every target in order and join the download tracker.
    pub async fn run(mut self, targets: &[OrganizationTarget]) -> BatchReport {
        let started_at = Utc::now();
        info!("Starting batch of {} targets", targets.len());

        let mut outcomes = Vec::with_capacity(targets.len());
        for (position, target) in targets.iter().enumerate() {
            info!(
                "Processing target {}/{}: {}",
                position + 1,
                targets.len(),
                target.label()
            );

            let actions = PortalActions::new(
                Arc::clone(&self.driver),
                Arc::clone(&self.locators),
                self.portal.clone(),
                target.clone(),
            );
            let outcome = self.process_target(target, &actions).await;
            match &outcome.status {
                BatchStatus::Failed(reason) => {
                    error!("Target {} failed: {}", target.label(), reason)
                }
                status => info!("Target {} finished: {:?}", target.label(), status),
            }
            outcomes.push(outcome);

            if position + 1 < targets.len() {
                if let Err(e) = actions.prepare_next().await {
                    warn!("Prepare-next hint failed: {}", e);
                }
            }
        }

        let downloads = self.tracker.join_all().await;
        BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
            downloads,
        }
    }

    /// One target, including at most one redirect-recovery retry.
    async fn process_target(
        &mut self,
        target: &OrganizationTarget,
        actions: &PortalActions,
    ) -> BatchOutcome {
        let mut retried = false;
        let status = loop {
            let attempt = self.attempt(actions).await;

            // Track whatever the browser announced during the attempt;
            // files triggered before a failure still land on disk.
            for filename in self.driver.drain_downloads() {
                self.tracker.track(filename);
            }

            match attempt {
                Ok(QueryOutcome::Downloaded {
                    total_results,
                    ranges,
                }) => {
                    break BatchStatus::Success {
                        total_results,
                        ranges,
                    }
                }
                Ok(QueryOutcome::NoResults) => break BatchStatus::NoResults,
                Err(OrchestratorError::RedirectDetected) if !retried => {
                    retried = true;
                    warn!(
                        "Session redirected while processing {}, re-navigating and retrying once",
                        target.label()
                    );
                    if let Err(e) = self.navigator.take_to(Stage::Start, actions).await {
                        break BatchStatus::Failed(format!(
                            "re-navigation after redirect failed: {e}"
                        ));
                    }
                }
                Err(e) => break BatchStatus::Failed(e.to_string()),
            }
        };

        BatchOutcome {
            target: target.label(),
            status,
            retried,
        }
    }

    async fn attempt(&mut self, actions: &PortalActions) -> Result<QueryOutcome, OrchestratorError> {
        self.navigator
            .take_to(Stage::InformationCard, actions)
            .await?;
        self.query.run(self.portal.doc_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::driver::SelectOption;
    use crate::testing::{MockPageDriver, MockStorageProbe};
    use crate::tracker::{DownloadStatus, TrackerConfig};

    fn fast_orchestrator() -> OrchestratorConfig {
        OrchestratorConfig {
            form_timeout_ms: 50,
            settle_delay_ms: 1,
            period_select_attempts: 1,
            period_retry_delay_ms: 1,
            result_poll_attempts: 2,
            result_poll_interval_ms: 1,
            result_indicator_timeout_ms: 50,
            control_timeout_ms: 50,
            modal_tab_timeout_ms: 50,
            modal_animation_delay_ms: 1,
            range_populate_delay_ms: 1,
            dropdown_delay_ms: 1,
            range_response_timeout_ms: 50,
            range_settle_delay_ms: 1,
        }
    }

    /// A driver scripted for the happy query path: aggregate period
    /// control checks on click, one real range, a constant result count.
    fn scripted_driver(count: &str) -> Arc<MockPageDriver> {
        let driver = Arc::new(MockPageDriver::new());
        let locators = Locators::default();
        driver.set_url("https://portal.example/consultaPublica.xhtml#inicio");
        driver.link_click_to_checkbox(
            locators.all_periods_label.clone(),
            locators.all_periods_checkbox.clone(),
        );
        driver.set_options(
            locators.range_select.clone(),
            vec![SelectOption {
                label: "1 - 1000".to_string(),
                value: "0".to_string(),
            }],
        );
        driver.set_text_sequence(locators.result_count.clone(), [count]);
        driver
    }

    fn runner_on(driver: Arc<MockPageDriver>) -> BatchRunner {
        runner_with_probe(driver, Arc::new(MockStorageProbe::new()))
    }

    fn runner_with_probe(driver: Arc<MockPageDriver>, probe: Arc<MockStorageProbe>) -> BatchRunner {
        let tracker = DownloadTracker::new(
            probe,
            "/downloads",
            TrackerConfig {
                timeout_secs: 1,
                poll_interval_ms: 10,
            },
        );
        BatchRunner::new(
            driver as Arc<dyn PageDriver>,
            Arc::new(Locators::default()),
            PortalConfig {
                base_url: "https://portal.example/consultaPublica.xhtml".to_string(),
                ..PortalConfig::default()
            },
            &DriverConfig::default(),
            fast_orchestrator(),
            tracker,
        )
    }

    fn named(name: &str) -> OrganizationTarget {
        OrganizationTarget::by_name(name, 2021, 1)
    }

    #[tokio::test]
    async fn test_failing_target_does_not_abort_the_batch() {
        let driver = scripted_driver("7");
        let locators = Locators::default();
        // A and C exist in the institution dropdown; B does not.
        driver.set_exists(locators.dropdown_entry("OrgA"), true);
        driver.set_exists(locators.dropdown_entry("OrgC"), true);

        let targets = [named("OrgA"), named("OrgB"), named("OrgC")];
        let report = runner_on(driver).run(&targets).await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(matches!(
            report.outcomes[0].status,
            BatchStatus::Success { total_results: 7, ranges: 1 }
        ));
        assert!(matches!(report.outcomes[1].status, BatchStatus::Failed(_)));
        assert!(matches!(
            report.outcomes[2].status,
            BatchStatus::Success { .. }
        ));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_redirect_grants_exactly_one_retry() {
        let driver = scripted_driver("3");
        let locators = Locators::default();
        driver.set_exists(locators.dropdown_entry("OrgA"), true);
        driver.raise_redirect_flag();

        let targets = [named("OrgA")];
        let report = runner_on(driver.clone()).run(&targets).await;

        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].retried);
        assert!(matches!(
            report.outcomes[0].status,
            BatchStatus::Success { total_results: 3, ranges: 1 }
        ));
        // Exactly one rewind to the start marker between the attempts.
        let rewinds = driver
            .navigations()
            .iter()
            .filter(|url| url.ends_with("#inicio"))
            .count();
        assert_eq!(rewinds, 1);
    }

    #[tokio::test]
    async fn test_downloads_announced_before_a_failure_are_still_tracked() {
        let driver = scripted_driver("12");
        let locators = Locators::default();
        driver.set_exists(locators.dropdown_entry("OrgA"), true);
        // One file was already announced when the modal tab refuses to
        // activate and the item fails.
        driver.push_download("parcial.xls");
        driver.fail_wait(locators.modal_download_tab.clone());
        let probe = Arc::new(MockStorageProbe::new());
        probe.set_exists("/downloads/parcial.xls");

        let report = runner_with_probe(driver, probe)
            .run(&[named("OrgA")])
            .await;

        assert!(matches!(report.outcomes[0].status, BatchStatus::Failed(_)));
        assert_eq!(report.downloads.len(), 1);
        assert_eq!(report.downloads[0].filename, "parcial.xls");
        assert_eq!(report.downloads[0].status, DownloadStatus::Completed);
    }

    #[tokio::test]
    async fn test_no_results_is_not_a_failure() {
        let driver = scripted_driver("0");
        let locators = Locators::default();
        driver.set_exists(locators.dropdown_entry("OrgA"), true);

        let report = runner_on(driver).run(&[named("OrgA")]).await;

        assert_eq!(report.outcomes.len(), 1);
        assert!(matches!(report.outcomes[0].status, BatchStatus::NoResults));
        assert_eq!(report.no_results(), 1);
        assert_eq!(report.failed(), 0);
    }
}
