//! End-to-end batch workflow tests over the mock driver.
//!
//! Drives configuration → target construction → batch run → download
//! reconciliation without a browser.

use std::sync::Arc;

use harvester_core::driver::SelectOption;
use harvester_core::navigator::Stage;
use harvester_core::orchestrator::OrchestratorConfig;
use harvester_core::testing::{MockPageDriver, MockStorageProbe};
use harvester_core::tracker::TrackerConfig;
use harvester_core::{
    build_targets, load_config_from_str, BatchRunner, BatchStatus, DownloadStatus,
    DownloadTracker, Locators, PageDriver, TargetSpec,
};

const BASE_URL: &str = "https://portal.example/consultaPublica.xhtml";

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

/// Driver scripted for the whole happy path: session starts off-portal,
/// the aggregate period control checks on click, two real ranges plus
/// the sentinel, and a fixed result count.
fn scripted_driver(result_count: &str) -> Arc<MockPageDriver> {
    let driver = Arc::new(MockPageDriver::new());
    let locators = Locators::default();
    driver.set_url("about:blank");
    driver.link_click_to_checkbox(
        locators.all_periods_label.clone(),
        locators.all_periods_checkbox.clone(),
    );
    driver.set_options(
        locators.range_select.clone(),
        vec![
            SelectOption {
                label: "Selecciona".to_string(),
                value: "-1".to_string(),
            },
            SelectOption {
                label: "1 - 40000".to_string(),
                value: "0".to_string(),
            },
            SelectOption {
                label: "40001 - 80000".to_string(),
                value: "1".to_string(),
            },
        ],
    );
    driver.set_text_sequence(locators.result_count.clone(), [result_count]);
    driver
}

fn runner_for(
    driver: Arc<MockPageDriver>,
    probe: Arc<MockStorageProbe>,
    config: &harvester_core::Config,
) -> BatchRunner {
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
        Arc::new(config.locators.clone()),
        config.portal.clone(),
        &config.driver,
        fast_orchestrator(),
        tracker,
    )
}

#[tokio::test]
async fn test_config_to_report_with_observed_downloads() {
    let config = load_config_from_str(&format!(
        r#"
[portal]
base_url = "{BASE_URL}"
year = 2021
"#
    ))
    .unwrap();

    let driver = scripted_driver("61234");
    let locators = Locators::default();
    driver.set_exists(locators.dropdown_entry("Secretaría de Salud"), true);
    // The browser announces one file; it appears on disk while polling.
    driver.push_download("reporte_1.xls");
    let probe = Arc::new(MockStorageProbe::new());
    probe.set_exists_after_polls("/downloads/reporte_1.xls", 2);

    let spec = TargetSpec {
        organization: Some("Secretaría de Salud".to_string()),
        ..TargetSpec::default()
    };
    let targets = build_targets(&spec, config.portal.year, config.portal.state_code);
    assert_eq!(targets.len(), 1);

    let report = runner_for(driver.clone(), probe, &config).run(&targets).await;

    assert_eq!(report.outcomes.len(), 1);
    assert!(matches!(
        report.outcomes[0].status,
        BatchStatus::Success {
            total_results: 61234,
            ranges: 2,
        }
    ));
    assert_eq!(report.downloads.len(), 1);
    assert_eq!(report.downloads[0].status, DownloadStatus::Completed);
    assert_eq!(report.downloads[0].filename, "reporte_1.xls");

    // The off-portal session was brought onto the organizations stage.
    assert!(driver
        .navigations()
        .iter()
        .any(|url| url.ends_with(&format!("#{}", Stage::Organizations.fragment()))));
}

#[tokio::test]
async fn test_mixed_batch_isolates_failures_and_keeps_order() {
    let driver = scripted_driver("9");
    let locators = Locators::default();
    driver.set_exists(locators.dropdown_entry("OrgA"), true);
    driver.set_exists(locators.dropdown_entry("OrgC"), true);
    let probe = Arc::new(MockStorageProbe::new());

    let config = load_config_from_str(&format!(
        r#"
[portal]
base_url = "{BASE_URL}"
"#
    ))
    .unwrap();

    let spec = TargetSpec {
        list_content: Some(r#"["OrgA","OrgB","OrgC"]"#.to_string()),
        ..TargetSpec::default()
    };
    let targets = build_targets(&spec, 2021, 1);

    let report = runner_for(driver, probe, &config).run(&targets).await;

    let labels: Vec<_> = report.outcomes.iter().map(|o| o.target.as_str()).collect();
    assert_eq!(labels, vec!["OrgA", "OrgB", "OrgC"]);
    assert!(matches!(
        report.outcomes[0].status,
        BatchStatus::Success { .. }
    ));
    assert!(matches!(report.outcomes[1].status, BatchStatus::Failed(_)));
    assert!(matches!(
        report.outcomes[2].status,
        BatchStatus::Success { .. }
    ));
    assert!(!report.outcomes.iter().any(|o| o.retried));
}

#[tokio::test]
async fn test_index_range_batch_clicks_positional_entries() {
    let driver = scripted_driver("0");
    let probe = Arc::new(MockStorageProbe::new());
    let config = load_config_from_str(&format!(
        r#"
[portal]
base_url = "{BASE_URL}"

[batch]
from = 0
to = 2
"#
    ))
    .unwrap();

    let spec = TargetSpec {
        from: config.batch.from,
        to: config.batch.to,
        ..TargetSpec::default()
    };
    let targets = build_targets(&spec, config.portal.year, config.portal.state_code);
    assert_eq!(targets.len(), 3);

    let report = runner_for(driver.clone(), probe, &config).run(&targets).await;

    assert_eq!(report.outcomes.len(), 3);
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o.status, BatchStatus::NoResults)));

    // Positional dropdown entries are 1-based.
    let locators = Locators::default();
    let clicks = driver.clicks();
    for entry in 1..=3 {
        assert!(clicks.contains(&locators.dropdown_entry_at(entry)));
    }
}

#[tokio::test]
async fn test_download_timeout_does_not_alter_item_outcome() {
    let driver = scripted_driver("500");
    let locators = Locators::default();
    driver.set_exists(locators.dropdown_entry("OrgA"), true);
    driver.push_download("nunca_llega.xls");
    // Probe never sees the file.
    let probe = Arc::new(MockStorageProbe::new());

    let config = load_config_from_str(&format!(
        r#"
[portal]
base_url = "{BASE_URL}"
"#
    ))
    .unwrap();
    let spec = TargetSpec {
        organization: Some("OrgA".to_string()),
        ..TargetSpec::default()
    };
    let targets = build_targets(&spec, 2021, 1);

    let report = runner_for(driver, probe, &config).run(&targets).await;

    assert!(matches!(
        report.outcomes[0].status,
        BatchStatus::Success { .. }
    ));
    assert_eq!(report.downloads.len(), 1);
    assert_eq!(report.downloads[0].status, DownloadStatus::TimedOut);
}
