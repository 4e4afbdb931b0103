use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvester_core::{
    build_targets, load_config, validate_config, BatchRunner, BatchStatus, CdpDriver,
    DownloadStatus, DownloadTracker, FsProbe, PageDriver, TargetSpec,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("harvester {}", VERSION);

    // Determine config path
    let config_path = harvester_core::config_path();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Portal: {}", config.portal.base_url);
    info!(
        "Harvesting {} for year {}",
        config.portal.doc_type, config.portal.year
    );

    // Ensure the download destination exists before routing the browser
    // into it.
    let downloads_dir = &config.batch.downloads_dir;
    std::fs::create_dir_all(downloads_dir)
        .with_context(|| format!("Failed to create downloads dir {:?}", downloads_dir))?;
    let downloads_dir = downloads_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve downloads dir {:?}", downloads_dir))?;

    // Attach to the browser. The only process-fatal failure: without a
    // session there is nothing to drive.
    info!("Connecting to browser at {}", config.driver.debug_url);
    let driver = CdpDriver::connect(&config.driver)
        .await
        .context("Failed to attach to the browser debugging endpoint")?;
    let driver: Arc<dyn PageDriver> = Arc::new(driver);

    driver
        .set_download_dir(&downloads_dir)
        .await
        .context("Failed to route browser downloads")?;
    info!("Browser downloads routed to {:?}", downloads_dir);

    // Build the target list
    let list_content = match &config.batch.organization_list {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read organization list {:?}", path))?,
        ),
        None => None,
    };
    let spec = TargetSpec {
        organization: config.batch.organization.clone(),
        list_content,
        from: config.batch.from,
        to: config.batch.to,
    };
    let targets = build_targets(&spec, config.portal.year, config.portal.state_code);
    info!("Batch holds {} targets", targets.len());

    // Run the batch
    let tracker = DownloadTracker::new(Arc::new(FsProbe), &downloads_dir, config.tracker.clone());
    let runner = BatchRunner::new(
        Arc::clone(&driver),
        Arc::new(config.locators.clone()),
        config.portal.clone(),
        &config.driver,
        config.orchestrator.clone(),
        tracker,
    );
    let report = runner.run(&targets).await;

    // Report outcomes
    for outcome in &report.outcomes {
        match &outcome.status {
            BatchStatus::Success {
                total_results,
                ranges,
            } => info!(
                "{}: {} results, {} range downloads{}",
                outcome.target,
                total_results,
                ranges,
                if outcome.retried { " (after retry)" } else { "" }
            ),
            BatchStatus::NoResults => info!("{}: no results", outcome.target),
            BatchStatus::Failed(reason) => warn!("{}: failed: {}", outcome.target, reason),
        }
    }
    for download in &report.downloads {
        match download.status {
            DownloadStatus::Completed => info!("Downloaded {:?}", download.path),
            DownloadStatus::TimedOut => warn!("Download never appeared: {:?}", download.path),
        }
    }
    info!(
        "Batch finished in {}s: {} succeeded, {} without results, {} failed",
        (report.finished_at - report.started_at).num_seconds(),
        report.succeeded(),
        report.no_results(),
        report.failed()
    );

    if let Ok(json) = serde_json::to_string_pretty(&report) {
        let report_path = downloads_dir.join("batch_report.json");
        if let Err(e) = std::fs::write(&report_path, json) {
            warn!("Could not write batch report to {:?}: {}", report_path, e);
        } else {
            info!("Batch report written to {:?}", report_path);
        }
    }

    Ok(())
}
