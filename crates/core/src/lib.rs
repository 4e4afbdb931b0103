pub mod batch;
pub mod config;
pub mod driver;
pub mod navigator;
pub mod orchestrator;
pub mod portal;
pub mod testing;
pub mod tracker;

pub use batch::{
    build_targets, BatchOutcome, BatchReport, BatchRunner, BatchStatus, OrganizationTarget,
    TargetSpec,
};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, Config, ConfigError,
};
pub use driver::{CdpDriver, DriverError, Locator, PageDriver};
pub use navigator::{NavigationError, Navigator, Stage, StageActions};
pub use orchestrator::{DocumentType, OrchestratorError, QueryOutcome, QueryRunner};
pub use portal::{Locators, PortalActions};
pub use tracker::{DownloadResult, DownloadStatus, DownloadTracker, FsProbe, TrackerConfig};
