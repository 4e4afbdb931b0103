//! Download completion tracker.
//!
//! Browser-initiated downloads materialize out-of-band; this module
//! reconciles them with filesystem state by polling for each announced
//! file until it appears or a deadline elapses.

mod probe;
mod registry;

pub use probe::{FsProbe, StorageProbe};
pub use registry::{DownloadResult, DownloadStatus, DownloadTracker, TrackerConfig};
