//! Durable storage probe.

use std::path::Path;

/// Checks whether a file has materialized on durable storage.
///
/// The completion tracker is the only consumer; the indirection exists so
/// tests can script filesystem arrival.
pub trait StorageProbe: Send + Sync {
    /// Whether a file exists at `path` right now.
    fn exists(&self, path: &Path) -> bool;
}

/// Probe over the real filesystem.
#[derive(Debug, Default, Clone)]
pub struct FsProbe;

impl StorageProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        std::fs::metadata(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_probe_sees_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descarga.xls");

        let probe = FsProbe;
        assert!(!probe.exists(&path));

        std::fs::write(&path, b"data").unwrap();
        assert!(probe.exists(&path));
    }
}
