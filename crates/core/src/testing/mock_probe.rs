//! Mock storage probe for tracker tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::tracker::StorageProbe;

/// Scriptable [`StorageProbe`]: paths either exist unconditionally or
/// start existing after a given number of probes.
#[derive(Default)]
pub struct MockStorageProbe {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

struct Entry {
    appears_after: usize,
    probes: usize,
}

impl MockStorageProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as existing from the first probe on.
    pub fn set_exists(&self, path: impl Into<PathBuf>) {
        self.set_exists_after_polls(path, 0);
    }

    /// Mark a path as absent for the first `polls` probes and present
    /// from then on.
    pub fn set_exists_after_polls(&self, path: impl Into<PathBuf>, polls: usize) {
        self.entries.lock().unwrap().insert(
            path.into(),
            Entry {
                appears_after: polls,
                probes: 0,
            },
        );
    }
}

impl StorageProbe for MockStorageProbe {
    fn exists(&self, path: &Path) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(path) else {
            return false;
        };
        entry.probes += 1;
        entry.probes > entry.appears_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appears_after_polls() {
        let probe = MockStorageProbe::new();
        probe.set_exists_after_polls("/d/f.xls", 2);

        let path = Path::new("/d/f.xls");
        assert!(!probe.exists(path));
        assert!(!probe.exists(path));
        assert!(probe.exists(path));
        assert!(probe.exists(path));
    }

    #[test]
    fn test_unknown_path_never_exists() {
        let probe = MockStorageProbe::new();
        assert!(!probe.exists(Path::new("/d/otro.xls")));
    }
}
