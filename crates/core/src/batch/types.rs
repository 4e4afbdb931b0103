//! Types for batch processing of organization targets.

use serde::{Deserialize, Serialize};

/// How one organization is identified on the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetId {
    /// By (partial) name, matched against the institution dropdown.
    Name(String),
    /// By zero-based position in the institution dropdown.
    Index(usize),
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetId::Name(name) => f.write_str(name),
            TargetId::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// One workflow instance: a single organization to query and download.
///
/// Constructed per batch entry, immutable, consumed once by the
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationTarget {
    /// Organization identity (name takes priority over index when a
    /// config supplies both).
    pub id: TargetId,
    /// Reporting year to query.
    pub year: u16,
    /// Jurisdiction/state code for the organization filter.
    pub state_code: u32,
}

impl OrganizationTarget {
    /// Target identified by name.
    pub fn by_name(name: impl Into<String>, year: u16, state_code: u32) -> Self {
        Self {
            id: TargetId::Name(name.into()),
            year,
            state_code,
        }
    }

    /// Target identified by dropdown position.
    pub fn by_index(index: usize, year: u16, state_code: u32) -> Self {
        Self {
            id: TargetId::Index(index),
            year,
            state_code,
        }
    }

    /// Human-readable label for logs and outcome reports.
    pub fn label(&self) -> String {
        self.id.to_string()
    }
}

/// Terminal status of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum BatchStatus {
    /// Query returned results and every range download was triggered.
    Success {
        /// Result count reported by the portal.
        total_results: u64,
        /// Number of range downloads triggered.
        ranges: usize,
    },
    /// Query validated to zero results; a normal outcome, not a failure.
    NoResults,
    /// The item failed; the batch moved on.
    Failed(String),
}

/// Per-target result, immutable once the item finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Target label (organization name or index).
    pub target: String,
    /// How the item ended.
    pub status: BatchStatus,
    /// Whether a redirect-recovery retry was spent on this item.
    pub retried: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_labels() {
        let named = OrganizationTarget::by_name("Secretaría de Salud", 2021, 1);
        assert_eq!(named.label(), "Secretaría de Salud");

        let indexed = OrganizationTarget::by_index(42, 2021, 1);
        assert_eq!(indexed.label(), "#42");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = BatchOutcome {
            target: "OrgX".to_string(),
            status: BatchStatus::Success {
                total_results: 1200,
                ranges: 2,
            },
            retried: false,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let parsed: BatchOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.target, "OrgX");
        assert!(matches!(
            parsed.status,
            BatchStatus::Success {
                total_results: 1200,
                ranges: 2
            }
        ));
    }
}
