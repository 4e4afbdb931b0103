//! Types for the query/download orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::{DriverError, SelectOption};
use crate::navigator::NavigationError;

/// Errors that can occur while querying and downloading for one
/// organization. All of them are per-item: the batch runner converts them
/// into outcomes and moves on.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The query form never became interactable. Distinct from a
    /// zero-result outcome: the page simply did not load.
    #[error("query form never became interactable")]
    FormUnavailable,

    /// The query action control could not be located.
    #[error("query submit control not found")]
    SubmitControlMissing,

    /// Results exist but the download action could not be located.
    #[error("download control not found despite {total_results} results")]
    DownloadControlMissing { total_results: u64 },

    /// The download tab inside the modal could not be activated; nothing
    /// further can be downloaded without it.
    #[error("download tab inside the modal could not be activated")]
    ModalActivationFailed,

    /// The site bounced the session back. Recoverable: the batch runner
    /// re-navigates and retries the item once.
    #[error("site redirected the session away from the workflow")]
    RedirectDetected,

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("navigation error: {0}")]
    Navigation(#[from] NavigationError),
}

/// Document category being harvested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Direct-award procedures.
    DirectAward,
    /// Public tender and three-person invitation procedures.
    PublicTender,
}

impl DocumentType {
    /// Numeric code used by the portal workflow.
    pub fn code(self) -> u8 {
        match self {
            DocumentType::DirectAward => 1,
            DocumentType::PublicTender => 2,
        }
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        DocumentType::DirectAward
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::DirectAward => f.write_str("direct award procedures"),
            DocumentType::PublicTender => {
                f.write_str("public tender and three-person invitation procedures")
            }
        }
    }
}

/// Transient state for one orchestrator run.
///
/// Created at entry, discarded at exit, never shared across
/// organizations.
#[derive(Debug, Clone)]
pub struct QuerySession {
    /// Document-type code for this run.
    pub doc_type: DocumentType,
    /// How many period controls were selected (0 when the aggregate
    /// control was used).
    pub periods_selected: usize,
    /// Last result count observed while polling.
    pub last_result_count: u64,
    /// Range options still pending download.
    pub pending_ranges: Vec<SelectOption>,
}

impl QuerySession {
    /// Fresh session for a document type.
    pub fn new(doc_type: DocumentType) -> Self {
        Self {
            doc_type,
            periods_selected: 0,
            last_result_count: 0,
            pending_ranges: Vec::new(),
        }
    }
}

/// How one orchestrator run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Polling exhausted with a zero count; a valid terminal outcome.
    NoResults,
    /// Results existed and every range download was triggered.
    Downloaded {
        /// Count reported by the portal.
        total_results: u64,
        /// Ranges for which a download was triggered.
        ranges: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_codes() {
        assert_eq!(DocumentType::DirectAward.code(), 1);
        assert_eq!(DocumentType::PublicTender.code(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::FormUnavailable;
        assert_eq!(err.to_string(), "query form never became interactable");

        let err = OrchestratorError::DownloadControlMissing { total_results: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_session_starts_empty() {
        let session = QuerySession::new(DocumentType::PublicTender);
        assert_eq!(session.periods_selected, 0);
        assert_eq!(session.last_result_count, 0);
        assert!(session.pending_ranges.is_empty());
    }
}
