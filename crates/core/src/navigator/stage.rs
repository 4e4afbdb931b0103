//! Workflow stages and their fixed ordering.

use serde::{Deserialize, Serialize};

/// A position in the portal's linear workflow.
///
/// The order is fixed; moving forward always visits intermediate stages
/// in sequence, never jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Landing page.
    Start,
    /// Obligated-subjects listing, filtered by state.
    Organizations,
    /// Obligation folders of a selected organization.
    Obligations,
    /// Categorized document folders (contracts etc.) for a year.
    InformationCard,
}

/// All stages in workflow order.
pub const SEQUENCE: [Stage; 4] = [
    Stage::Start,
    Stage::Organizations,
    Stage::Obligations,
    Stage::InformationCard,
];

impl Stage {
    /// Position of this stage in the workflow order.
    pub fn index(self) -> usize {
        match self {
            Stage::Start => 0,
            Stage::Organizations => 1,
            Stage::Obligations => 2,
            Stage::InformationCard => 3,
        }
    }

    /// URL fragment the portal uses as position marker for this stage.
    pub fn fragment(self) -> &'static str {
        match self {
            Stage::Start => "inicio",
            Stage::Organizations => "sujetosObligados",
            Stage::Obligations => "obligaciones",
            Stage::InformationCard => "tarjetaInformativa",
        }
    }

    /// Decode a stage from a URL fragment. Unknown markers map to `None`.
    pub fn from_fragment(fragment: &str) -> Option<Stage> {
        SEQUENCE.into_iter().find(|s| s.fragment() == fragment)
    }

    /// Decode the current stage from a full URL. A missing or unknown
    /// fragment counts as the landing page.
    pub fn from_url(url: &str) -> Stage {
        url.split_once('#')
            .and_then(|(_, fragment)| Stage::from_fragment(fragment))
            .unwrap_or(Stage::Start)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.fragment())
    }
}
