//! Minimal-transition navigation between workflow stages.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::driver::{DriverError, PageDriver};

use super::stage::{Stage, SEQUENCE};

/// Errors raised while moving the workflow between stages.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Entering stage {stage} failed: {reason}")]
    EntryFailed { stage: Stage, reason: String },
}

impl NavigationError {
    /// Attach the stage that was being entered to a bare reason.
    pub fn entry(stage: Stage, reason: impl Into<String>) -> Self {
        NavigationError::EntryFailed {
            stage,
            reason: reason.into(),
        }
    }
}

/// Side effects required to enter each stage going forward.
///
/// Supplied by the caller; the sequencer itself only decides which stages
/// to enter and in what order.
#[async_trait]
pub trait StageActions: Send + Sync {
    /// Perform the entry action for `stage`.
    async fn enter(&self, stage: Stage) -> Result<(), NavigationError>;

    /// Hint that another target will be processed after the current one.
    ///
    /// No-op by default; exists for portals that need eager pre-selection.
    async fn prepare_next(&self) -> Result<(), NavigationError> {
        Ok(())
    }
}

/// Tracks the workflow position and computes minimal transitions.
pub struct Navigator {
    driver: Arc<dyn PageDriver>,
    base_url: String,
}

impl Navigator {
    /// Create a navigator over a driver session.
    ///
    /// `base_url` is only used as fallback when the session is not yet on
    /// the portal and the current URL carries no usable base.
    pub fn new(driver: Arc<dyn PageDriver>, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
        }
    }

    /// Stage currently reported by the session's position marker.
    pub async fn current_stage(&self) -> Result<Stage, NavigationError> {
        let url = self.driver.current_url().await?;
        Ok(Stage::from_url(&url))
    }

    /// Move the workflow to `target`.
    ///
    /// Backward or same-stage moves rewrite position markers only, one
    /// stage at a time in reverse order, and always succeed. Forward moves
    /// invoke the entry action of every stage between the current one
    /// (exclusive) and the target (inclusive), in increasing order, and
    /// abort at the first failing action without rolling back.
    pub async fn take_to(
        &self,
        target: Stage,
        actions: &dyn StageActions,
    ) -> Result<(), NavigationError> {
        let url = self.driver.current_url().await?;
        let current = Stage::from_url(&url);

        if target.index() <= current.index() {
            return self.rewind(&url, current, target).await;
        }

        for stage in &SEQUENCE[current.index() + 1..=target.index()] {
            info!("Entering stage #{}", stage);
            actions.enter(*stage).await?;
        }
        Ok(())
    }

    /// Rewrite the position marker stage-by-stage down to `target`.
    ///
    /// Pure position change; no stage entry side effects. `current ==
    /// target` is a no-op.
    async fn rewind(&self, url: &str, current: Stage, target: Stage) -> Result<(), NavigationError> {
        if current == target {
            debug!("Already at stage #{}", target);
            return Ok(());
        }

        let base = match url.split_once('#') {
            Some((base, _)) if !base.is_empty() => base,
            _ => self.base_url.as_str(),
        };
        for stage in SEQUENCE[target.index()..current.index()].iter().rev() {
            debug!("Rewinding to #{}", stage);
            self.driver
                .navigate(&format!("{base}#{}", stage.fragment()))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPageDriver;
    use std::sync::Mutex;

    /// Records entered stages; fails on a configured stage.
    struct RecordingActions {
        entered: Mutex<Vec<Stage>>,
        fail_at: Option<Stage>,
    }

    impl RecordingActions {
        fn new(fail_at: Option<Stage>) -> Self {
            Self {
                entered: Mutex::new(Vec::new()),
                fail_at,
            }
        }

        fn entered(&self) -> Vec<Stage> {
            self.entered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StageActions for RecordingActions {
        async fn enter(&self, stage: Stage) -> Result<(), NavigationError> {
            self.entered.lock().unwrap().push(stage);
            if self.fail_at == Some(stage) {
                return Err(NavigationError::entry(stage, "boom"));
            }
            Ok(())
        }
    }

    fn navigator_at(fragment: &str) -> (Navigator, Arc<MockPageDriver>) {
        let driver = Arc::new(MockPageDriver::new());
        driver.set_url(format!("https://portal.example/consultaPublica.xhtml#{fragment}"));
        let navigator = Navigator::new(
            driver.clone() as Arc<dyn PageDriver>,
            "https://portal.example/consultaPublica.xhtml",
        );
        (navigator, driver)
    }

    #[tokio::test]
    async fn test_forward_enters_stages_in_order() {
        let (navigator, _driver) = navigator_at("inicio");
        let actions = RecordingActions::new(None);

        navigator
            .take_to(Stage::InformationCard, &actions)
            .await
            .unwrap();

        assert_eq!(
            actions.entered(),
            vec![Stage::Organizations, Stage::Obligations, Stage::InformationCard]
        );
    }

    #[tokio::test]
    async fn test_forward_aborts_at_first_failure() {
        let (navigator, _driver) = navigator_at("inicio");
        let actions = RecordingActions::new(Some(Stage::Obligations));

        let err = navigator
            .take_to(Stage::InformationCard, &actions)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NavigationError::EntryFailed {
                stage: Stage::Obligations,
                ..
            }
        ));
        // The failing stage was attempted, the one after it never was.
        assert_eq!(
            actions.entered(),
            vec![Stage::Organizations, Stage::Obligations]
        );
    }

    #[tokio::test]
    async fn test_backward_is_pure_and_always_succeeds() {
        let (navigator, driver) = navigator_at("tarjetaInformativa");
        let actions = RecordingActions::new(None);

        navigator
            .take_to(Stage::Organizations, &actions)
            .await
            .unwrap();

        assert!(actions.entered().is_empty());
        assert_eq!(
            driver.navigations(),
            vec![
                "https://portal.example/consultaPublica.xhtml#obligaciones",
                "https://portal.example/consultaPublica.xhtml#sujetosObligados",
            ]
        );
    }

    #[tokio::test]
    async fn test_same_stage_is_a_no_op() {
        let (navigator, driver) = navigator_at("obligaciones");
        let actions = RecordingActions::new(None);

        navigator.take_to(Stage::Obligations, &actions).await.unwrap();

        assert!(actions.entered().is_empty());
        assert!(driver.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_fragment_counts_as_start() {
        let (navigator, _driver) = navigator_at("somewhere-else");
        let actions = RecordingActions::new(None);

        navigator.take_to(Stage::Organizations, &actions).await.unwrap();

        assert_eq!(actions.entered(), vec![Stage::Organizations]);
    }
}
