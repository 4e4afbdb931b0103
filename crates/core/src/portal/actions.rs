//! Stage-entry actions for the consultation portal.
//!
//! Everything here is best described as choreography: wait out the
//! screen blocker, open a dropdown, pick an entry, wait for the next
//! surface to render. Locators come from configuration; timings are the
//! portal's observed latencies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::batch::{OrganizationTarget, TargetId};
use crate::config::PortalConfig;
use crate::driver::{PageDriver, WaitOptions};
use crate::navigator::{NavigationError, Stage, StageActions};

use super::locators::Locators;

const SETTLE: Duration = Duration::from_millis(1500);
const BLOCKER_TIMEOUT: Duration = Duration::from_secs(5);
const BLOCKER_LONG_TIMEOUT: Duration = Duration::from_secs(30);
const STATE_FILTER_TIMEOUT: Duration = Duration::from_secs(60);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);
const YEAR_TIMEOUT: Duration = Duration::from_secs(5);
const FOLDERS_TIMEOUT: Duration = Duration::from_secs(60);
const FORM_TIMEOUT: Duration = Duration::from_secs(30);
const FOLDER_TIMEOUT: Duration = Duration::from_secs(10);

/// [`StageActions`] implementation for one organization target.
pub struct PortalActions {
    driver: Arc<dyn PageDriver>,
    locators: Arc<Locators>,
    portal: PortalConfig,
    target: OrganizationTarget,
}

impl PortalActions {
    /// Bind the portal choreography to one target.
    pub fn new(
        driver: Arc<dyn PageDriver>,
        locators: Arc<Locators>,
        portal: PortalConfig,
        target: OrganizationTarget,
    ) -> Self {
        Self {
            driver,
            locators,
            portal,
            target,
        }
    }

    /// Wait until the input-blocking overlay goes away. Best effort: the
    /// overlay is absent on most transitions and a leftover one only
    /// slows the next interaction down.
    async fn wait_out_blocker(&self, timeout: Duration) {
        if let Err(e) = self
            .driver
            .wait_for(&self.locators.screen_blocker, WaitOptions::hidden(timeout))
            .await
        {
            debug!("Screen blocker still present after {:?}: {}", timeout, e);
        }
    }

    /// Enter the organizations stage: load the consultation page when the
    /// session is elsewhere, then apply the state filter.
    async fn enter_organizations(&self) -> Result<(), NavigationError> {
        let url = self.driver.current_url().await?;
        let fragment_url = format!("{}#{}", self.portal.base_url, Stage::Organizations.fragment());

        if !url.contains("consultaPublica.xhtml") {
            info!("Session is off-portal, loading consultation page");
            self.driver.navigate(&fragment_url).await?;
        } else if !url.contains(&format!("#{}", Stage::Organizations.fragment())) {
            self.driver.navigate(&fragment_url).await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        self.wait_out_blocker(BLOCKER_LONG_TIMEOUT).await;

        debug!("Opening state filter");
        self.driver
            .wait_for(
                &self.locators.state_filter_button,
                WaitOptions::visible(STATE_FILTER_TIMEOUT),
            )
            .await?;
        self.driver.click(&self.locators.state_filter_button).await?;

        self.driver
            .wait_for(
                &self.locators.state_filter_list,
                WaitOptions::visible(LIST_TIMEOUT),
            )
            .await?;

        info!("Selecting state code {}", self.target.state_code);
        let option = self.locators.state_filter_option(self.target.state_code);
        self.driver.click(&option).await?;

        tokio::time::sleep(Duration::from_secs(1)).await;
        self.wait_out_blocker(LIST_TIMEOUT).await;
        Ok(())
    }

    /// Enter the obligations stage: pick the organization and the
    /// reporting year, then wait for the obligation folders.
    async fn enter_obligations(&self) -> Result<(), NavigationError> {
        info!(
            "Selecting organization {} (year {})",
            self.target.label(),
            self.target.year
        );

        self.driver
            .wait_for(
                &self.locators.institution_button,
                WaitOptions::present(LIST_TIMEOUT),
            )
            .await?;
        self.driver.click(&self.locators.institution_button).await?;

        let entry = match &self.target.id {
            TargetId::Name(name) => {
                let entry = self.locators.dropdown_entry(name);
                if !self.driver.exists(&entry).await? {
                    return Err(NavigationError::entry(
                        Stage::Obligations,
                        format!("organization '{name}' not found in dropdown"),
                    ));
                }
                entry
            }
            // Dropdown entries are 1-based.
            TargetId::Index(index) => self.locators.dropdown_entry_at(index + 1),
        };
        self.driver.click(&entry).await?;
        tokio::time::sleep(SETTLE).await;

        // Year selection is best effort: some organizations pin it.
        match self
            .driver
            .wait_for(&self.locators.year_select, WaitOptions::present(YEAR_TIMEOUT))
            .await
        {
            Ok(()) => {
                self.driver
                    .select_value(&self.locators.year_select, &self.target.year.to_string())
                    .await?;
            }
            Err(e) => warn!("Could not select year {}: {}", self.target.year, e),
        }

        self.wait_out_blocker(BLOCKER_TIMEOUT).await;

        debug!("Waiting for obligation folders");
        self.driver
            .wait_for(
                &self.locators.obligation_folders,
                WaitOptions::present(FOLDERS_TIMEOUT),
            )
            .await?;
        Ok(())
    }

    /// Enter the information card: open the configured document folder
    /// and re-check the inner year selector.
    async fn enter_information_card(&self) -> Result<(), NavigationError> {
        if let Err(e) = self
            .driver
            .wait_for(&self.locators.obligations_form, WaitOptions::present(FORM_TIMEOUT))
            .await
        {
            debug!("Obligations form did not render in time: {}", e);
        }
        self.wait_out_blocker(BLOCKER_TIMEOUT).await;

        if self.driver.exists(&self.locators.no_obligations_popup).await? {
            info!("Dismissing 'no obligations' popup");
            self.driver.click(&self.locators.no_obligations_popup).await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let folder = self
            .locators
            .document_folder(&self.portal.document_folder_label);
        self.driver
            .wait_for(&folder, WaitOptions::present(FOLDER_TIMEOUT))
            .await
            .map_err(|_| {
                NavigationError::entry(
                    Stage::InformationCard,
                    format!(
                        "document folder '{}' not found",
                        self.portal.document_folder_label
                    ),
                )
            })?;
        self.driver.click(&folder).await?;
        info!("Opened document folder '{}'", self.portal.document_folder_label);

        self.recheck_inner_year(&folder).await;
        Ok(())
    }

    /// The information card carries its own year selector which sometimes
    /// disagrees with the one chosen earlier. Best effort: re-select and
    /// re-open the folder when it does.
    async fn recheck_inner_year(&self, folder: &crate::driver::Locator) {
        let wanted = self.target.year.to_string();
        let inner = &self.locators.inner_year_select;

        if self
            .driver
            .wait_for(inner, WaitOptions::present(YEAR_TIMEOUT))
            .await
            .is_err()
        {
            return;
        }
        let current = match self.driver.read_value(inner).await {
            Ok(value) => value,
            Err(_) => return,
        };
        if current == wanted {
            return;
        }

        info!("Adjusting inner year selector to {}", wanted);
        if let Err(e) = self
            .driver
            .select_value(&self.locators.year_select, &wanted)
            .await
        {
            warn!("Could not adjust inner year: {}", e);
            return;
        }
        self.wait_out_blocker(BLOCKER_TIMEOUT).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        if matches!(self.driver.exists(folder).await, Ok(true)) {
            let _ = self.driver.click(folder).await;
        }
    }
}

#[async_trait]
impl StageActions for PortalActions {
    async fn enter(&self, stage: Stage) -> Result<(), NavigationError> {
        match stage {
            Stage::Start => Ok(()),
            Stage::Organizations => self.enter_organizations().await,
            Stage::Obligations => self.enter_obligations().await,
            Stage::InformationCard => self.enter_information_card().await,
        }
    }

    // The portal needs no eager pre-selection between organizations;
    // the hint stays a no-op (placeholder kept for portals that do).
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPageDriver;

    fn actions_for(target: OrganizationTarget) -> (PortalActions, Arc<MockPageDriver>) {
        let driver = Arc::new(MockPageDriver::new());
        driver.set_url("https://portal.example/consultaPublica.xhtml#sujetosObligados");
        let actions = PortalActions::new(
            driver.clone() as Arc<dyn PageDriver>,
            Arc::new(Locators::default()),
            PortalConfig::default(),
            target,
        );
        (actions, driver)
    }

    #[tokio::test]
    async fn test_missing_organization_is_an_entry_failure() {
        let target = OrganizationTarget::by_name("No Existe", 2021, 1);
        let (actions, _driver) = actions_for(target);

        // The dropdown opens but the entry never exists (mock default).
        let err = actions.enter(Stage::Obligations).await.unwrap_err();
        assert!(matches!(
            err,
            NavigationError::EntryFailed {
                stage: Stage::Obligations,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_index_target_clicks_positional_entry() {
        let locators = Locators::default();
        let target = OrganizationTarget::by_index(4, 2021, 1);
        let (actions, driver) = actions_for(target);
        driver.set_exists(locators.obligation_folders.clone(), true);
        driver.set_exists(locators.year_select.clone(), true);

        actions.enter(Stage::Obligations).await.unwrap();

        let clicked = driver.clicks();
        // 1-based dropdown entry for zero-based index 4.
        assert!(clicked.contains(&locators.dropdown_entry_at(5)));
    }
}
