use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::{DocumentType, OrchestratorConfig};
use crate::portal::Locators;
use crate::tracker::TrackerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub driver: DriverConfig,
    pub orchestrator: OrchestratorConfig,
    pub tracker: TrackerConfig,
    pub batch: BatchConfig,
    pub locators: Locators,
}

/// Portal identity and query parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Consultation page URL.
    pub base_url: String,
    /// Jurisdiction/state code for the organization filter.
    pub state_code: u32,
    /// Reporting year to query.
    pub year: u16,
    /// Document category to harvest.
    pub doc_type: DocumentType,
    /// Label of the document folder on the information card.
    pub document_folder_label: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            state_code: 1,
            year: 2021,
            doc_type: DocumentType::default(),
            document_folder_label: "CONTRATOS DE OBRAS".to_string(),
        }
    }
}

fn default_base_url() -> String {
    "https://consultapublicamx.plataformadetransparencia.org.mx/vut-web/faces/view/consultaPublica.xhtml"
        .to_string()
}

/// Automation session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Chrome remote debugging endpoint.
    pub debug_url: String,
    /// URL suffix identifying responses from the consultation page.
    pub page_suffix: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            debug_url: "http://127.0.0.1:9222".to_string(),
            page_suffix: "consultaPublica.xhtml".to_string(),
        }
    }
}

/// Batch target selection and download destination
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Where browser downloads land.
    pub downloads_dir: PathBuf,
    /// One explicit organization name (wins over list and range).
    pub organization: Option<String>,
    /// Path to an organization list file (JSON array or line-delimited).
    pub organization_list: Option<PathBuf>,
    /// First dropdown index when harvesting by range (inclusive).
    pub from: usize,
    /// Last dropdown index when harvesting by range (inclusive).
    pub to: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            organization: None,
            organization_list: None,
            from: 0,
            to: 965,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.portal.state_code, 1);
        assert_eq!(config.portal.year, 2021);
        assert!(config.portal.base_url.contains("consultaPublica.xhtml"));
        assert_eq!(config.driver.debug_url, "http://127.0.0.1:9222");
        assert_eq!(config.batch.from, 0);
        assert_eq!(config.batch.to, 965);
    }

    #[test]
    fn test_doc_type_from_toml() {
        let toml = r#"
            [portal]
            doc_type = "public_tender"
            year = 2024
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.portal.doc_type, DocumentType::PublicTender);
        assert_eq!(config.portal.year, 2024);
    }
}
