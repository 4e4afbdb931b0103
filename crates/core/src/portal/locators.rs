//! Element locators for the consultation portal.
//!
//! Selectors are volatile configuration, not logic: every one of them can
//! be overridden from the config file when the portal markup shifts.
//! Entries containing `{name}`, `{label}` or `{index}` are templates,
//! materialized through the accessor methods below.

use serde::{Deserialize, Serialize};

use crate::driver::Locator;

/// Full locator set for one portal skin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Locators {
    /// Overlay shown while the portal blocks input during AJAX refreshes.
    pub screen_blocker: Locator,

    /// State/jurisdiction filter dropdown button.
    pub state_filter_button: Locator,
    /// The option list of the opened state filter.
    pub state_filter_list: Locator,
    /// Template: nth entry of the opened state filter (`{index}`, 1-based).
    pub state_filter_option_template: String,

    /// Institution picker dropdown button.
    pub institution_button: Locator,
    /// Template: dropdown entry whose text contains `{name}`.
    pub dropdown_entry_template: String,
    /// Template: nth entry of the currently open dropdown (`{index}`, 1-based).
    pub dropdown_entry_at_template: String,

    /// Reporting-year `<select>` on the obligations stage.
    pub year_select: Locator,
    /// Obligation folder tiles (render marks the stage as loaded).
    pub obligation_folders: Locator,

    /// Form wrapping the obligation list on the information-card stage.
    pub obligations_form: Locator,
    /// "No obligations" popup, when displayed.
    pub no_obligations_popup: Locator,
    /// Template: document folder label containing `{label}` (uppercased).
    pub document_folder_template: String,
    /// Year `<select>` inside the information card.
    pub inner_year_select: Locator,

    /// Label marking the query form as interactable.
    pub query_form_marker: Locator,
    /// "All reporting periods" aggregate checkbox.
    pub all_periods_checkbox: Locator,
    /// Clickable label of the aggregate checkbox.
    pub all_periods_label: Locator,
    /// Template: nth individual period checkbox (`{index}`, 1-based).
    pub period_checkbox_template: String,
    /// Query submit action.
    pub query_button: Locator,
    /// Result-count indicator.
    pub result_count: Locator,

    /// Download action over the result set.
    pub download_button: Locator,
    /// "Download" tab inside the modal surface.
    pub modal_download_tab: Locator,
    /// Range dropdown button inside the modal.
    pub range_dropdown_button: Locator,
    /// Underlying range `<select>` holding the range options.
    pub range_select: Locator,
    /// Per-range download action.
    pub range_download_button: Locator,
    /// The modal surface itself (clicked to dismiss).
    pub modal_surface: Locator,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            screen_blocker: Locator::css("div.capaBloqueaPantalla"),
            state_filter_button: Locator::xpath(
                r#"//button[contains(., "Selecciona") or contains(., "Federación") or contains(., "Estado")]"#,
            ),
            state_filter_list: Locator::xpath(
                r#"//div[contains(@class, "btn-group") and contains(@class, "open")]//ul"#,
            ),
            state_filter_option_template:
                r#"//div[contains(@class, "btn-group") and contains(@class, "open")]//ul/li[{index}]/a"#
                    .to_string(),
            institution_button: Locator::css("#tooltipInst > div > button"),
            dropdown_entry_template: r#"//a/span[contains(text(), "{name}")]"#.to_string(),
            dropdown_entry_at_template:
                r#"(//div[contains(@class, "btn-group") and contains(@class, "open")]//ul/li[{index}]/a)[1]"#
                    .to_string(),
            year_select: Locator::css(r#"select[id*="cboEjercicio"]"#),
            obligation_folders: Locator::css("div.tituloObligacion"),
            obligations_form: Locator::xpath(r#"//form[@id="formListaObligaciones"]"#),
            no_obligations_popup: Locator::xpath(
                r#"//div[contains(@id, "modalSinObligaciones") and contains(@style, "display: block")]"#,
            ),
            document_folder_template:
                r#"//label[contains(translate(text(), 'abcdefghijklmnopqrstuvwxyz', 'ABCDEFGHIJKLMNOPQRSTUVWXYZ'), '{label}')]"#
                    .to_string(),
            inner_year_select: Locator::xpath(r#"//select[contains(@id, "cboEjercicio")]"#),
            query_form_marker: Locator::xpath(
                r#"//label[contains(text(), "Periodo de actualización")]"#,
            ),
            all_periods_checkbox: Locator::xpath(
                r#"//input[@value="99" and contains(@id, "checkPeriodos")]"#,
            ),
            all_periods_label: Locator::xpath(
                r#"//label[contains(@for, "checkPeriodos") and contains(text(), "Seleccionar todos")]"#,
            ),
            period_checkbox_template:
                r#"(//input[contains(@id, "checkPeriodos")])[{index}]"#.to_string(),
            query_button: Locator::xpath(
                r#"//a[contains(text(), "CONSULTAR") or contains(text(), "Consultar")]"#,
            ),
            result_count: Locator::css("#itTotalResultados"),
            download_button: Locator::xpath(
                r#"//a[contains(@id, "formDescargaArchivos") and contains(text(), "DESCARGAR")]"#,
            ),
            modal_download_tab: Locator::xpath(
                r#"//label[contains(@class, "simulalink") and contains(normalize-space(.), "Descargar")]"#,
            ),
            range_dropdown_button: Locator::xpath(
                r#"//button[contains(@data-id, "formModalRangos:rangoExcel")]"#,
            ),
            range_select: Locator::xpath(r#"//select[@id="formModalRangos:rangoExcel"]"#),
            range_download_button: Locator::xpath(
                r#"//input[@id="formModalRangos:btnDescargaExcel"]"#,
            ),
            modal_surface: Locator::css("#modalRangos"),
        }
    }
}

impl Locators {
    /// State filter entry for a jurisdiction code (entries are 1-based and
    /// the federation occupies slot 1).
    pub fn state_filter_option(&self, state_code: u32) -> Locator {
        Locator::xpath(
            self.state_filter_option_template
                .replace("{index}", &(state_code + 1).to_string()),
        )
    }

    /// Entry of the currently open dropdown whose text contains `text`.
    pub fn dropdown_entry(&self, text: &str) -> Locator {
        Locator::xpath(self.dropdown_entry_template.replace("{name}", text))
    }

    /// Nth entry of the currently open dropdown, 1-based.
    pub fn dropdown_entry_at(&self, index: usize) -> Locator {
        Locator::xpath(
            self.dropdown_entry_at_template
                .replace("{index}", &index.to_string()),
        )
    }

    /// Document folder whose label contains `label` (case-insensitive).
    pub fn document_folder(&self, label: &str) -> Locator {
        Locator::xpath(
            self.document_folder_template
                .replace("{label}", &label.to_uppercase()),
        )
    }

    /// Nth individual reporting-period checkbox, 1-based.
    pub fn period_checkbox(&self, index: usize) -> Locator {
        Locator::xpath(
            self.period_checkbox_template
                .replace("{index}", &index.to_string()),
        )
    }
}
