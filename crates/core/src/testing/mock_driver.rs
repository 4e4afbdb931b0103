//! Mock page driver for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{
    DriverError, Locator, PageDriver, ResponseInfo, ResponseMatcher, SelectOption, WaitOptions,
};

/// Mock implementation of the [`PageDriver`] trait.
///
/// Optimistic by default: waits succeed immediately, clicks land, reads
/// return empty values. Tests script the page through the setters:
///
/// - `set_url` / `navigations` for position markers
/// - `set_exists`, `fail_wait`, `fail_wait_times` for element presence
/// - `set_text_sequence` for indicator readings (e.g. result counts)
/// - `link_click_to_checkbox` for controls that check on click
/// - `push_response`, `push_download`, `raise_redirect_flag` for the
///   network-facing surface
#[derive(Default)]
pub struct MockPageDriver {
    url: Mutex<String>,
    navigations: Mutex<Vec<String>>,
    clicks: Mutex<Vec<Locator>>,
    selections: Mutex<Vec<(Locator, String)>>,
    exists: Mutex<HashMap<Locator, bool>>,
    checked: Mutex<HashMap<Locator, bool>>,
    values: Mutex<HashMap<Locator, String>>,
    texts: Mutex<HashMap<Locator, Vec<String>>>,
    read_counts: Mutex<HashMap<Locator, usize>>,
    options: Mutex<HashMap<Locator, Vec<SelectOption>>>,
    fail_waits: Mutex<HashMap<Locator, u32>>,
    click_checks: Mutex<HashMap<Locator, Locator>>,
    responses: Mutex<Vec<ResponseInfo>>,
    downloads: Mutex<Vec<String>>,
    redirect: AtomicBool,
    download_dir: Mutex<Option<PathBuf>>,
}

impl MockPageDriver {
    /// Create a fresh mock with no scripted behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current URL (including fragment).
    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.lock().unwrap() = url.into();
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    /// Locators passed to `click`, in order.
    pub fn clicks(&self) -> Vec<Locator> {
        self.clicks.lock().unwrap().clone()
    }

    /// `(locator, value)` pairs passed to `select_value`, in order.
    pub fn selections(&self) -> Vec<(Locator, String)> {
        self.selections.lock().unwrap().clone()
    }

    /// Script element presence for `exists`.
    pub fn set_exists(&self, locator: Locator, present: bool) {
        self.exists.lock().unwrap().insert(locator, present);
    }

    /// Script the checked state of a checkbox.
    pub fn set_checked(&self, locator: Locator, checked: bool) {
        self.checked.lock().unwrap().insert(locator, checked);
    }

    /// Script the form value of an element.
    pub fn set_value(&self, locator: Locator, value: impl Into<String>) {
        self.values.lock().unwrap().insert(locator, value.into());
    }

    /// Script successive `read_text` readings for a locator. The last
    /// reading repeats once the sequence is exhausted.
    pub fn set_text_sequence<I, S>(&self, locator: Locator, readings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts
            .lock()
            .unwrap()
            .insert(locator, readings.into_iter().map(Into::into).collect());
    }

    /// How many times `read_text` was called for a locator.
    pub fn read_count(&self, locator: &Locator) -> usize {
        self.read_counts
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(0)
    }

    /// Script the options of a `<select>`.
    pub fn set_options(&self, locator: Locator, options: Vec<SelectOption>) {
        self.options.lock().unwrap().insert(locator, options);
    }

    /// Make every `wait_for` on this locator time out.
    pub fn fail_wait(&self, locator: Locator) {
        self.fail_waits.lock().unwrap().insert(locator, u32::MAX);
    }

    /// Make the next `times` waits on this locator time out.
    pub fn fail_wait_times(&self, locator: Locator, times: u32) {
        self.fail_waits.lock().unwrap().insert(locator, times);
    }

    /// Clicking `trigger` flips `checkbox` to checked, emulating controls
    /// that check through their label.
    pub fn link_click_to_checkbox(&self, trigger: Locator, checkbox: Locator) {
        self.click_checks.lock().unwrap().insert(trigger, checkbox);
    }

    /// Queue a network response for `await_response`.
    pub fn push_response(&self, response: ResponseInfo) {
        self.responses.lock().unwrap().push(response);
    }

    /// Announce an observed browser download.
    pub fn push_download(&self, filename: impl Into<String>) {
        self.downloads.lock().unwrap().push(filename.into());
    }

    /// Raise the redirect flag (consumed by the next `take_redirect_flag`).
    pub fn raise_redirect_flag(&self) {
        self.redirect.store(true, Ordering::SeqCst);
    }

    /// Directory passed to `set_download_dir`, if any.
    pub fn download_dir(&self) -> Option<PathBuf> {
        self.download_dir.lock().unwrap().clone()
    }

    fn consume_wait_failure(&self, locator: &Locator) -> bool {
        let mut fails = self.fail_waits.lock().unwrap();
        match fails.get_mut(locator) {
            Some(0) => {
                fails.remove(locator);
                false
            }
            Some(remaining) => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PageDriver for MockPageDriver {
    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, _opts: WaitOptions) -> Result<(), DriverError> {
        if self.consume_wait_failure(locator) {
            return Err(DriverError::WaitTimeout(locator.to_string()));
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.clicks.lock().unwrap().push(locator.clone());
        if let Some(checkbox) = self.click_checks.lock().unwrap().get(locator) {
            self.checked.lock().unwrap().insert(checkbox.clone(), true);
        }
        Ok(())
    }

    async fn select_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.selections
            .lock()
            .unwrap()
            .push((locator.clone(), value.to_string()));
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        let count = {
            let mut counts = self.read_counts.lock().unwrap();
            let entry = counts.entry(locator.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        let texts = self.texts.lock().unwrap();
        let Some(sequence) = texts.get(locator) else {
            return Ok(String::new());
        };
        let index = (count - 1).min(sequence.len().saturating_sub(1));
        Ok(sequence.get(index).cloned().unwrap_or_default())
    }

    async fn read_value(&self, locator: &Locator) -> Result<String, DriverError> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_checked(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(self
            .checked
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(false))
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(self
            .exists
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(false))
    }

    async fn select_options(&self, locator: &Locator) -> Result<Vec<SelectOption>, DriverError> {
        Ok(self
            .options
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .unwrap_or_default())
    }

    async fn await_response(
        &self,
        matcher: &ResponseMatcher,
        _timeout: Duration,
    ) -> Result<ResponseInfo, DriverError> {
        let mut responses = self.responses.lock().unwrap();
        if let Some(position) = responses.iter().position(|r| matcher.matches(r)) {
            return Ok(responses.remove(position));
        }
        // Queue empty: resolve as a timeout immediately, tests never wait.
        Err(DriverError::ResponseTimeout)
    }

    async fn set_download_dir(&self, dir: &Path) -> Result<(), DriverError> {
        *self.download_dir.lock().unwrap() = Some(dir.to_path_buf());
        Ok(())
    }

    fn drain_downloads(&self) -> Vec<String> {
        std::mem::take(&mut *self.downloads.lock().unwrap())
    }

    fn take_redirect_flag(&self) -> bool {
        self.redirect.swap(false, Ordering::SeqCst)
    }
}
