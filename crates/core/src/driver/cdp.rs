//! Chrome DevTools protocol backend for [`PageDriver`].
//!
//! Attaches to an already-running Chrome instance exposing a remote
//! debugging endpoint. The session is expected to be warmed up by hand
//! (the portal sits behind a bot challenge), so the driver reuses the
//! first open tab instead of spawning a fresh one.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{self, EventResponseReceived};
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;

use super::types::{
    DriverError, Locator, PageDriver, ResponseInfo, ResponseMatcher, SelectOption, WaitOptions,
};

/// How often element waits re-check the page.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`PageDriver`] backed by a remote Chrome debugging session.
pub struct CdpDriver {
    browser: Browser,
    page: Page,
    page_suffix: String,
    downloads: Arc<Mutex<Vec<String>>>,
    redirect: Arc<AtomicBool>,
}

impl CdpDriver {
    /// Connect to the Chrome debugging endpoint from the configuration.
    ///
    /// This is the only operation whose failure is fatal to the whole
    /// process: without a session there is nothing to drive.
    pub async fn connect(config: &DriverConfig) -> Result<Self, DriverError> {
        let ws_url = Self::discover_ws_url(&config.debug_url).await?;
        debug!("Resolved websocket debugger URL: {}", ws_url);

        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        // The handler must be polled for the connection to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // Reuse the first open tab when one exists; a hand-passed bot
        // challenge lives in that tab's session.
        let pages = browser
            .pages()
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;
        let page = match pages.into_iter().next() {
            Some(page) => {
                info!("Reusing first open browser tab");
                page
            }
            None => {
                info!("No open tabs, creating a new one");
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?
            }
        };

        page.execute(network::EnableParams::default())
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        let driver = Self {
            browser,
            page,
            page_suffix: config.page_suffix.clone(),
            downloads: Arc::new(Mutex::new(Vec::new())),
            redirect: Arc::new(AtomicBool::new(false)),
        };
        driver.spawn_response_observer().await?;

        Ok(driver)
    }

    /// Resolve the websocket debugger URL from the HTTP endpoint.
    async fn discover_ws_url(debug_url: &str) -> Result<String, DriverError> {
        let version_url = format!("{}/json/version", debug_url.trim_end_matches('/'));
        let body: serde_json::Value = reqwest::get(&version_url)
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        body.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| {
                DriverError::ConnectionFailed(format!(
                    "no webSocketDebuggerUrl in response from {version_url}"
                ))
            })
    }

    /// Watch every network response for browser-initiated downloads and
    /// for the session-reset heuristic.
    async fn spawn_response_observer(&self) -> Result<(), DriverError> {
        let mut events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        let downloads = Arc::clone(&self.downloads);
        let redirect = Arc::clone(&self.redirect);
        let page_suffix = self.page_suffix.clone();

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let info = response_info(&event.response);
                if !info.url.ends_with(page_suffix.as_str()) {
                    continue;
                }

                let content_type = info.content_type.as_deref().unwrap_or("");
                if content_type == "application/vnd.ms-excel"
                    || content_type.contains("spreadsheet")
                {
                    redirect.store(false, Ordering::SeqCst);
                    let filename = info.attachment_filename().unwrap_or_else(|| {
                        format!("descarga_{}.xls", chrono::Utc::now().timestamp_millis())
                    });
                    info!("File transfer detected: {}", filename);
                    if let Ok(mut pending) = downloads.lock() {
                        pending.push(filename);
                    }
                } else if looks_like_session_reset(&event.response) {
                    // The portal answers with an empty same-page response and
                    // a fresh session cookie when it bounces the workflow.
                    warn!("Session reset response observed, raising redirect flag");
                    redirect.store(true, Ordering::SeqCst);
                }
            }
        });

        Ok(())
    }

    /// JS expression evaluating to the first element matching the locator,
    /// or `null`.
    fn find_expr(locator: &Locator) -> String {
        match locator {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::XPath(expression) => format!(
                "document.evaluate({}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(expression)
            ),
        }
    }

    /// Evaluate a JS expression and deserialize its result.
    async fn eval<T: serde::de::DeserializeOwned>(&self, expr: String) -> Result<T, DriverError> {
        self.page
            .evaluate(expr)
            .await
            .map_err(|e| DriverError::Evaluation(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| DriverError::Evaluation(e.to_string()))
    }

    /// Run a JS snippet against the located element.
    ///
    /// The snippet sees the element as `el` and its JSON-serializable
    /// return value is deserialized into `T`. A missing element is an
    /// [`DriverError::ElementNotFound`].
    async fn with_element<T: serde::de::DeserializeOwned>(
        &self,
        locator: &Locator,
        snippet: &str,
    ) -> Result<T, DriverError> {
        let expr = format!(
            "(() => {{ const el = {}; if (!el) return null; return {{ ok: ({}) }}; }})()",
            Self::find_expr(locator),
            snippet
        );
        let wrapped: Option<ElementResult<T>> = self.eval(expr).await?;
        match wrapped {
            Some(result) => Ok(result.ok),
            None => Err(DriverError::ElementNotFound(locator.to_string())),
        }
    }

    /// 0 = absent, 1 = present but not visible, 2 = visible.
    async fn element_state(&self, locator: &Locator) -> Result<u8, DriverError> {
        let expr = format!(
            "(() => {{ const el = {}; if (!el) return 0; \
             return (el.offsetWidth || el.offsetHeight || el.getClientRects().length) ? 2 : 1; \
             }})()",
            Self::find_expr(locator)
        );
        self.eval(expr).await
    }
}

/// Wrapper so that `null` (element missing) is distinguishable from a
/// legitimately null snippet result.
#[derive(serde::Deserialize)]
struct ElementResult<T> {
    ok: T,
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn current_url(&self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?
            .ok_or_else(|| DriverError::Navigation("page has no URL".to_string()))
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, opts: WaitOptions) -> Result<(), DriverError> {
        let deadline = tokio::time::Instant::now() + opts.timeout;
        loop {
            let state = self.element_state(locator).await?;
            let satisfied = if opts.hidden {
                state < 2
            } else if opts.visible {
                state == 2
            } else {
                state > 0
            };
            if satisfied {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout(locator.to_string()));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.with_element::<bool>(locator, "el.click(), true").await?;
        Ok(())
    }

    async fn select_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        let snippet = format!(
            "(el.value = {}, el.dispatchEvent(new Event('change', {{ bubbles: true }})), true)",
            js_string(value)
        );
        self.with_element::<bool>(locator, &snippet).await?;
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        self.with_element::<String>(locator, "el.innerText").await
    }

    async fn read_value(&self, locator: &Locator) -> Result<String, DriverError> {
        self.with_element::<String>(locator, "String(el.value)").await
    }

    async fn is_checked(&self, locator: &Locator) -> Result<bool, DriverError> {
        self.with_element::<bool>(locator, "!!el.checked").await
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(self.element_state(locator).await? > 0)
    }

    async fn select_options(&self, locator: &Locator) -> Result<Vec<SelectOption>, DriverError> {
        self.with_element::<Vec<SelectOption>>(
            locator,
            "Array.from(el.options || []).map(o => ({ label: o.text, value: o.value }))",
        )
        .await
    }

    async fn await_response(
        &self,
        matcher: &ResponseMatcher,
        timeout: Duration,
    ) -> Result<ResponseInfo, DriverError> {
        let mut events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| DriverError::Internal(e.to_string()))?;

        let wait = async {
            while let Some(event) = events.next().await {
                let info = response_info(&event.response);
                if matcher.matches(&info) {
                    return Some(info);
                }
            }
            None
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(Some(info)) => Ok(info),
            _ => Err(DriverError::ResponseTimeout),
        }
    }

    async fn set_download_dir(&self, dir: &Path) -> Result<(), DriverError> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(DriverError::Internal)?;
        // Browser-domain command, so it goes through the browser handle
        // rather than the page session.
        self.browser
            .execute(params)
            .await
            .map_err(|e| DriverError::Internal(e.to_string()))?;
        Ok(())
    }

    fn drain_downloads(&self) -> Vec<String> {
        match self.downloads.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => Vec::new(),
        }
    }

    fn take_redirect_flag(&self) -> bool {
        self.redirect.swap(false, Ordering::SeqCst)
    }
}

/// Quote a string as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Project the CDP response into the driver-level type.
fn response_info(response: &network::Response) -> ResponseInfo {
    let headers = serde_json::to_value(&response.headers).unwrap_or_default();
    ResponseInfo {
        url: response.url.clone(),
        status: response.status as u16,
        content_type: header(&headers, "content-type"),
        content_disposition: header(&headers, "content-disposition"),
    }
}

/// Case-insensitive header lookup in the serialized header map.
fn header(headers: &serde_json::Value, name: &str) -> Option<String> {
    headers.as_object()?.iter().find_map(|(key, value)| {
        if key.eq_ignore_ascii_case(name) {
            value.as_str().map(String::from)
        } else {
            None
        }
    })
}

/// Same-page response carrying no body but a fresh session cookie: the
/// portal's way of bouncing the workflow back to the start.
fn looks_like_session_reset(response: &network::Response) -> bool {
    let headers = serde_json::to_value(&response.headers).unwrap_or_default();
    let cache_control = header(&headers, "cache-control").unwrap_or_default();
    let content_length = header(&headers, "content-length").unwrap_or_else(|| "0".to_string());
    let set_cookie = header(&headers, "set-cookie").unwrap_or_default();

    cache_control != "no-cache" && content_length == "0" && set_cookie.ends_with("path=/")
}
