use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::Point;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;

use crate::config::BrowserOptions;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },
    #[error("no visible element with text {text:?} after {waited_ms}ms")]
    ElementNotFound { text: String, waited_ms: u64 },
    #[error("expected {locator} to be visible within {waited_ms}ms")]
    AssertionFailed { locator: String, waited_ms: u64 },
    #[error("screenshot failed: {0}")]
    Screenshot(#[source] CdpError),
    #[error("browser engine error: {0}")]
    Cdp(#[from] CdpError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How an assertion target is located on the page.
#[derive(Debug, Clone)]
pub enum Locator {
    Text { text: String },
    Role { role: String, name: String },
}

impl Locator {
    pub fn text(text: &str) -> Self {
        Self::Text {
            text: text.to_string(),
        }
    }

    pub fn role(role: &str, name: &str) -> Self {
        Self::Role {
            role: role.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Text { text } => write!(f, "text {:?}", text),
            Locator::Role { role, name } => write!(f, "role={}[name={:?}]", role, name),
        }
    }
}

const VISIBLE_FN: &str = "\
const visible = (el) => {
    const r = el.getBoundingClientRect();
    const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';
};";

// Innermost-match filter: an element only counts when none of its children
// also contain the needle, otherwise every ancestor up to <body> would hit.
const TEXT_HITS_FN: &str = "\
const textHits = (needle) => {
    const hits = [];
    for (const el of document.querySelectorAll('*')) {
        if (!el.textContent || !el.textContent.includes(needle)) continue;
        if (!visible(el)) continue;
        let innermost = true;
        for (const child of el.children) {
            if (child.textContent && child.textContent.includes(needle)) { innermost = false; break; }
        }
        if (innermost) hits.push(el);
    }
    return hits;
};";

const TEXT_POINT_BODY: &str = "\
const el = textHits(needle)[nth];
if (!el) return null;
const r = el.getBoundingClientRect();
return JSON.stringify({ x: r.x + r.width / 2, y: r.y + r.height / 2 });";

const ROLE_VISIBLE_BODY: &str = "\
const accName = (el) => ((el.getAttribute('aria-label') || el.textContent) || '').trim();
const matchesRole = (el) => el.getAttribute('role') === role
    || (role === 'button' && el.tagName === 'BUTTON')
    || (role === 'link' && el.tagName === 'A');
for (const el of document.querySelectorAll('*')) {
    if (matchesRole(el) && visible(el) && accName(el).includes(name)) return true;
}
return false;";

fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn text_point_js(text: &str, nth: usize) -> String {
    format!(
        "(() => {{ const needle = {}; const nth = {}; {} {} {} }})()",
        js_string(text),
        nth,
        VISIBLE_FN,
        TEXT_HITS_FN,
        TEXT_POINT_BODY
    )
}

fn text_visible_js(text: &str) -> String {
    format!(
        "(() => {{ const needle = {}; {} {} return textHits(needle).length > 0; }})()",
        js_string(text),
        VISIBLE_FN,
        TEXT_HITS_FN
    )
}

fn role_visible_js(role: &str, name: &str) -> String {
    format!(
        "(() => {{ const role = {}; const name = {}; {} {} }})()",
        js_string(role),
        js_string(name),
        VISIBLE_FN,
        ROLE_VISIBLE_BODY
    )
}

/// One browser process, one page, owned for the whole scenario.
///
/// Every operation is sequential and internally bounded: it polls the DOM at
/// `poll_interval_ms` until it succeeds or `wait_timeout_ms` elapses. Nothing
/// here blocks forever.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl BrowserSession {
    pub async fn launch(opts: &BrowserOptions) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder();
        if !opts.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(format!("failed to launch chromium: {}", e)))?;

        // Drain CDP events in the background. Without this, the browser
        // connection will stall.
        let handler_task = tokio::task::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut browser = browser;
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(SessionError::Launch(format!(
                    "failed to create initial page: {}",
                    e
                )));
            }
        };

        Ok(Self {
            browser,
            handler: handler_task,
            page,
            wait_timeout: Duration::from_millis(opts.wait_timeout_ms),
            poll_interval: Duration::from_millis(opts.poll_interval_ms),
        })
    }

    /// Loads a URL and waits for the page's load event.
    pub async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                source: e,
            })?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                source: e,
            })?;
        debug!("loaded {}", url);
        Ok(())
    }

    /// Clicks the nth visible element whose text contains `text`, waiting for
    /// it to appear within the bounded poll window.
    pub async fn click_visible_text(&self, text: &str, nth: usize) -> Result<(), SessionError> {
        let js = text_point_js(text, nth);
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let result = self.page.evaluate(js.as_str()).await?;
            if let Some(payload) = result.value().and_then(|v| v.as_str()) {
                let point: serde_json::Value =
                    serde_json::from_str(payload).unwrap_or(serde_json::Value::Null);
                if let (Some(x), Some(y)) = (point["x"].as_f64(), point["y"].as_f64()) {
                    self.page.click(Point { x, y }).await?;
                    debug!("clicked {:?} at ({:.0}, {:.0})", text, x, y);
                    // Let a click-triggered navigation or DOM mutation settle.
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(SessionError::ElementNotFound {
                    text: text.to_string(),
                    waited_ms: self.wait_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Asserts that the locator resolves to a visible element within the
    /// bounded poll window.
    pub async fn assert_visible(&self, locator: &Locator) -> Result<(), SessionError> {
        let js = match locator {
            Locator::Text { text } => text_visible_js(text),
            Locator::Role { role, name } => role_visible_js(role, name),
        };
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let result = self.page.evaluate(js.as_str()).await?;
            if result.value().and_then(|v| v.as_bool()).unwrap_or(false) {
                debug!("{} is visible", locator);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::AssertionFailed {
                    locator: locator.to_string(),
                    waited_ms: self.wait_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Writes a PNG of the current viewport, overwriting any existing file.
    pub async fn screenshot(&self, path: &Path) -> Result<(), SessionError> {
        self.page
            .save_screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
                path,
            )
            .await
            .map_err(SessionError::Screenshot)?;
        Ok(())
    }

    /// Closes the browser and reaps the child process. Called exactly once
    /// per run, on the success and failure paths alike.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser did not close cleanly: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_scripts_escape_quotes_in_needles() {
        let js = text_point_js(r#""I am the best trainer.""#, 0);
        assert!(js.contains(r#"const needle = "\"I am the best trainer.\"";"#));

        let js = text_visible_js("it's");
        assert!(js.contains(r#"const needle = "it's";"#));
    }

    #[test]
    fn role_probe_embeds_role_and_name() {
        let js = role_visible_js("tab", "Body Measurements");
        assert!(js.contains(r#"const role = "tab";"#));
        assert!(js.contains(r#"const name = "Body Measurements";"#));
    }

    #[test]
    fn locator_descriptions_are_readable() {
        assert_eq!(Locator::text("Super Trainer").to_string(), "text \"Super Trainer\"");
        assert_eq!(
            Locator::role("tab", "Body Measurements").to_string(),
            "role=tab[name=\"Body Measurements\"]"
        );
    }
}
