// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Headless-browser strategy for script-heavy sites.
//!
//! One browser process is shared by every worker. Each fetch opens its own
//! page inside a [`PageGuard`], so the page is closed on success, on error
//! and when the caller's timeout drops the future.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::ops::Deref;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::robot::memory::Config;
use crate::robot::services::fetcher::{FetchError, Strategy};

pub const NAME: &str = "render";

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

pub struct RenderStrategy {
    browser: RwLock<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    settle: Duration,
}

impl RenderStrategy {
    pub async fn launch(config: &Config) -> Result<RenderStrategy, FetchError> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &config.chrome {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.no_sandbox().build().map_err(FetchError::Render)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        log::info!("Headless browser launched");
        Ok(RenderStrategy {
            browser: RwLock::new(Some(browser)),
            handler: Mutex::new(Some(handler)),
            settle: config.render_settle,
        })
    }

    async fn render(&self, page: &Page, url: &Url) -> Result<String, FetchError> {
        page.goto(url.as_str()).await.map_err(render_error)?;
        page.wait_for_navigation().await.map_err(render_error)?;
        tokio::time::sleep(self.settle).await;

        // lazy-loaded content
        if let Err(e) = page.evaluate(SCROLL_TO_BOTTOM).await {
            log::debug!("scroll failed on {}: {}", url, e);
        } else {
            tokio::time::sleep(self.settle).await;
        }

        page.content().await.map_err(render_error)
    }
}

fn render_error(e: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Render(e.to_string())
}

#[async_trait]
impl Strategy for RenderStrategy {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let guard = {
            let browser = self.browser.read().await;
            let browser = browser.as_ref().ok_or(FetchError::RenderUnavailable)?;
            let page = browser.new_page("about:blank").await.map_err(render_error)?;
            PageGuard::new(page, url.to_string())
        };

        let result = self.render(&guard, url).await;
        guard.close().await;
        result
    }

    /// Shuts the browser down. Later calls find nothing to close.
    async fn close(&self) {
        let browser = self.browser.write().await.take();
        if let Some(mut browser) = browser {
            if let Err(e) = browser.close().await {
                log::warn!("Failed to close headless browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                log::warn!("Headless browser did not exit cleanly: {}", e);
            }
            log::info!("Headless browser closed");
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
    }
}

/// Owns one browser page and closes it exactly once.
///
/// `close` is the normal path; `Drop` covers early returns and cancelled
/// futures by spawning the close on the runtime captured at construction.
struct PageGuard {
    page: Option<Page>,
    url: String,
    runtime: tokio::runtime::Handle,
}

impl PageGuard {
    fn new(page: Page, url: String) -> PageGuard {
        PageGuard {
            page: Some(page),
            url,
            runtime: tokio::runtime::Handle::current(),
        }
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                log::warn!("Failed to close page for {}: {}", self.url, e);
            }
        }
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Page {
        match &self.page {
            Some(page) => page,
            None => unreachable!("page is only taken by close or drop"),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let url = std::mem::take(&mut self.url);
            self.runtime.spawn(async move {
                if let Err(e) = page.close().await {
                    log::warn!("Page cleanup failed for {}: {}", url, e);
                }
            });
        }
    }
}
