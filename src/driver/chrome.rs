//! Chrome/Chromium page driver over the DevTools protocol

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{DriverError, Locator, PageDriver};
use crate::config::{BrowserConfig, WaitConfig};
use crate::utils::retry::with_retry;

/// A single Chrome session with one page
pub struct ChromeDriver {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
    click_pause: Duration,
}

impl ChromeDriver {
    /// Launch Chrome and open a blank page
    ///
    /// Launch failures are retried according to `waits.navigation_retries`.
    pub async fn launch(config: &BrowserConfig, waits: &WaitConfig) -> Result<Self, DriverError> {
        let (browser, handler, page) = with_retry(&waits.retry_config(), "launch_browser", || {
            Self::launch_once(config)
        })
        .await?;

        info!(
            headless = config.headless,
            viewport_width = config.viewport_width,
            viewport_height = config.viewport_height,
            "browser launched"
        );

        Ok(Self {
            browser: Some(browser),
            page,
            handler,
            poll_interval: waits.poll_interval(),
            click_pause: waits.click_pause(),
        })
    }

    async fn launch_once(
        config: &BrowserConfig,
    ) -> Result<(Browser, JoinHandle<()>, Page), DriverError> {
        let mut builder = CdpBrowserConfig::builder();

        // chromiumoxide runs headless unless told otherwise
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(Duration::from_secs(config.navigation_timeout_secs));

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in &config.chrome_args {
            builder = builder.arg(arg.as_str());
        }

        let cdp_config = builder.build().map_err(|e| {
            DriverError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
            debug!("browser event handler exited");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(DriverError::LaunchFailed(format!("failed to open page: {e}")));
            }
        };

        Ok((browser, handler, page))
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.browser.is_none() {
            return Err(DriverError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::NavigationFailed(format!("{url}: {e}")))?;
        debug!(url, "navigated");
        Ok(())
    }

    async fn wait_for(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Element>, DriverError> {
        self.ensure_open()?;

        let css = locator.css();
        let deadline = Instant::now() + timeout;

        loop {
            if let Ok(element) = self.page.find_element(css.as_str()).await {
                return Ok(Some(element));
            }

            if Instant::now() >= deadline {
                debug!(%locator, timeout_ms = timeout.as_millis() as u64, "wait timed out");
                return Ok(None);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn exists(&mut self, locator: &Locator) -> bool {
        if self.browser.is_none() {
            return false;
        }
        self.page.find_element(locator.css()).await.is_ok()
    }

    async fn find(&mut self, locator: &Locator) -> Result<Element, DriverError> {
        self.ensure_open()?;
        self.page
            .find_element(locator.css())
            .await
            .map_err(|_| DriverError::ElementNotFound(locator.to_string()))
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, DriverError> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn read_attribute(&mut self, element: &Element, name: &str) -> String {
        match element.attribute(name).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                debug!(attribute = name, error = %e, "attribute read failed");
                String::new()
            }
        }
    }

    async fn scroll_into_view(&mut self, element: &Element) -> Result<(), DriverError> {
        element.scroll_into_view().await?;
        Ok(())
    }

    async fn click(&mut self, element: &Element) -> Result<(), DriverError> {
        element.scroll_into_view().await?;
        tokio::time::sleep(self.click_pause).await;
        element.click().await?;
        Ok(())
    }

    async fn shutdown(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for browser exit failed");
        }
        self.handler.abort();

        info!("browser session closed");
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        // chromiumoxide kills an unclosed browser process on drop; the handler task is ours
        if self.browser.is_some() {
            self.handler.abort();
        }
    }
}
