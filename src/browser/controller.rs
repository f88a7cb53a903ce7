//! Browser lifecycle management
//!
//! This module handles browser launch, shutdown, and page management. Every
//! analysis owns exactly one [`BrowserController`]; [`with_session`] is the
//! scoped form that releases the browser on every exit path of its body.

use crate::error::{BrowserError, Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Desktop Chrome user agent used unless the config overrides it
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// How the per-run Chromium process is launched
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Viewport and window width
    pub width: u32,
    /// Viewport and window height
    pub height: u32,
    /// Off inside containers that lack user namespaces
    pub sandbox: bool,
    pub disable_gpu: bool,
    /// Falls back to [`DEFAULT_USER_AGENT`]
    pub user_agent: Option<String>,
    /// Per-navigation limit in milliseconds
    pub timeout_ms: u64,
    /// Chromium binary; auto-detected when unset
    pub chrome_path: Option<String>,
    /// Install the automation-hiding init scripts on each page
    pub stealth: bool,
    /// Appended after the derived switches
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1920,
            height: 1080,
            sandbox: true,
            disable_gpu: true,
            user_agent: None,
            timeout_ms: 30_000,
            chrome_path: None,
            stealth: true,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Effective user agent
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Chrome command-line switches derived from this config
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--user-agent={}", self.user_agent()),
            format!("--window-size={},{}", self.width, self.height),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];
        if self.disable_gpu {
            args.push("--disable-gpu".to_string());
        }
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
            args.push("--disable-setuid-sandbox".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Handle to an open browser page
#[derive(Clone)]
pub struct PageHandle {
    pub(crate) page: Page,
    pub(crate) viewport: (u32, u32),
}

impl PageHandle {
    /// Get the underlying chromiumoxide Page
    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Configured viewport (width, height)
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Evaluate an expression in the page and deserialize its value
    pub async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let value = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| Error::cdp(e.to_string()))?;
        Ok(value)
    }
}

/// One headless browser process
pub struct BrowserController {
    browser: Browser,
    handler: JoinHandle<()>,
    config: BrowserConfig,
}

impl BrowserController {
    /// Launch a browser with the given config
    #[instrument(skip(config))]
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser: headless={}, sandbox={}, viewport={}x{}",
            config.headless, config.sandbox, config.width, config.height
        );

        let mut builder = CdpBrowserConfig::builder().viewport(chromiumoxide::handler::viewport::Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(BrowserError::InvalidConfig)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            handler: handler_task,
            config,
        })
    }

    /// Create a new page/tab
    #[instrument(skip(self))]
    pub async fn new_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        if self.config.stealth {
            super::stealth::StealthMode::apply(&page).await?;
        }

        debug!("Created new page");
        Ok(PageHandle {
            page,
            viewport: (self.config.width, self.config.height),
        })
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close the browser and wait for the CDP handler to wind down
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        info!("Closing browser");

        let closed = self.browser.close().await.map_err(|e| Error::cdp(e.to_string()));
        // Reap the child even when the close command failed
        let _ = tokio::time::timeout(Duration::from_secs(5), self.browser.wait()).await;
        let _ = tokio::time::timeout(Duration::from_secs(5), &mut self.handler).await;
        self.handler.abort();

        info!("Browser closed");
        closed.map(|_| ())
    }
}

/// Run `body` against a fresh page of a freshly launched browser.
///
/// The browser is closed after `body` completes, whether it succeeded, failed
/// or was cut short by a timeout inside it. A failed close is logged, never
/// allowed to mask the body's own result.
pub async fn with_session<F, Fut, T>(config: BrowserConfig, body: F) -> Result<T>
where
    F: FnOnce(PageHandle) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let controller = BrowserController::launch(config).await?;

    let outcome = match controller.new_page().await {
        Ok(page) => body(page).await,
        Err(e) => Err(e),
    };

    if let Err(e) = controller.close().await {
        warn!("Browser close reported an error: {}", e);
    }

    outcome
}
