//! Page loading and settling
//!
//! Navigation only waits for DOMContentLoaded; many sites never reach network
//! idle. Settling then layers heuristics on top: a framework hydration wait,
//! a scripted scroll to wake lazy loaders, forced `data-src` swaps, and a
//! bounded attempt to sit out bot-verification interstitials.

use crate::browser::verification::{self, PAGE_TEXT_SCRIPT};
use crate::browser::PageHandle;
use crate::error::{Error, NavigationError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Options for loading and settling a page
#[derive(Debug, Clone)]
pub struct SettleOptions {
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Readiness condition after navigation (default: DOMContentLoaded)
    pub wait_until: WaitUntil,
    /// How long to poll for framework globals (default: 3s)
    pub hydration_poll: Duration,
    /// Interval between hydration polls (default: 250ms)
    pub hydration_interval: Duration,
    /// Extra wait once a framework is detected (default: 2s)
    pub hydration_settle: Duration,
    /// Pause between scroll steps (default: 150ms)
    pub scroll_pause: Duration,
    /// Maximum number of scroll steps (default: 40)
    pub max_scroll_steps: u32,
    /// Wait at the bottom before returning to the top (default: 1s)
    pub scroll_settle: Duration,
    /// Upper bound on the verification race (default: 15s)
    pub verification_timeout: Duration,
    /// Poll interval while waiting for a challenge to clear (default: 1s)
    pub verification_interval: Duration,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            wait_until: WaitUntil::DomContentLoaded,
            hydration_poll: Duration::from_secs(3),
            hydration_interval: Duration::from_millis(250),
            hydration_settle: Duration::from_secs(2),
            scroll_pause: Duration::from_millis(150),
            max_scroll_steps: 40,
            scroll_settle: Duration::from_secs(1),
            verification_timeout: Duration::from_secs(15),
            verification_interval: Duration::from_secs(1),
        }
    }
}

/// Condition to wait for after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until load event fires
    Load,
    /// Wait until DOMContentLoaded event fires
    DomContentLoaded,
}

/// Outcome of loading and settling a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleResult {
    /// Settling ran to completion (false when it was cut short by a challenge page)
    pub settled: bool,
    /// A verification interstitial was still showing at the end
    pub is_verification_page: bool,
    /// Final URL after redirects
    pub final_url: String,
    /// A client-side framework was detected during the hydration wait
    pub hydrated: bool,
}

#[derive(Debug, Deserialize)]
struct ScrollMetrics {
    #[serde(default)]
    height: f64,
    #[serde(default)]
    viewport: f64,
}

#[derive(Debug, Deserialize)]
struct PageText {
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
}

/// Normalize user input into an absolute http(s) URL.
///
/// Scheme-less input gets `https://`.
pub fn normalize_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(NavigationError::InvalidUrl("URL cannot be empty".to_string()).into());
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&candidate)
        .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(NavigationError::InvalidUrl(format!(
                "unsupported scheme '{}': {}",
                other, trimmed
            ))
            .into())
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(NavigationError::InvalidUrl(format!("missing host: {}", trimmed)).into());
    }

    Ok(parsed.to_string())
}

const FRAMEWORK_READY_SCRIPT: &str = r#"
    (() => !!(
        window.__NEXT_DATA__ || window.__NUXT__ || window.React ||
        window.__REACT_DEVTOOLS_GLOBAL_HOOK__ || window.Vue || window.__VUE__ ||
        window.ng || window.getAllAngularRootElements || window.__svelte ||
        document.querySelector('[data-reactroot], [ng-version], [data-v-app]')
    ))()
"#;

const SCROLL_METRICS: &str = r#"
    ({
        height: Math.max(
            document.body ? document.body.scrollHeight : 0,
            document.documentElement ? document.documentElement.scrollHeight : 0
        ),
        viewport: window.innerHeight || 0
    })
"#;

const FORCE_LAZY_IMAGES: &str = r#"
    (() => {
        let count = 0;
        document.querySelectorAll('img[data-src], img[data-srcset], source[data-srcset]').forEach(el => {
            try {
                const src = el.getAttribute('data-src');
                if (src && el.getAttribute('src') !== src) {
                    el.setAttribute('src', src);
                    count++;
                }
                const srcset = el.getAttribute('data-srcset');
                if (srcset) {
                    el.setAttribute('srcset', srcset);
                }
                if (el.loading === 'lazy') {
                    el.loading = 'eager';
                }
            } catch (e) {}
        });
        return count;
    })()
"#;

/// Loads a URL and brings the page to a stable state for extraction
pub struct PageSettler;

impl PageSettler {
    /// Navigate to `url` and settle the page.
    ///
    /// A navigation timeout is fatal. A verification page is not: it is
    /// reported through [`SettleResult::is_verification_page`].
    #[instrument(skip(page, options))]
    pub async fn settle(page: &PageHandle, url: &str, options: &SettleOptions) -> Result<SettleResult> {
        let url = normalize_url(url)?;
        info!("Navigating to: {}", url);

        Self::navigate(page, &url, options).await?;

        let hydrated = Self::wait_for_hydration(page, options).await;
        Self::scroll_through(page, options).await;
        Self::force_lazy_images(page).await;

        let mut is_verification_page = Self::detect_verification(page).await;
        if is_verification_page {
            warn!("Verification interstitial detected, waiting up to {:?}", options.verification_timeout);
            Self::wait_out_verification(page, options).await;
            is_verification_page = Self::detect_verification(page).await;
            if !is_verification_page {
                info!("Verification cleared, re-settling");
                Self::scroll_through(page, options).await;
                Self::force_lazy_images(page).await;
            }
        }

        let final_url = page
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.clone());

        debug!("Settled {} (hydrated={}, verification={})", final_url, hydrated, is_verification_page);

        Ok(SettleResult {
            settled: !is_verification_page,
            is_verification_page,
            final_url,
            hydrated,
        })
    }

    async fn navigate(page: &PageHandle, url: &str, options: &SettleOptions) -> Result<()> {
        let timeout = Duration::from_millis(options.timeout_ms);

        tokio::time::timeout(timeout, page.page.goto(url))
            .await
            .map_err(|_| NavigationError::Timeout(options.timeout_ms))?
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

        let script = match options.wait_until {
            WaitUntil::Load => {
                r#"
                    new Promise(resolve => {
                        if (document.readyState === 'complete') {
                            resolve(true);
                        } else {
                            window.addEventListener('load', () => resolve(true));
                        }
                    })
                "#
            }
            WaitUntil::DomContentLoaded => {
                r#"
                    new Promise(resolve => {
                        if (document.readyState !== 'loading') {
                            resolve(true);
                        } else {
                            document.addEventListener('DOMContentLoaded', () => resolve(true));
                        }
                    })
                "#
            }
        };

        tokio::time::timeout(timeout, page.page.evaluate(script))
            .await
            .map_err(|_| NavigationError::Timeout(options.timeout_ms))?
            .map_err(|e| Error::cdp(e.to_string()))?;

        Ok(())
    }

    /// Poll for framework globals; false negatives are accepted.
    async fn wait_for_hydration(page: &PageHandle, options: &SettleOptions) -> bool {
        let deadline = tokio::time::Instant::now() + options.hydration_poll;

        loop {
            if page.eval::<bool>(FRAMEWORK_READY_SCRIPT).await.unwrap_or(false) {
                debug!("Framework detected, waiting {:?} for hydration", options.hydration_settle);
                tokio::time::sleep(options.hydration_settle).await;
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(options.hydration_interval).await;
        }
    }

    /// Scroll the whole document in viewport steps, then return to the top
    async fn scroll_through(page: &PageHandle, options: &SettleOptions) {
        let metrics = match page.eval::<ScrollMetrics>(SCROLL_METRICS).await {
            Ok(m) => m,
            Err(e) => {
                debug!("Scroll metrics unavailable: {}", e);
                return;
            }
        };

        let step = if metrics.viewport > 0.0 {
            metrics.viewport
        } else {
            page.viewport().1 as f64
        };
        let steps = scroll_steps(metrics.height, step, options.max_scroll_steps);

        for i in 1..=steps {
            let y = (i as f64 * step).round();
            let _ = page.page.evaluate(format!("window.scrollTo(0, {})", y).as_str()).await;
            tokio::time::sleep(options.scroll_pause).await;
        }

        if steps > 0 {
            tokio::time::sleep(options.scroll_settle).await;
        }
        let _ = page.page.evaluate("window.scrollTo(0, 0)").await;
        tokio::time::sleep(options.scroll_pause).await;
    }

    async fn force_lazy_images(page: &PageHandle) {
        match page.eval::<u64>(FORCE_LAZY_IMAGES).await {
            Ok(n) if n > 0 => debug!("Forced {} lazy images", n),
            Ok(_) => {}
            Err(e) => debug!("Lazy image forcing failed: {}", e),
        }
    }

    /// Keyword check against the current title and body text
    pub async fn detect_verification(page: &PageHandle) -> bool {
        match page.eval::<PageText>(PAGE_TEXT_SCRIPT).await {
            Ok(text) => verification::is_verification_text(&text.title, &text.text),
            Err(_) => false,
        }
    }

    /// Race a navigation against the keywords disappearing, bounded by the
    /// verification timeout. Never fails and never waits past the bound.
    async fn wait_out_verification(page: &PageHandle, options: &SettleOptions) {
        let navigation = async {
            if page.page.wait_for_navigation().await.is_ok() {
                debug!("Navigation observed after challenge");
                // Give the post-challenge document a moment to render
                tokio::time::sleep(options.hydration_settle).await;
            }
        };

        let cleared = async {
            loop {
                tokio::time::sleep(options.verification_interval).await;
                if !Self::detect_verification(page).await {
                    debug!("Challenge keywords cleared");
                    break;
                }
            }
        };

        let raced = tokio::time::timeout(options.verification_timeout, async {
            tokio::select! {
                _ = navigation => {}
                _ = cleared => {}
            }
        })
        .await;

        if raced.is_err() {
            warn!("Verification wait timed out; continuing");
        }
    }
}

/// Number of viewport-sized scroll steps needed to reach the bottom
pub fn scroll_steps(document_height: f64, step: f64, max_steps: u32) -> u32 {
    if step <= 0.0 || document_height <= step {
        return 0;
    }
    let needed = ((document_height - step) / step).ceil() as u32;
    needed.min(max_steps)
}
