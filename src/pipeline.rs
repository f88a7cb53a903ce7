//! End-to-end analysis pipeline
//!
//! ```text
//! normalize url
//!       |
//!       v
//! [browser session] -- settle -> extract -> capture   (bounded by the run budget)
//!       |
//!       v   session closed
//! [heuristic score] -> [narrative enrichment] -> AnalysisOutcome
//! ```
//!
//! The browser is released before the model is called, so a slow model never
//! holds a Chromium process.

use crate::browser::{with_session, PageHandle, PageSettler, ScreenshotCapturer, Screenshots, SettleOptions};
use crate::config::AppConfig;
use crate::enrich::{CodeFixGenerator, GeminiClient, NarrativeEnricher};
use crate::error::{ConfigError, Error, Result};
use crate::extraction::{PageSnapshot, SnapshotExtractor};
use crate::scoring::{AccessibilityReport, HeuristicScorer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Everything read from the browser for one run
#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub snapshot: PageSnapshot,
    pub screenshots: Screenshots,
}

/// Result of one analysis run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    /// Normalized URL that was analyzed
    pub url: String,
    pub analyzed_at: DateTime<Utc>,
    pub report: AccessibilityReport,
    pub snapshot: PageSnapshot,
    pub screenshots: Screenshots,
}

/// Runs analyses with a fixed configuration
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<AppConfig>,
    enricher: NarrativeEnricher,
}

impl Analyzer {
    /// Validate the configuration and build the model client.
    ///
    /// A missing model credential fails here, before any browser is launched.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let enricher = match (config.enrichment_enabled, config.api_key.as_ref()) {
            (true, Some(key)) => NarrativeEnricher::new(Arc::new(GeminiClient::new(
                key.clone(),
                config.model.clone(),
                config.endpoint.clone(),
                config.model_timeout,
            )?)),
            _ => NarrativeEnricher::disabled(),
        };
        Ok(Self {
            config: Arc::new(config),
            enricher,
        })
    }

    /// Replace the narrative enricher
    pub fn with_enricher(mut self, enricher: NarrativeEnricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether reports get a narrative pass
    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_enabled()
    }

    /// Code fix generator on the same model; `None` when enrichment is off
    pub fn code_fixer(&self) -> Option<CodeFixGenerator> {
        self.enricher.model().map(CodeFixGenerator::new)
    }

    /// Analyze one URL
    #[instrument(skip(self))]
    pub async fn analyze(&self, url: &str) -> Result<AnalysisOutcome> {
        if url.trim().is_empty() {
            return Err(ConfigError::MissingUrl.into());
        }
        let url = crate::browser::normalize_url(url)?;
        let started = Instant::now();

        let captured = self.capture(&url).await?;

        let heuristic = HeuristicScorer::score(&captured.snapshot);
        let report = self
            .enricher
            .enrich(&captured.snapshot, &heuristic, &captured.screenshots.hero)
            .await;

        info!(
            "Analyzed {} in {:?}: score {} ({}), source {:?}",
            url,
            started.elapsed(),
            report.score,
            report.grade,
            report.source
        );

        Ok(AnalysisOutcome {
            url,
            analyzed_at: Utc::now(),
            report,
            snapshot: captured.snapshot,
            screenshots: captured.screenshots,
        })
    }

    /// Browser half of the pipeline, bounded by the run budget.
    ///
    /// The budget is applied inside the session so the browser is closed
    /// before a timeout error reaches the caller.
    pub async fn capture(&self, url: &str) -> Result<CapturedPage> {
        let budget = self.config.analysis_timeout;
        let options = SettleOptions {
            timeout_ms: self.config.browser.timeout_ms,
            ..SettleOptions::default()
        };
        let url = url.to_string();

        with_session(self.config.browser.clone(), move |page| async move {
            match tokio::time::timeout(budget, capture_page(&page, &url, &options)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Analysis of {} exceeded {:?}", url, budget);
                    Err(Error::AnalysisTimeout(budget_secs(budget)))
                }
            }
        })
        .await
    }
}

fn budget_secs(budget: Duration) -> u64 {
    budget.as_secs().max(1)
}

async fn capture_page(page: &PageHandle, url: &str, options: &SettleOptions) -> Result<CapturedPage> {
    let settled = PageSettler::settle(page, url, options).await?;
    let snapshot = if settled.is_verification_page {
        info!("Verification page at {}, skipping element extraction", settled.final_url);
        let title = page.eval::<String>("document.title").await.unwrap_or_default();
        blocked_snapshot(&settled.final_url, title)
    } else {
        let extracted = SnapshotExtractor::extract_or_minimal(page, &settled.final_url, false).await;
        reduce_if_blocked(extracted)
    };
    let screenshots = ScreenshotCapturer::capture(
        page,
        snapshot.performance.page_width,
        snapshot.dimensions.viewport_height,
    )
    .await?;
    Ok(CapturedPage { snapshot, screenshots })
}

/// Element-free snapshot for a challenge page
fn blocked_snapshot(url: &str, title: String) -> PageSnapshot {
    let mut snapshot = PageSnapshot::minimal(url, true);
    snapshot.title = title;
    snapshot
}

/// The extraction script can spot a challenge the settler missed; its
/// elements belong to the interstitial, not the site.
fn reduce_if_blocked(snapshot: PageSnapshot) -> PageSnapshot {
    if snapshot.is_verification_page {
        blocked_snapshot(&snapshot.url, snapshot.title)
    } else {
        snapshot
    }
}
