//! a11yscan - Accessibility analysis of live web pages
//!
//! Loads a page in headless Chromium, waits for it to settle, extracts a
//! structured snapshot of its accessibility-relevant DOM, scores it with a
//! deterministic heuristic, and optionally asks a multimodal model for
//! page-specific prose.
//!
//! # Architecture
//!
//! ```text
//! URL ──▶ Browser Session ──▶ Page Settler ──▶ Snapshot Extractor
//!              (CDP)                                  │
//!                                                     ├──▶ Screenshot Capturer
//!                                                     ▼
//!                                             Heuristic Scorer
//!                                                     │
//!                                                     ▼
//!                                          Narrative Enrichment ──▶ Report
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use a11yscan::config::AppConfig;
//! use a11yscan::pipeline::Analyzer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig {
//!         enrichment_enabled: false,
//!         ..AppConfig::from_env()?
//!     };
//!     let analyzer = Analyzer::new(config)?;
//!     let outcome = analyzer.analyze("example.com").await?;
//!     println!("{} ({})", outcome.report.score, outcome.report.grade);
//!     Ok(())
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod config;
pub mod cors;
pub mod enrich;
pub mod error;
pub mod extraction;
pub mod handlers;
pub mod monitor;
pub mod pipeline;
pub mod scoring;

pub use browser::BrowserController;
pub use error::{Error, Result};
pub use extraction::{PageSnapshot, SnapshotExtractor};
pub use pipeline::{AnalysisOutcome, Analyzer};
pub use scoring::{AccessibilityReport, HeuristicScorer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
