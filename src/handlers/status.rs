//! Health and status endpoints
//!
//! - `/health` - liveness check
//! - `/status` - version, uptime, analysis counters, latency percentiles and
//!   process memory
//!
//! ```text
//! HTTP Request ──> Axum Router ──> status_handler ──> AppState
//!                                        │                │
//!                                        ▼                ▼
//!                              StatusResponse    LatencyHistogram
//!                                                  + Counters
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::monitor::{InMemoryMonitorStore, MonitorStore};
use crate::pipeline::Analyzer;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Longest latency the histogram tracks, in milliseconds
const MAX_TRACKED_MS: u64 = 600_000;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Server status with runtime metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub name: String,
    pub uptime_seconds: u64,
    /// Analyses completed successfully
    pub analyses_completed: u64,
    /// Analyses that ended in an error
    pub analyses_failed: u64,
    /// Analyses currently holding a browser
    pub analyses_in_flight: u64,
    /// Concurrent analysis limit
    pub max_concurrent: usize,
    /// Reports get a narrative pass
    pub enrichment_enabled: bool,
    pub monitors: usize,
    pub memory: MemoryMetrics,
    /// Analysis latency
    pub latency: LatencyMetrics,
    pub status: String,
    pub timestamp: String,
}

/// Process memory from sysinfo
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Resident set size (bytes)
    pub rss_bytes: u64,
    /// Virtual memory size (bytes)
    pub virtual_bytes: u64,
}

/// Latency percentiles in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub count: u64,
    pub mean_ms: f64,
    pub max_ms: u64,
}

// ============================================================================
// Latency Histogram
// ============================================================================

/// Thread-safe histogram of analysis durations.
///
/// Millisecond resolution from 1ms to 10 minutes, 3 significant figures.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, MAX_TRACKED_MS, 3).expect("histogram bounds are valid");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record a duration. Values past the upper bound are clamped to it.
    pub fn record(&self, duration: Duration) {
        let ms = (duration.as_millis() as u64).clamp(1, MAX_TRACKED_MS);
        let mut hist = self.inner.write();
        if let Err(e) = hist.record(ms) {
            warn!("Dropped latency sample {}ms: {}", ms, e);
        }
    }

    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        if hist.is_empty() {
            return LatencyMetrics::default();
        }
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0),
            p95_ms: hist.value_at_percentile(95.0),
            p99_ms: hist.value_at_percentile(99.0),
            count: hist.len(),
            mean_ms: hist.mean(),
            max_ms: hist.max(),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Shared server state.
///
/// The semaphore bounds how many analyses (and therefore Chromium processes)
/// run at once; the analyzer itself knows nothing about it.
pub struct AppState {
    start_time: Instant,
    analyzer: Analyzer,
    monitors: Arc<dyn MonitorStore>,
    limiter: Semaphore,
    max_concurrent: usize,
    completed: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
    latency: LatencyHistogram,
}

impl AppState {
    /// State with an in-memory monitor store
    pub fn new(analyzer: Analyzer) -> Self {
        Self::with_store(analyzer, Arc::new(InMemoryMonitorStore::new()))
    }

    pub fn with_store(analyzer: Analyzer, monitors: Arc<dyn MonitorStore>) -> Self {
        let max_concurrent = analyzer.config().max_concurrent.max(1);
        Self {
            start_time: Instant::now(),
            analyzer,
            monitors,
            limiter: Semaphore::new(max_concurrent),
            max_concurrent,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            latency: LatencyHistogram::new(),
        }
    }

    #[inline]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    #[inline]
    pub fn monitors(&self) -> &dyn MonitorStore {
        self.monitors.as_ref()
    }

    #[inline]
    pub fn limiter(&self) -> &Semaphore {
        &self.limiter
    }

    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Count one analysis as in flight until the guard is dropped
    pub(crate) fn begin(&self) -> AnalysisGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        AnalysisGuard {
            state: self,
            started: Instant::now(),
        }
    }

    fn record(&self, elapsed: Duration, ok: bool) {
        self.latency.record(elapsed);
        if ok {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn analyses_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn analyses_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn analyses_in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency.metrics()
    }
}

/// One running analysis.
///
/// Dropping the guard releases the in-flight slot, including when the request
/// future is cancelled mid-analysis. Only [`AnalysisGuard::finish`] records
/// latency and the outcome.
pub struct AnalysisGuard<'a> {
    state: &'a AppState,
    started: Instant,
}

impl AnalysisGuard<'_> {
    /// Record latency and whether the analysis succeeded
    pub(crate) fn finish(self, ok: bool) {
        self.state.record(self.started.elapsed(), ok);
    }
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        let _ = self
            .state
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}

// ============================================================================
// System Metrics Collection
// ============================================================================

/// Memory usage of this process; zeros if it cannot be read
fn collect_memory_metrics() -> MemoryMetrics {
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match system.process(pid) {
        Some(process) => MemoryMetrics {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        },
        None => {
            debug!("Could not find current process in sysinfo");
            MemoryMetrics::default()
        }
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /status`
#[instrument(skip_all)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Status check requested");

    let monitors = match state.monitors().list().await {
        Ok(all) => all.len(),
        Err(e) => {
            warn!("Monitor store unavailable: {}", e);
            0
        }
    };

    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: state.uptime_seconds(),
        analyses_completed: state.analyses_completed(),
        analyses_failed: state.analyses_failed(),
        analyses_in_flight: state.analyses_in_flight(),
        max_concurrent: state.max_concurrent,
        enrichment_enabled: state.analyzer().enrichment_enabled(),
        monitors,
        memory: collect_memory_metrics(),
        latency: state.latency_metrics(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

// ============================================================================
// Tests
// ============================================================================
