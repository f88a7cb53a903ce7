//! Monitor registry
//!
//! A monitor remembers a URL and the outcome of its recent checks. Storage is
//! behind [`MonitorStore`] so the server can swap the in-memory map for a
//! database without touching the handlers.

use crate::error::Result;
use crate::scoring::{AccessibilityReport, IssuesCount};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Checks kept per monitor
pub const MAX_HISTORY: usize = 30;

/// Score below which a check counts as a regression
pub const REGRESSION_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Active,
}

/// One recorded check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCheck {
    pub timestamp: DateTime<Utc>,
    pub score: u8,
    pub issues: IssuesCount,
    /// Score under the threshold or any critical issue
    pub has_regressions: bool,
}

impl MonitorCheck {
    /// Summarize a report as a check taken now
    pub fn from_report(report: &AccessibilityReport) -> Self {
        Self::at(Utc::now(), report.score, report.issues_count)
    }

    pub fn at(timestamp: DateTime<Utc>, score: u8, issues: IssuesCount) -> Self {
        Self {
            timestamp,
            score,
            issues,
            has_regressions: score < REGRESSION_THRESHOLD || issues.critical > 0,
        }
    }
}

/// A monitored URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: String,
    pub url: String,
    /// Free-form schedule label; nothing runs it automatically
    pub schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub status: MonitorStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub history: Vec<MonitorCheck>,
    pub created: DateTime<Utc>,
}

impl Monitor {
    fn new(url: String, schedule: String, webhook_url: Option<String>) -> Self {
        Self {
            id: format!("monitor_{}", Uuid::new_v4()),
            url,
            schedule,
            webhook_url,
            status: MonitorStatus::Active,
            last_check: None,
            history: Vec::new(),
            created: Utc::now(),
        }
    }

    /// Append a check, keeping only the most recent [`MAX_HISTORY`]
    pub fn push_check(&mut self, check: MonitorCheck) {
        self.last_check = Some(check.timestamp);
        self.history.push(check);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

/// Monitor persistence
#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn create(&self, url: String, schedule: String, webhook_url: Option<String>) -> Result<Monitor>;
    async fn get(&self, id: &str) -> Result<Option<Monitor>>;
    /// Returns whether a monitor was removed
    async fn remove(&self, id: &str) -> Result<bool>;
    /// Append a check; `None` when the monitor does not exist
    async fn record(&self, id: &str, check: MonitorCheck) -> Result<Option<Monitor>>;
    async fn list(&self) -> Result<Vec<Monitor>>;
}

/// Process-local monitor store
#[derive(Default)]
pub struct InMemoryMonitorStore {
    monitors: RwLock<HashMap<String, Monitor>>,
}

impl InMemoryMonitorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorStore {
    async fn create(&self, url: String, schedule: String, webhook_url: Option<String>) -> Result<Monitor> {
        let monitor = Monitor::new(url, schedule, webhook_url);
        self.monitors.write().insert(monitor.id.clone(), monitor.clone());
        Ok(monitor)
    }

    async fn get(&self, id: &str) -> Result<Option<Monitor>> {
        Ok(self.monitors.read().get(id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.monitors.write().remove(id).is_some())
    }

    async fn record(&self, id: &str, check: MonitorCheck) -> Result<Option<Monitor>> {
        let mut monitors = self.monitors.write();
        Ok(monitors.get_mut(id).map(|m| {
            m.push_check(check);
            m.clone()
        }))
    }

    async fn list(&self) -> Result<Vec<Monitor>> {
        let mut all: Vec<Monitor> = self.monitors.read().values().cloned().collect();
        all.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(score: u8) -> MonitorCheck {
        MonitorCheck::at(Utc::now(), score, IssuesCount::default())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryMonitorStore::new();
        let monitor = store
            .create("https://example.com/".into(), "daily".into(), None)
            .await
            .unwrap();
        assert!(monitor.id.starts_with("monitor_"));
        assert_eq!(monitor.status, MonitorStatus::Active);
        let fetched = store.get(&monitor.id).await.unwrap().unwrap();
        assert_eq!(fetched, monitor);
    }

    #[tokio::test]
    async fn test_history_capped() {
        let store = InMemoryMonitorStore::new();
        let monitor = store.create("https://example.com/".into(), "hourly".into(), None).await.unwrap();
        for i in 0..45u8 {
            store.record(&monitor.id, check(i)).await.unwrap();
        }
        let monitor = store.get(&monitor.id).await.unwrap().unwrap();
        assert_eq!(monitor.history.len(), MAX_HISTORY);
        assert_eq!(monitor.history[0].score, 15);
        assert_eq!(monitor.history.last().map(|c| c.score), Some(44));
        assert!(monitor.last_check.is_some());
    }

    #[tokio::test]
    async fn test_remove_and_unknown_ids() {
        let store = InMemoryMonitorStore::new();
        let monitor = store.create("https://example.com/".into(), "daily".into(), None).await.unwrap();
        assert!(store.remove(&monitor.id).await.unwrap());
        assert!(!store.remove(&monitor.id).await.unwrap());
        assert!(store.record("monitor_missing", check(90)).await.unwrap().is_none());
    }

    #[test]
    fn test_regression_flag() {
        assert!(check(69).has_regressions);
        assert!(!check(70).has_regressions);
        let critical = MonitorCheck::at(
            Utc::now(),
            95,
            IssuesCount {
                critical: 1,
                ..IssuesCount::default()
            },
        );
        assert!(critical.has_regressions);
    }
}
