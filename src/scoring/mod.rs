//! Heuristic accessibility scoring
//!
//! Pure functions from a [`PageSnapshot`](crate::extraction::PageSnapshot) to
//! a score, grade, POUR categories, issues and positives.

pub mod heuristic;
pub mod report;

pub use heuristic::{HeuristicScore, HeuristicScorer, VERIFICATION_ISSUE_ID};
pub use report::{
    AccessibilityReport, Categories, Grade, Issue, IssueElement, IssuesCount, Positive, ReportSource, Severity,
};
