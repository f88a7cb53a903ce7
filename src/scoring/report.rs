//! Accessibility report types

use serde::{Deserialize, Serialize};

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter grade derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// A >= 90, B >= 80, C >= 70, D >= 60, otherwise F
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

/// Issue counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuesCount {
    pub critical: u32,
    pub serious: u32,
    pub moderate: u32,
    pub minor: u32,
}

impl IssuesCount {
    /// Tally issues by severity
    pub fn tally(issues: &[Issue]) -> Self {
        let mut count = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Critical => count.critical += 1,
                Severity::Serious => count.serious += 1,
                Severity::Moderate => count.moderate += 1,
                Severity::Minor => count.minor += 1,
            }
        }
        count
    }

    pub fn total(&self) -> u32 {
        self.critical + self.serious + self.moderate + self.minor
    }
}

/// Per-principle percentages (POUR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    pub perceivable: u8,
    pub operable: u8,
    pub understandable: u8,
    pub robust: u8,
}

/// One offending element with a suggested fix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueElement {
    pub selector: String,
    pub html: String,
    pub suggestion: String,
}

/// A detected accessibility problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub elements: Vec<IssueElement>,
    #[serde(default)]
    pub wcag_criteria: String,
    #[serde(default)]
    pub impact: String,
}

/// Something the page does well
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Positive {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub wcag_criteria: String,
}

/// Which pass produced the report prose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Heuristic,
    Ai,
}

/// Final report for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityReport {
    pub score: u8,
    pub grade: Grade,
    pub issues_count: IssuesCount,
    pub categories: Categories,
    pub issues: Vec<Issue>,
    /// Structural recommendations outside `issuesCount`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Issue>,
    pub positives: Vec<Positive>,
    pub summary: String,
    pub source: ReportSource,
    /// Set only when the narrative pass failed and this is the fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
