//! Deterministic heuristic scoring
//!
//! The score starts from a base of 85, loses points per concrete defect, gains
//! points for structural signals, and is clamped to [30, 100]. The same
//! snapshot always yields the same score, issues and positives.

use crate::extraction::{FormInput, Image, Link, PageSnapshot};
use crate::scoring::report::{
    AccessibilityReport, Categories, Grade, Issue, IssueElement, IssuesCount, Positive, ReportSource, Severity,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const BASE_SCORE: i64 = 85;
pub const MIN_SCORE: i64 = 30;
pub const MAX_SCORE: i64 = 100;

pub const MISSING_ALT_PENALTY: i64 = 8;
pub const EMPTY_LINK_PENALTY: i64 = 3;
pub const MISSING_LABEL_PENALTY: i64 = 10;

pub const LANDMARK_BONUS: i64 = 5;
pub const HEADING_BONUS: i64 = 5;
pub const FRAMEWORK_BONUS: i64 = 3;
pub const RICH_LANDMARK_BONUS: i64 = 2;

/// Offending elements listed per issue
pub const MAX_ISSUE_ELEMENTS: usize = 5;

/// Issue id reported for bot-challenge pages
pub const VERIFICATION_ISSUE_ID: &str = "verification-blocked";

/// Categories reported when the page could not be inspected
pub const VERIFICATION_CATEGORIES: Categories = Categories {
    perceivable: 70,
    operable: 75,
    understandable: 80,
    robust: 75,
};

/// Numbers and findings computed from a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicScore {
    pub score: u8,
    pub grade: Grade,
    pub categories: Categories,
    pub issues_count: IssuesCount,
    /// Penalized defects; `issues_count` tallies exactly these
    pub issues: Vec<Issue>,
    /// Unpenalized structural recommendations, not counted
    pub advisories: Vec<Issue>,
    pub positives: Vec<Positive>,
    /// The snapshot was a verification page and was not scored
    pub blocked: bool,
}

impl HeuristicScore {
    /// Plain-language summary of the heuristic findings
    pub fn summary(&self) -> String {
        if self.blocked {
            return "The page returned a bot-verification challenge instead of its content, so only a \
                    placeholder assessment is available. Retry later or analyze the site from an allowed network."
                .to_string();
        }
        let count = &self.issues_count;
        let mut summary = format!(
            "Automated structural checks scored this page {}/100 (grade {}).",
            self.score, self.grade
        );
        if count.total() == 0 {
            summary.push_str(" No structural accessibility issues were detected.");
        } else {
            summary.push_str(&format!(
                " Found {} critical, {} serious, {} moderate and {} minor issue(s).",
                count.critical, count.serious, count.moderate, count.minor
            ));
        }
        if !self.advisories.is_empty() {
            summary.push_str(&format!(" {} structural recommendation(s) apply.", self.advisories.len()));
        }
        if !self.positives.is_empty() {
            summary.push_str(&format!(" {} good practice(s) were observed.", self.positives.len()));
        }
        summary
    }

    /// Report carrying only heuristic prose
    pub fn to_report(&self, error: Option<String>) -> AccessibilityReport {
        AccessibilityReport {
            score: self.score,
            grade: self.grade,
            issues_count: self.issues_count,
            categories: self.categories,
            issues: self.issues.clone(),
            advisories: self.advisories.clone(),
            positives: self.positives.clone(),
            summary: self.summary(),
            source: ReportSource::Heuristic,
            error,
        }
    }
}

/// Pure snapshot scorer
pub struct HeuristicScorer;

impl HeuristicScorer {
    /// Score a snapshot
    pub fn score(snapshot: &PageSnapshot) -> HeuristicScore {
        if snapshot.is_verification_page {
            return Self::verification_blocked(snapshot);
        }

        let missing_alt = snapshot.images_without_alt() as i64;
        let empty_links = snapshot.empty_visible_links() as i64;
        let missing_labels = snapshot.inputs_without_labels() as i64;

        let mut raw = BASE_SCORE
            - MISSING_ALT_PENALTY * missing_alt
            - EMPTY_LINK_PENALTY * empty_links
            - MISSING_LABEL_PENALTY * missing_labels;
        if snapshot.has_semantic_landmark() {
            raw += LANDMARK_BONUS;
        }
        if snapshot.has_headings() {
            raw += HEADING_BONUS;
        }
        if snapshot.has_framework() {
            raw += FRAMEWORK_BONUS;
        }
        if snapshot.structure.landmark_count > 3 {
            raw += RICH_LANDMARK_BONUS;
        }
        let score = raw.clamp(MIN_SCORE, MAX_SCORE) as u8;

        let categories = Categories {
            perceivable: percent((100 - 15 * missing_alt).max(70)),
            operable: percent((100 - 8 * empty_links - 10 * missing_labels).max(75)),
            understandable: if snapshot.has_headings() { 100 } else { 80 },
            robust: if snapshot.has_framework() { 100 } else { 90 },
        };

        let issues = detect_issues(snapshot);
        let advisories = detect_advisories(snapshot);
        let positives = detect_positives(snapshot);
        let issues_count = IssuesCount::tally(&issues);

        debug!(
            "Heuristic score {} (alt={}, links={}, labels={})",
            score, missing_alt, empty_links, missing_labels
        );

        HeuristicScore {
            score,
            grade: Grade::from_score(score),
            categories,
            issues_count,
            issues,
            advisories,
            positives,
            blocked: false,
        }
    }

    fn verification_blocked(snapshot: &PageSnapshot) -> HeuristicScore {
        let issue = Issue {
            id: VERIFICATION_ISSUE_ID.to_string(),
            severity: Severity::Critical,
            title: "Page blocked by bot verification".to_string(),
            description: "The site served a security challenge (for example a Cloudflare \"Just a moment\" page) \
                          instead of its content, so the real page could not be evaluated."
                .to_string(),
            elements: vec![IssueElement {
                selector: "body".to_string(),
                html: format!("<title>{}</title>", escape(&snapshot.title)),
                suggestion: "Allow automated accessibility checkers, or run the analysis from an allow-listed network."
                    .to_string(),
            }],
            wcag_criteria: "N/A".to_string(),
            impact: "Automated testing could not inspect the page. Challenge pages may also block assistive technology users."
                .to_string(),
        };
        HeuristicScore {
            score: MIN_SCORE as u8,
            grade: Grade::D,
            categories: VERIFICATION_CATEGORIES,
            issues_count: IssuesCount {
                critical: 1,
                ..IssuesCount::default()
            },
            issues: vec![issue],
            advisories: Vec::new(),
            positives: Vec::new(),
            blocked: true,
        }
    }
}

fn percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn image_element(img: &Image) -> IssueElement {
    let src = escape(&shorten(&img.src, 120));
    IssueElement {
        selector: format!("img:nth-of-type({})", img.index + 1),
        html: format!("<img src=\"{}\">", src),
        suggestion: format!("<img src=\"{}\" alt=\"Describe the image content\">", src),
    }
}

fn link_element(link: &Link) -> IssueElement {
    let href = escape(&shorten(&link.href, 120));
    IssueElement {
        selector: format!("a:nth-of-type({})", link.index + 1),
        html: format!("<a href=\"{}\"></a>", href),
        suggestion: format!("<a href=\"{}\" aria-label=\"Describe the link destination\">...</a>", href),
    }
}

fn input_element(input: &FormInput) -> IssueElement {
    let kind = if input.input_type.is_empty() { "text" } else { input.input_type.as_str() };
    let selector = if !input.id.is_empty() {
        format!("#{}", input.id)
    } else if !input.name.is_empty() {
        format!("[name=\"{}\"]", escape(&input.name))
    } else {
        format!("input[type=\"{}\"]", escape(kind))
    };
    let id = if input.id.is_empty() {
        if input.name.is_empty() { "field".to_string() } else { input.name.clone() }
    } else {
        input.id.clone()
    };
    let id = escape(&id);
    IssueElement {
        selector,
        html: format!("<input type=\"{}\" name=\"{}\">", escape(kind), escape(&input.name)),
        suggestion: format!(
            "<label for=\"{id}\">Field label</label><input id=\"{id}\" type=\"{}\" name=\"{}\">",
            escape(kind),
            escape(&input.name)
        ),
    }
}

struct IssueText {
    id: &'static str,
    severity: Severity,
    title: &'static str,
    description: &'static str,
    wcag: &'static str,
    impact: &'static str,
}

impl IssueText {
    fn into_issue(self, elements: Vec<IssueElement>) -> Issue {
        Issue {
            id: self.id.to_string(),
            severity: self.severity,
            title: self.title.to_string(),
            description: self.description.to_string(),
            elements,
            wcag_criteria: self.wcag.to_string(),
            impact: self.impact.to_string(),
        }
    }
}

fn detect_issues(snapshot: &PageSnapshot) -> Vec<Issue> {
    let mut issues = Vec::new();

    if snapshot.images_without_alt() > 0 {
        let elements = snapshot
            .images
            .iter()
            .filter(|i| i.needs_alt)
            .take(MAX_ISSUE_ELEMENTS)
            .map(image_element)
            .collect();
        issues.push(
            IssueText {
                id: "missing-alt-text",
                severity: Severity::Critical,
                title: "Images missing alternative text",
                description: "Visible, non-decorative images have no alt attribute.",
                wcag: "1.1.1 Non-text Content (Level A)",
                impact: "Screen reader users cannot understand the content of these images.",
            }
            .into_issue(elements),
        );
    }

    if snapshot.inputs_without_labels() > 0 {
        let elements = snapshot
            .all_inputs()
            .filter(|i| i.needs_label)
            .take(MAX_ISSUE_ELEMENTS)
            .map(input_element)
            .collect();
        issues.push(
            IssueText {
                id: "form-labels",
                severity: Severity::Serious,
                title: "Form controls without labels",
                description: "Form fields have no label, placeholder or aria-label describing their purpose.",
                wcag: "3.3.2 Labels or Instructions (Level A), 1.3.1 Info and Relationships (Level A)",
                impact: "Assistive technology users cannot tell what information a field expects.",
            }
            .into_issue(elements),
        );
    }

    if snapshot.empty_visible_links() > 0 {
        let elements = snapshot
            .links
            .iter()
            .filter(|l| l.is_empty && l.visible)
            .take(MAX_ISSUE_ELEMENTS)
            .map(link_element)
            .collect();
        issues.push(
            IssueText {
                id: "empty-links",
                severity: Severity::Serious,
                title: "Links without accessible names",
                description: "Visible links have no text, aria-label, title or image alt text.",
                wcag: "2.4.4 Link Purpose (In Context) (Level A)",
                impact: "Screen readers announce these links without any indication of where they lead.",
            }
            .into_issue(elements),
        );
    }

    issues
}

/// Structural findings that carry no score penalty
fn detect_advisories(snapshot: &PageSnapshot) -> Vec<Issue> {
    let mut advisories = Vec::new();

    if !snapshot.has_headings() {
        advisories.push(
            IssueText {
                id: "missing-headings",
                severity: Severity::Moderate,
                title: "No headings found",
                description: "The page has no h1-h6 elements to convey its structure.",
                wcag: "1.3.1 Info and Relationships (Level A), 2.4.6 Headings and Labels (Level AA)",
                impact: "Screen reader users cannot skim or jump between sections of the page.",
            }
            .into_issue(vec![IssueElement {
                selector: "body".to_string(),
                html: "<div class=\"title\">Page title</div>".to_string(),
                suggestion: "<h1>Page title</h1>".to_string(),
            }]),
        );
    }

    if !snapshot.has_semantic_landmark() {
        advisories.push(
            IssueText {
                id: "missing-landmarks",
                severity: Severity::Moderate,
                title: "No semantic landmarks",
                description: "The page has no main, header or nav landmark.",
                wcag: "1.3.1 Info and Relationships (Level A)",
                impact: "Assistive technology users cannot navigate directly to the main regions of the page.",
            }
            .into_issue(vec![IssueElement {
                selector: "body".to_string(),
                html: "<div id=\"content\">...</div>".to_string(),
                suggestion: "<header>...</header><nav>...</nav><main id=\"content\">...</main>".to_string(),
            }]),
        );
    }

    if snapshot.language.trim().is_empty() {
        advisories.push(
            IssueText {
                id: "missing-lang",
                severity: Severity::Minor,
                title: "Page language not declared",
                description: "The html element has no lang attribute.",
                wcag: "3.1.1 Language of Page (Level A)",
                impact: "Screen readers may pronounce the content with the wrong language rules.",
            }
            .into_issue(vec![IssueElement {
                selector: "html".to_string(),
                html: "<html>".to_string(),
                suggestion: "<html lang=\"en\">".to_string(),
            }]),
        );
    }

    if !snapshot.structure.has_skip_links && snapshot.structure.has_nav {
        advisories.push(
            IssueText {
                id: "missing-skip-link",
                severity: Severity::Minor,
                title: "No skip navigation link",
                description: "The page has navigation but no link to skip past it to the main content.",
                wcag: "2.4.1 Bypass Blocks (Level A)",
                impact: "Keyboard users must tab through every navigation link on each page.",
            }
            .into_issue(vec![IssueElement {
                selector: "body".to_string(),
                html: "<body><nav>...</nav>".to_string(),
                suggestion: "<body><a href=\"#main\" class=\"skip-link\">Skip to main content</a><nav>...</nav>"
                    .to_string(),
            }]),
        );
    }

    advisories
}

fn positive(id: &str, title: &str, description: String, wcag: &str) -> Positive {
    Positive {
        id: id.to_string(),
        title: title.to_string(),
        description,
        wcag_criteria: wcag.to_string(),
    }
}

fn detect_positives(snapshot: &PageSnapshot) -> Vec<Positive> {
    let mut positives = Vec::new();

    if snapshot.has_semantic_landmark() {
        positives.push(positive(
            "semantic-landmarks",
            "Semantic landmarks",
            format!("The page uses {} landmark region(s).", snapshot.structure.landmark_count.max(1)),
            "1.3.1 Info and Relationships (Level A)",
        ));
    }
    if snapshot.has_headings() {
        positives.push(positive(
            "heading-structure",
            "Heading structure",
            format!("The page provides {} heading(s).", snapshot.headings.len()),
            "2.4.6 Headings and Labels (Level AA)",
        ));
    }
    if snapshot.structure.has_skip_links {
        positives.push(positive(
            "skip-links",
            "Skip navigation link",
            "Keyboard users can bypass repeated navigation.".to_string(),
            "2.4.1 Bypass Blocks (Level A)",
        ));
    }
    if !snapshot.language.trim().is_empty() {
        positives.push(positive(
            "page-language",
            "Page language declared",
            format!("The document declares lang=\"{}\".", snapshot.language.trim()),
            "3.1.1 Language of Page (Level A)",
        ));
    }
    if !snapshot.images.is_empty() && snapshot.images_without_alt() == 0 {
        positives.push(positive(
            "images-described",
            "Images described",
            format!("All {} image(s) have alt text or are decorative.", snapshot.images.len()),
            "1.1.1 Non-text Content (Level A)",
        ));
    }
    let inputs = snapshot.all_inputs().count();
    if inputs > 0 && snapshot.inputs_without_labels() == 0 {
        positives.push(positive(
            "inputs-labelled",
            "Form fields labelled",
            format!("All {} form control(s) have an accessible label.", inputs),
            "3.3.2 Labels or Instructions (Level A)",
        ));
    }

    positives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Heading;

    #[test]
    fn test_empty_snapshot_scores_base() {
        let result = HeuristicScorer::score(&PageSnapshot::default());
        assert_eq!(result.score, 85);
        assert_eq!(result.grade, Grade::B);
        assert_eq!(result.categories.perceivable, 100);
        assert_eq!(result.categories.understandable, 80);
        assert_eq!(result.categories.robust, 90);
        assert!(!result.blocked);
    }

    #[test]
    fn test_bonuses_apply() {
        let mut snap = PageSnapshot::default();
        snap.structure.has_main = true;
        snap.structure.landmark_count = 4;
        snap.headings.push(Heading { level: 1, text: "Hi".into(), ..Heading::default() });
        snap.performance.frameworks.insert("react".into(), true);
        let result = HeuristicScorer::score(&snap);
        assert_eq!(result.score, 100);
        assert_eq!(result.grade, Grade::A);
        assert_eq!(result.categories.robust, 100);
    }

    #[test]
    fn test_floor_clamp() {
        let mut snap = PageSnapshot::default();
        snap.images = (0..20)
            .map(|_| Image { visible: true, needs_alt: true, ..Image::default() })
            .collect();
        let result = HeuristicScorer::score(&snap);
        assert_eq!(result.score, 30);
        assert_eq!(result.categories.perceivable, 70);
        assert_eq!(result.issues[0].elements.len(), MAX_ISSUE_ELEMENTS);
    }

    #[test]
    fn test_skip_link_advisory_requires_nav() {
        let mut snap = PageSnapshot::default();
        let result = HeuristicScorer::score(&snap);
        assert!(result.advisories.iter().all(|i| i.id != "missing-skip-link"));

        snap.structure.has_nav = true;
        let result = HeuristicScorer::score(&snap);
        assert!(result.advisories.iter().any(|i| i.id == "missing-skip-link"));
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_advisories_not_counted() {
        let result = HeuristicScorer::score(&PageSnapshot::default());
        assert!(result.issues.is_empty());
        assert_eq!(result.issues_count, IssuesCount::default());
        let ids: Vec<&str> = result.advisories.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["missing-headings", "missing-landmarks", "missing-lang"]);
    }

    #[test]
    fn test_input_element_rendering() {
        let input = FormInput {
            input_type: "email".into(),
            name: "mail".into(),
            ..FormInput::default()
        };
        let el = input_element(&input);
        assert_eq!(el.selector, "[name=\"mail\"]");
        assert!(el.suggestion.contains("<label for=\"mail\">"));
    }

    #[test]
    fn test_summary_mentions_score() {
        let result = HeuristicScorer::score(&PageSnapshot::default());
        assert!(result.summary().contains("85/100"));
    }
}
