//! Heuristic scoring tests
//!
//! Scenario and boundary checks against hand-built snapshots.

use a11yscan::extraction::{Form, FormInput, Heading, Image, Link, PageSnapshot};
use a11yscan::scoring::{Grade, HeuristicScorer, IssuesCount, Severity, VERIFICATION_ISSUE_ID};
use pretty_assertions::assert_eq;

fn image(needs_alt: bool) -> Image {
    Image {
        src: "https://example.com/photo.jpg".to_string(),
        visible: true,
        has_alt: !needs_alt,
        alt: if needs_alt { String::new() } else { "Photo".to_string() },
        needs_alt,
        ..Image::default()
    }
}

fn empty_link() -> Link {
    Link {
        href: "https://example.com/cart".to_string(),
        visible: true,
        is_empty: true,
        ..Link::default()
    }
}

fn heading(level: u8, text: &str) -> Heading {
    Heading {
        level,
        text: text.to_string(),
        visible: true,
        ..Heading::default()
    }
}

fn unlabelled_input() -> FormInput {
    FormInput {
        input_type: "text".to_string(),
        name: "q".to_string(),
        visible: true,
        needs_label: true,
        ..FormInput::default()
    }
}

#[test]
fn test_scenario_missing_alt_and_empty_link() {
    let mut snap = PageSnapshot::minimal("https://shop.example/", false);
    snap.images = vec![image(true), image(true), image(false)];
    snap.links = vec![empty_link()];
    snap.structure.has_main = true;
    snap.headings = vec![heading(1, "Shop"), heading(2, "New"), heading(2, "Sale")];

    let result = HeuristicScorer::score(&snap);

    // 85 - 16 - 3 + 5 + 5
    assert_eq!(result.score, 76);
    assert_eq!(result.grade, Grade::C);
    assert_eq!(result.categories.perceivable, 70);
    assert_eq!(result.categories.operable, 92);
    assert_eq!(result.categories.understandable, 100);
    assert_eq!(result.categories.robust, 90);

    let ids: Vec<&str> = result.issues.iter().map(|i| i.id.as_str()).collect();
    assert!(ids.contains(&"missing-alt-text"));
    assert!(ids.contains(&"empty-links"));
    assert!(!ids.contains(&"missing-headings"));
    assert!(!ids.contains(&"missing-landmarks"));

    let alt = result.issues.iter().find(|i| i.id == "missing-alt-text").unwrap();
    assert_eq!(alt.severity, Severity::Critical);
    assert_eq!(alt.elements.len(), 2);
}

#[test]
fn test_scenario_empty_page() {
    let result = HeuristicScorer::score(&PageSnapshot::minimal("https://blank.example/", false));
    assert_eq!(result.score, 85);
    assert_eq!(result.grade, Grade::B);
    assert_eq!(
        result.issues_count,
        IssuesCount {
            critical: 0,
            serious: 0,
            moderate: 0,
            minor: 0
        }
    );
    assert!(result.issues.is_empty());
    // structural recommendations are reported but never counted
    assert!(result.advisories.iter().any(|a| a.id == "missing-headings"));
}

#[test]
fn test_scenario_verification_page() {
    let mut snap = PageSnapshot::minimal("https://guarded.example/", true);
    snap.title = "Just a moment...".to_string();
    snap.images = vec![image(true); 3];

    let result = HeuristicScorer::score(&snap);
    assert_eq!(result.score, 30);
    assert_eq!(result.grade, Grade::D);
    assert_eq!(
        result.issues_count,
        IssuesCount {
            critical: 1,
            serious: 0,
            moderate: 0,
            minor: 0
        }
    );
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].id, VERIFICATION_ISSUE_ID);
    assert!(result.positives.is_empty());
    assert!(result.blocked);
}

#[test]
fn test_each_missing_alt_costs_eight_until_floor() {
    let mut previous = HeuristicScorer::score(&PageSnapshot::default()).score;
    for n in 1..=10 {
        let mut snap = PageSnapshot::default();
        snap.images = vec![image(true); n];
        let score = HeuristicScorer::score(&snap).score;
        let expected = previous.saturating_sub(8).max(30);
        assert_eq!(score, expected, "{} images", n);
        previous = score;
    }
}

#[test]
fn test_unlabelled_inputs() {
    let mut snap = PageSnapshot::default();
    snap.forms = vec![Form {
        inputs: vec![unlabelled_input(), unlabelled_input()],
        ..Form::default()
    }];
    let result = HeuristicScorer::score(&snap);
    assert_eq!(result.score, 65);
    assert_eq!(result.categories.operable, 80);
    let labels = result.issues.iter().find(|i| i.id == "form-labels").unwrap();
    assert_eq!(labels.severity, Severity::Serious);
    assert!(labels.wcag_criteria.contains("3.3.2"));
}

#[test]
fn test_hidden_empty_link_not_counted() {
    let mut snap = PageSnapshot::default();
    snap.links = vec![Link {
        visible: false,
        ..empty_link()
    }];
    let result = HeuristicScorer::score(&snap);
    assert_eq!(result.score, 85);
    assert!(result.issues.iter().all(|i| i.id != "empty-links"));
}

#[test]
fn test_advisories_leave_score_and_counts_alone() {
    let mut snap = PageSnapshot::default();
    snap.structure.has_nav = true;
    let result = HeuristicScorer::score(&snap);
    assert_eq!(result.score, 90);
    assert_eq!(result.issues_count.total(), 0);
    let ids: Vec<&str> = result.advisories.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["missing-headings", "missing-lang", "missing-skip-link"]);
}

#[test]
fn test_positives_for_well_built_page() {
    let mut snap = PageSnapshot::minimal("https://good.example/", false);
    snap.language = "en".to_string();
    snap.structure.has_main = true;
    snap.structure.has_nav = true;
    snap.structure.has_header = true;
    snap.structure.has_footer = true;
    snap.structure.has_skip_links = true;
    snap.structure.landmark_count = 4;
    snap.headings = vec![heading(1, "Welcome")];
    snap.images = vec![image(false)];
    snap.forms = vec![Form {
        inputs: vec![FormInput {
            has_label: true,
            visible: true,
            ..FormInput::default()
        }],
        ..Form::default()
    }];
    snap.performance.frameworks.insert("next".to_string(), true);

    let result = HeuristicScorer::score(&snap);
    assert_eq!(result.score, 100);
    assert_eq!(result.grade, Grade::A);
    assert!(result.issues.is_empty());

    let ids: Vec<&str> = result.positives.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "semantic-landmarks",
            "heading-structure",
            "skip-links",
            "page-language",
            "images-described",
            "inputs-labelled"
        ]
    );
}

#[test]
fn test_issue_counts_match_issue_list() {
    let mut snap = PageSnapshot::default();
    snap.images = vec![image(true)];
    snap.links = vec![empty_link()];
    snap.structure.has_nav = true;
    let result = HeuristicScorer::score(&snap);
    assert_eq!(result.issues_count, IssuesCount::tally(&result.issues));
    assert_eq!(result.issues_count.total() as usize, result.issues.len());
}
