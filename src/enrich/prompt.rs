//! Prompt construction for the narrative pass
//!
//! The prompt is a pure function of the snapshot and the heuristic result, so
//! identical inputs always produce identical prompts.

use crate::extraction::PageSnapshot;
use crate::scoring::HeuristicScore;
use std::fmt::Write;

const RESPONSE_SHAPE: &str = r#"{
  "summary": "2-4 sentence overview of the page's accessibility",
  "issues": [
    {
      "id": "one of the issue or recommendation ids listed above",
      "type": "critical | serious | moderate | minor",
      "title": "short title",
      "description": "what is wrong on this page",
      "elements": [{ "selector": "css selector", "html": "offending markup", "suggestion": "fixed markup" }],
      "wcagCriteria": "e.g. 1.1.1 Non-text Content (Level A)",
      "impact": "who is affected and how"
    }
  ],
  "positives": [
    { "id": "one of the positive ids listed above", "title": "short title", "description": "what the page does well", "wcagCriteria": "criterion" }
  ]
}"#;

/// Builds the text half of the model request
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the prompt for one snapshot
    pub fn build(snapshot: &PageSnapshot, heuristic: &HeuristicScore) -> String {
        let mut p = String::with_capacity(4096);
        let c = &heuristic.categories;
        let n = &heuristic.issues_count;
        let s = &snapshot.structure;

        // write! into a String cannot fail
        let _ = writeln!(
            p,
            "You are a WCAG 2.1 accessibility auditor. A screenshot of the top of the page is attached."
        );
        let _ = writeln!(p);
        let _ = writeln!(p, "URL: {}", snapshot.url);
        let _ = writeln!(p, "Title: {}", snapshot.title);
        let _ = writeln!(
            p,
            "Language: {}",
            if snapshot.language.is_empty() { "(not declared)" } else { snapshot.language.as_str() }
        );
        let _ = writeln!(p);
        let _ = writeln!(p, "Automated measurements (these numbers are final; do not change or restate them differently):");
        let _ = writeln!(p, "- Score: {}/100 (grade {})", heuristic.score, heuristic.grade);
        let _ = writeln!(
            p,
            "- Categories: perceivable {}%, operable {}%, understandable {}%, robust {}%",
            c.perceivable, c.operable, c.understandable, c.robust
        );
        let _ = writeln!(
            p,
            "- Issue counts: critical {}, serious {}, moderate {}, minor {}",
            n.critical, n.serious, n.moderate, n.minor
        );
        let _ = writeln!(p);
        let _ = writeln!(p, "Page structure:");
        let _ = writeln!(
            p,
            "- Landmarks: main={}, nav={}, header={}, footer={}, aside={} ({} total), skip links={}",
            s.has_main, s.has_nav, s.has_header, s.has_footer, s.has_aside, s.landmark_count, s.has_skip_links
        );
        let _ = writeln!(p, "- Headings: {}", snapshot.headings.len());
        for h in snapshot.headings.iter().take(15) {
            let _ = writeln!(p, "  h{}: {}", h.level, h.text);
        }
        let _ = writeln!(
            p,
            "- Images: {} total, {} missing alt text",
            snapshot.images.len(),
            snapshot.images_without_alt()
        );
        let _ = writeln!(
            p,
            "- Links: {} total, {} visible without an accessible name",
            snapshot.links.len(),
            snapshot.empty_visible_links()
        );
        let _ = writeln!(
            p,
            "- Form controls: {} total, {} without labels",
            snapshot.all_inputs().count(),
            snapshot.inputs_without_labels()
        );
        let frameworks = snapshot.detected_frameworks();
        let _ = writeln!(
            p,
            "- Frameworks: {}",
            if frameworks.is_empty() { "none detected".to_string() } else { frameworks.join(", ") }
        );
        let _ = writeln!(p);

        let _ = writeln!(p, "Detected issues (keep these ids):");
        if heuristic.issues.is_empty() {
            let _ = writeln!(p, "- none");
        }
        for issue in &heuristic.issues {
            let _ = writeln!(p, "- {} [{}]: {}", issue.id, issue.severity, issue.title);
        }
        if !heuristic.advisories.is_empty() {
            let _ = writeln!(p, "Structural recommendations (not counted as issues, keep these ids):");
            for advisory in &heuristic.advisories {
                let _ = writeln!(p, "- {}: {}", advisory.id, advisory.title);
            }
        }
        let _ = writeln!(p, "Observed good practices (keep these ids):");
        if heuristic.positives.is_empty() {
            let _ = writeln!(p, "- none");
        }
        for positive in &heuristic.positives {
            let _ = writeln!(p, "- {}: {}", positive.id, positive.title);
        }
        let _ = writeln!(p);
        let _ = writeln!(
            p,
            "Write page-specific descriptions, impacts and fix suggestions for the issues and recommendations above, \
             using the screenshot for context. Respond with only a JSON object of this shape:"
        );
        p.push_str(RESPONSE_SHAPE);
        p.push('\n');
        p
    }
}
