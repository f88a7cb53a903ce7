//! Narrative enrichment
//!
//! An external multimodal model turns the heuristic findings plus the hero
//! screenshot into page-specific prose. The model only ever contributes text:
//! score, grade, categories and issue counts always come from the heuristic.
//! Any model failure degrades to the heuristic report with `error` set.

pub mod codegen;
pub mod gemini;
pub mod parse;
pub mod prompt;

pub use codegen::{CodeFixGenerator, CodeFixRequest, CodeFixResponse};
pub use gemini::GeminiClient;
pub use parse::extract_json_object;
pub use prompt::PromptBuilder;

use crate::error::Result;
use crate::extraction::PageSnapshot;
use crate::scoring::{AccessibilityReport, HeuristicScore, IssueElement, ReportSource};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crate::extraction::snapshot::lenient_list;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Image attached to a model request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    /// PNG image
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            bytes,
        }
    }

    /// Base64 payload
    pub fn base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

/// A text-generating model that accepts an optional inline image
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    /// Single request, raw reply text
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String>;
}

/// `null` reads as the type's default
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Prose-only view of the model reply. Every field is optional and may be
/// `null`; list entries that do not fit are dropped one by one.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NarrativeReply {
    #[serde(deserialize_with = "nullable")]
    summary: String,
    #[serde(deserialize_with = "lenient_list")]
    issues: Vec<NarrativeIssue>,
    #[serde(deserialize_with = "lenient_list")]
    positives: Vec<NarrativePositive>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NarrativeIssue {
    #[serde(deserialize_with = "nullable")]
    id: String,
    #[serde(deserialize_with = "nullable")]
    title: String,
    #[serde(deserialize_with = "nullable")]
    description: String,
    #[serde(deserialize_with = "lenient_list")]
    elements: Vec<NarrativeElement>,
    #[serde(deserialize_with = "nullable")]
    wcag_criteria: String,
    #[serde(deserialize_with = "nullable")]
    impact: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NarrativeElement {
    #[serde(deserialize_with = "nullable")]
    selector: String,
    #[serde(deserialize_with = "nullable")]
    html: String,
    #[serde(deserialize_with = "nullable")]
    suggestion: String,
}

impl From<NarrativeElement> for IssueElement {
    fn from(el: NarrativeElement) -> Self {
        IssueElement {
            selector: el.selector,
            html: el.html,
            suggestion: el.suggestion,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NarrativePositive {
    #[serde(deserialize_with = "nullable")]
    id: String,
    #[serde(deserialize_with = "nullable")]
    title: String,
    #[serde(deserialize_with = "nullable")]
    description: String,
    #[serde(deserialize_with = "nullable")]
    wcag_criteria: String,
}

fn set_if_present(target: &mut String, value: String) {
    if !value.trim().is_empty() {
        *target = value;
    }
}

/// Report used when the narrative pass fails
pub fn fallback_report(heuristic: &HeuristicScore, cause: impl Into<String>) -> AccessibilityReport {
    let mut cause = cause.into();
    if cause.trim().is_empty() {
        cause = "narrative enrichment failed".to_string();
    }
    heuristic.to_report(Some(cause))
}

/// Overlay the model's prose onto the heuristic report.
///
/// Issues, advisories and positives are matched by id; an issue or positive
/// without an id takes the id at the same position in the heuristic list. Entries that match nothing
/// are dropped so the lists stay consistent with `issuesCount`.
fn merge(heuristic: &HeuristicScore, reply: NarrativeReply) -> AccessibilityReport {
    let mut report = heuristic.to_report(None);
    report.source = ReportSource::Ai;
    set_if_present(&mut report.summary, reply.summary);

    for (position, ai) in reply.issues.into_iter().enumerate() {
        let id = if ai.id.trim().is_empty() {
            match heuristic.issues.get(position) {
                Some(issue) => issue.id.clone(),
                None => continue,
            }
        } else {
            ai.id
        };
        let target = report
            .issues
            .iter_mut()
            .chain(report.advisories.iter_mut())
            .find(|i| i.id == id);
        if let Some(issue) = target {
            set_if_present(&mut issue.title, ai.title);
            set_if_present(&mut issue.description, ai.description);
            set_if_present(&mut issue.impact, ai.impact);
            set_if_present(&mut issue.wcag_criteria, ai.wcag_criteria);
            if !ai.elements.is_empty() {
                issue.elements = ai
                    .elements
                    .into_iter()
                    .take(crate::scoring::heuristic::MAX_ISSUE_ELEMENTS)
                    .map(IssueElement::from)
                    .collect();
            }
        }
    }

    for (position, ai) in reply.positives.into_iter().enumerate() {
        let id = if ai.id.trim().is_empty() {
            match heuristic.positives.get(position) {
                Some(p) => p.id.clone(),
                None => continue,
            }
        } else {
            ai.id
        };
        if let Some(positive) = report.positives.iter_mut().find(|p| p.id == id) {
            set_if_present(&mut positive.title, ai.title);
            set_if_present(&mut positive.description, ai.description);
            set_if_present(&mut positive.wcag_criteria, ai.wcag_criteria);
        }
    }

    report
}

/// Turns heuristic results into the final report
#[derive(Clone, Default)]
pub struct NarrativeEnricher {
    model: Option<Arc<dyn TextModel>>,
}

impl NarrativeEnricher {
    /// Enricher backed by a model
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Enricher that never calls a model
    pub fn disabled() -> Self {
        Self { model: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// The backing model, when enabled
    pub fn model(&self) -> Option<Arc<dyn TextModel>> {
        self.model.clone()
    }

    /// Produce the final report. Never fails.
    #[instrument(skip_all, fields(url = %snapshot.url))]
    pub async fn enrich(
        &self,
        snapshot: &PageSnapshot,
        heuristic: &HeuristicScore,
        hero_png: &[u8],
    ) -> AccessibilityReport {
        let Some(model) = self.model.as_ref() else {
            return heuristic.to_report(None);
        };
        if heuristic.blocked {
            info!("Verification page, skipping narrative pass");
            return heuristic.to_report(None);
        }

        let prompt = PromptBuilder::build(snapshot, heuristic);
        let image = (!hero_png.is_empty()).then(|| InlineImage::png(hero_png.to_vec()));

        let reply = match model.generate(&prompt, image.as_ref()).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Narrative pass failed: {}", e);
                return fallback_report(heuristic, e.to_string());
            }
        };

        match extract_json_object::<NarrativeReply>(&reply) {
            Ok(parsed) => {
                info!("Narrative pass merged");
                merge(heuristic, parsed)
            }
            Err(e) => {
                warn!("Narrative reply unusable: {}", e);
                fallback_report(heuristic, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EnrichmentError, Error};
    use crate::scoring::HeuristicScorer;
    use pretty_assertions::assert_eq;

    struct Scripted(std::result::Result<String, String>);

    #[async_trait::async_trait]
    impl TextModel for Scripted {
        async fn generate(&self, _prompt: &str, _image: Option<&InlineImage>) -> Result<String> {
            self.0
                .clone()
                .map_err(|m| Error::from(EnrichmentError::Request(m)))
        }
    }

    fn enricher(reply: std::result::Result<&str, &str>) -> NarrativeEnricher {
        NarrativeEnricher::new(Arc::new(Scripted(
            reply.map(str::to_string).map_err(str::to_string),
        )))
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back() {
        let snap = PageSnapshot::minimal("https://example.com/", false);
        let heuristic = HeuristicScorer::score(&snap);
        let report = enricher(Err("connection refused")).enrich(&snap, &heuristic, b"png").await;
        assert_eq!(report.source, ReportSource::Heuristic);
        assert!(report.error.as_deref().unwrap_or("").contains("connection refused"));
        assert_eq!(report.score, heuristic.score);
    }

    fn page_missing_alt() -> PageSnapshot {
        let mut snap = PageSnapshot::minimal("https://example.com/", false);
        snap.images.push(crate::extraction::Image {
            src: "/hero.jpg".into(),
            visible: true,
            ..Default::default()
        });
        snap.normalize();
        snap
    }

    #[tokio::test]
    async fn test_positional_id_matching() {
        let snap = page_missing_alt();
        let heuristic = HeuristicScorer::score(&snap);
        let first = heuristic.issues[0].id.clone();
        let report = enricher(Ok(r#"{"summary":"s","issues":[{"description":"custom"}]}"#))
            .enrich(&snap, &heuristic, b"")
            .await;
        let issue = report.issues.iter().find(|i| i.id == first).unwrap();
        assert_eq!(issue.description, "custom");
        assert_eq!(report.summary, "s");
    }

    #[tokio::test]
    async fn test_null_fields_keep_prose() {
        let snap = page_missing_alt();
        let heuristic = HeuristicScorer::score(&snap);
        let reply = r#"{"summary":"Page-specific prose","issues":[
            {"id":"missing-lang","title":"Lang","impact":null,"elements":null},
            {"id":"missing-alt-text","title":"Hero photo has no alt","wcagCriteria":null,
             "elements":[{"selector":"img.hero","html":null,"suggestion":"<img alt=\"Team photo\">"}]},
            {"id":42}
        ],"positives":null}"#;
        let report = enricher(Ok(reply)).enrich(&snap, &heuristic, b"").await;

        assert_eq!(report.source, ReportSource::Ai);
        assert!(report.error.is_none());
        assert_eq!(report.summary, "Page-specific prose");
        let lang = report.advisories.iter().find(|a| a.id == "missing-lang").unwrap();
        assert_eq!(lang.title, "Lang");
        assert!(!lang.impact.is_empty());
        let alt = report.issues.iter().find(|i| i.id == "missing-alt-text").unwrap();
        assert_eq!(alt.title, "Hero photo has no alt");
        assert_eq!(alt.wcag_criteria, heuristic.issues[0].wcag_criteria);
        assert_eq!(alt.elements[0].selector, "img.hero");
        assert_eq!(alt.elements[0].html, "");
        assert_eq!(report.issues_count, heuristic.issues_count);
    }

    #[tokio::test]
    async fn test_disabled_enricher_is_heuristic() {
        let snap = PageSnapshot::minimal("https://example.com/", false);
        let heuristic = HeuristicScorer::score(&snap);
        let report = NarrativeEnricher::disabled().enrich(&snap, &heuristic, b"").await;
        assert_eq!(report, heuristic.to_report(None));
    }

    #[test]
    fn test_fallback_error_never_empty() {
        let heuristic = HeuristicScorer::score(&PageSnapshot::default());
        let report = fallback_report(&heuristic, "");
        assert!(!report.error.unwrap().is_empty());
    }
}
