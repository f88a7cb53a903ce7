//! Accessible code fixes for a single issue
//!
//! The caller posts one issue from a report together with the markup that
//! triggered it. The model answers with a primary fix, alternatives, testing
//! guidance and references, decoded as leniently as the narrative reply.

use super::{extract_json_object, nullable, TextModel};
use crate::error::{ConfigError, Result};
use crate::extraction::snapshot::lenient_list;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Framework assumed when the request names none
pub const DEFAULT_FRAMEWORK: &str = "html";

/// The issue being fixed, as it appears in a report
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeFixIssue {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub wcag_criteria: String,
}

/// Body of `POST /api/generate-code`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeFixRequest {
    pub issue: Option<CodeFixIssue>,
    #[serde(deserialize_with = "nullable")]
    pub current_code: String,
    pub framework: Option<String>,
}

impl CodeFixRequest {
    /// Both an issue with a title and the current markup are required
    pub fn validate(&self) -> Result<()> {
        if self.issue.as_ref().map_or(true, |i| i.title.trim().is_empty()) {
            return Err(ConfigError::MissingField("issue").into());
        }
        if self.current_code.trim().is_empty() {
            return Err(ConfigError::MissingField("currentCode").into());
        }
        Ok(())
    }

    pub fn framework(&self) -> &str {
        self.framework
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FRAMEWORK)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrimarySolution {
    #[serde(deserialize_with = "nullable")]
    pub code: String,
    #[serde(deserialize_with = "nullable")]
    pub explanation: String,
    #[serde(deserialize_with = "nullable")]
    pub additional_notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativeSolution {
    #[serde(deserialize_with = "nullable")]
    pub code: String,
    #[serde(deserialize_with = "nullable")]
    pub explanation: String,
    #[serde(deserialize_with = "lenient_list")]
    pub pros: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub cons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestingGuidance {
    #[serde(deserialize_with = "lenient_list")]
    pub manual: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub automated: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub screen_readers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedResource {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub url: String,
    /// documentation, tutorial or tool
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
}

/// Model-authored fix set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeFixSolutions {
    #[serde(deserialize_with = "nullable")]
    pub primary_solution: PrimarySolution,
    #[serde(deserialize_with = "lenient_list")]
    pub alternative_solutions: Vec<AlternativeSolution>,
    #[serde(deserialize_with = "lenient_list")]
    pub best_practices: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub testing_guidance: TestingGuidance,
    #[serde(deserialize_with = "lenient_list")]
    pub related_resources: Vec<RelatedResource>,
}

/// Response of `POST /api/generate-code`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFixResponse {
    pub success: bool,
    /// Title of the issue that was fixed
    pub issue: String,
    pub framework: String,
    pub solutions: CodeFixSolutions,
    pub timestamp: DateTime<Utc>,
}

const RESPONSE_SHAPE: &str = r#"{
  "primarySolution": {
    "code": "<fixed code>",
    "explanation": "<what was changed and why>",
    "additionalNotes": "<any important notes>"
  },
  "alternativeSolutions": [
    {
      "code": "<alternative fix>",
      "explanation": "<when to use this approach>",
      "pros": ["<advantage>"],
      "cons": ["<disadvantage>"]
    }
  ],
  "bestPractices": ["<practice>"],
  "testingGuidance": {
    "manual": ["<manual check>"],
    "automated": ["<tool>"],
    "screenReaders": ["<NVDA check>", "<JAWS check>", "<VoiceOver check>"]
  },
  "relatedResources": [
    { "title": "<resource title>", "url": "<resource URL>", "type": "documentation|tutorial|tool" }
  ]
}"#;

/// Prompt for one fix request
pub fn build_prompt(request: &CodeFixRequest) -> String {
    let issue = request.issue.clone().unwrap_or_default();
    let mut prompt = String::with_capacity(2048);
    prompt.push_str("You are an expert accessibility developer. Generate accessible code to fix the following issue.\n\n");
    prompt.push_str(&format!("Issue: {}\n", issue.title));
    prompt.push_str(&format!("Description: {}\n", issue.description));
    prompt.push_str(&format!("WCAG Criteria: {}\n", issue.wcag_criteria));
    prompt.push_str(&format!("Framework: {}\n", request.framework()));
    prompt.push_str("Current Code:\n");
    prompt.push_str(&request.current_code);
    prompt.push_str("\n\nThe fix must be fully accessible, follow current best practice, and carry comments ");
    prompt.push_str("explaining each change. Offer alternative solutions where they exist.\n\n");
    prompt.push_str("Respond with a single JSON object and nothing else, in this shape:\n");
    prompt.push_str(RESPONSE_SHAPE);
    prompt.push('\n');
    prompt
}

/// Asks the model for a fix set
#[derive(Clone)]
pub struct CodeFixGenerator {
    model: Arc<dyn TextModel>,
}

impl CodeFixGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Validate, call the model once and decode its reply.
    ///
    /// Unlike the narrative pass there is no heuristic to fall back to, so a
    /// model or parse failure is returned to the caller.
    #[instrument(skip_all)]
    pub async fn generate(&self, request: &CodeFixRequest) -> Result<CodeFixResponse> {
        request.validate()?;
        let prompt = build_prompt(request);
        let reply = self.model.generate(&prompt, None).await?;
        let solutions: CodeFixSolutions = extract_json_object(&reply)?;

        let issue = request.issue.as_ref().map(|i| i.title.clone()).unwrap_or_default();
        info!("Generated code fix for '{}'", issue);
        Ok(CodeFixResponse {
            success: true,
            issue,
            framework: request.framework().to_string(),
            solutions,
            timestamp: Utc::now(),
        })
    }
}
