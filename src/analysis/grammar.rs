// src/analysis/grammar.rs
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::{FindingCategory, GrammarFinding};
use crate::error::CorrectionError;

/// External grammar-checking collaborator. Optional: when absent or
/// failing, analysis degrades to empty findings instead of failing the
/// correction.
pub trait GrammarService: Send + Sync {
    fn check(&self, text: &str) -> Result<Vec<GrammarFinding>, CorrectionError>;
}

/// Blocking client for a LanguageTool-compatible `/v2/check` endpoint.
pub struct LanguageToolClient {
    endpoint: String,
    language: String,
    http: reqwest::blocking::Client,
}

impl LanguageToolClient {
    pub fn new(endpoint: impl Into<String>, language: impl Into<String>) -> Result<Self, CorrectionError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CorrectionError::AnalysisUnavailable(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            language: language.into(),
            http,
        })
    }
}

#[derive(Deserialize)]
struct LtResponse {
    matches: Vec<LtMatch>,
}

#[derive(Deserialize)]
struct LtMatch {
    message: String,
    offset: usize,
    length: usize,
    context: LtContext,
    replacements: Vec<LtReplacement>,
    rule: LtRule,
}

#[derive(Deserialize)]
struct LtContext {
    text: String,
}

#[derive(Deserialize)]
struct LtReplacement {
    value: String,
}

#[derive(Deserialize)]
struct LtRule {
    id: String,
    #[serde(rename = "issueType", default)]
    issue_type: String,
}

impl LtMatch {
    fn category(&self) -> FindingCategory {
        let rule = self.rule.id.to_ascii_lowercase();
        if self.rule.issue_type == "misspelling"
            || rule.contains("spell")
            || rule.starts_with("morfologik")
        {
            FindingCategory::Orthography
        } else {
            FindingCategory::Grammar
        }
    }
}

impl GrammarService for LanguageToolClient {
    fn check(&self, text: &str) -> Result<Vec<GrammarFinding>, CorrectionError> {
        let url = format!("{}/v2/check", self.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .map_err(|e| CorrectionError::AnalysisUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| CorrectionError::AnalysisUnavailable(e.to_string()))?;

        let parsed: LtResponse = response
            .json()
            .map_err(|e| CorrectionError::AnalysisUnavailable(e.to_string()))?;

        let findings = parsed
            .matches
            .into_iter()
            .map(|m| GrammarFinding {
                category: m.category(),
                excerpt: m.context.text.clone(),
                replacement: m.replacements.first().map(|r| r.value.clone()),
                span: (m.offset, m.offset + m.length),
                message: m.message,
            })
            .collect::<Vec<_>>();

        debug!(findings = findings.len(), "grammar check completed");
        Ok(findings)
    }
}
