// src/analysis/analyzer.rs
use regex::Regex;
use tracing::{info, warn};

use crate::analysis::grammar::{GrammarService, LanguageToolClient};
use crate::analysis::lexicon;
use crate::config::AnalysisCfg;
use crate::core::{
    ConnectiveUsage, FindingCategory, GrammarFinding, StructuralProfile,
};

/// Everything the rule path knows about one essay.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    pub findings: Vec<GrammarFinding>,
    pub orthography_errors: usize,
    pub grammar_errors: usize,
    pub structure: StructuralProfile,
    /// True when the external grammar resource was absent or failed and
    /// findings degraded to empty. Never fails the correction, but the
    /// degradation stays observable.
    pub degraded: bool,
}

/// Rule-based discourse/grammar pipeline, fully independent of the ML
/// path: paragraph structure, connective usage, cohesion/coherence
/// proxies, plus findings from the optional external grammar service.
pub struct LinguisticAnalyzer {
    cfg: AnalysisCfg,
    grammar: Option<Box<dyn GrammarService>>,
    paragraph_split: Regex,
}

impl LinguisticAnalyzer {
    pub fn new(cfg: AnalysisCfg) -> Self {
        let grammar: Option<Box<dyn GrammarService>> = match &cfg.grammar_endpoint {
            Some(endpoint) => match LanguageToolClient::new(endpoint, &cfg.grammar_language) {
                Ok(client) => {
                    info!(endpoint, "grammar service configured");
                    Some(Box::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "grammar service unavailable; findings will be empty");
                    None
                }
            },
            None => None,
        };
        Self::with_grammar_service(cfg, grammar)
    }

    pub fn with_grammar_service(
        cfg: AnalysisCfg,
        grammar: Option<Box<dyn GrammarService>>,
    ) -> Self {
        Self {
            cfg,
            grammar,
            // Blank line, or sentence end followed by a newline.
            paragraph_split: Regex::new(r"\n\s*\n|\.\s*\n").expect("paragraph regex"),
        }
    }

    /// Never fails: a broken grammar resource degrades to empty findings.
    pub fn analyze(&self, text: &str) -> AnalysisReport {
        let (findings, degraded) = self.check_grammar(text);
        let orthography_errors = findings
            .iter()
            .filter(|f| f.category == FindingCategory::Orthography)
            .count();
        let grammar_errors = findings.len() - orthography_errors;

        let structure = self.structure(text);

        info!(
            findings = findings.len(),
            paragraphs = structure.paragraph_count,
            degraded,
            "linguistic analysis completed"
        );

        AnalysisReport {
            findings,
            orthography_errors,
            grammar_errors,
            structure,
            degraded,
        }
    }

    fn check_grammar(&self, text: &str) -> (Vec<GrammarFinding>, bool) {
        match &self.grammar {
            None => (Vec::new(), true),
            Some(service) => match service.check(text) {
                Ok(findings) => (findings, false),
                Err(e) => {
                    warn!(error = %e, "grammar check failed; degrading to empty findings");
                    (Vec::new(), true)
                }
            },
        }
    }

    pub fn structure(&self, text: &str) -> StructuralProfile {
        let paragraphs = self.paragraphs(text);
        let paragraph_count = paragraphs.len();
        let lower = text.to_lowercase();

        let has_intro = paragraphs
            .first()
            .map(|p| lexicon::contains_any(&p.to_lowercase(), &self.cfg.intro_markers))
            .unwrap_or(false);

        // At least one introduction plus two development paragraphs.
        let has_development = paragraph_count >= 3;

        let has_conclusion = paragraph_count >= 2
            && paragraphs
                .last()
                .map(|p| lexicon::contains_any(&p.to_lowercase(), &self.cfg.conclusion_markers))
                .unwrap_or(false);

        let connective_count = lexicon::count_present(&lower, &self.cfg.connectives);

        StructuralProfile {
            has_intro,
            has_development,
            has_conclusion,
            paragraph_count,
            connective_usage: self.connective_tier(connective_count),
            cohesion: self.cohesion(&lower, connective_count),
            coherence: self.coherence(&paragraphs),
        }
    }

    pub fn paragraphs(&self, text: &str) -> Vec<String> {
        self.paragraph_split
            .split(text)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect()
    }

    fn connective_tier(&self, count: usize) -> ConnectiveUsage {
        if count >= self.cfg.connectives_excellent {
            ConnectiveUsage::Excellent
        } else if count >= self.cfg.connectives_adequate {
            ConnectiveUsage::Adequate
        } else if count >= self.cfg.connectives_sufficient {
            ConnectiveUsage::Sufficient
        } else {
            ConnectiveUsage::Insufficient
        }
    }

    /// Base 0.5, bounded bonus from connective density, penalty when the
    /// unique/total word ratio drops below the configured floor.
    fn cohesion(&self, text_lower: &str, connective_count: usize) -> f32 {
        let mut score = 0.5f32;
        score += (connective_count as f32 / 10.0).min(0.3);

        let words: Vec<&str> = text_lower.split_whitespace().collect();
        if !words.is_empty() {
            let unique: std::collections::HashSet<&str> = words.iter().copied().collect();
            let diversity = unique.len() as f32 / words.len() as f32;
            if diversity < self.cfg.min_lexical_diversity {
                score -= 0.2;
            }
        }

        score.clamp(0.0, 1.0)
    }

    /// Base 0.5, bonus for enough paragraphs and a healthy mean paragraph
    /// length, penalty when most paragraphs are stubs.
    fn coherence(&self, paragraphs: &[String]) -> f32 {
        let mut score = 0.5f32;

        if paragraphs.len() >= 4 {
            score += 0.2;
        } else if paragraphs.len() >= 3 {
            score += 0.1;
        }

        let lengths: Vec<usize> = paragraphs
            .iter()
            .map(|p| p.split_whitespace().count())
            .collect();
        if !lengths.is_empty() {
            let mean = lengths.iter().sum::<usize>() as f32 / lengths.len() as f32;
            if mean >= self.cfg.paragraph_words_lo as f32
                && mean <= self.cfg.paragraph_words_hi as f32
            {
                score += 0.1;
            }

            let short = lengths
                .iter()
                .filter(|&&l| l < self.cfg.short_paragraph_words)
                .count();
            if short * 2 > lengths.len() {
                score -= 0.2;
            }
        }

        score.clamp(0.0, 1.0)
    }
}
