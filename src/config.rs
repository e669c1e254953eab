// src/config.rs
use serde::Deserialize;

use crate::analysis::lexicon;
use crate::core::NUM_COMPETENCIES;

/// Full engine configuration, loadable from TOML. Defaults mirror the
/// deployed values, so an empty file is a valid config.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelCfg,
    pub confidence: ConfidenceCfg,
    pub analysis: AnalysisCfg,
    pub feedback: FeedbackCfg,
    pub training: TrainingCfg,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ModelCfg {
    pub version: String,
    pub ensemble_size: usize,
    /// Token sequence length L. Longer text truncates, shorter pads.
    pub seq_len: usize,
    pub vocab_size: usize,
    pub d_model: usize,
    pub n_heads: usize,
    /// Seed base for freshly initialized members (member i uses base + i).
    pub base_seed: u64,
    /// Hard budget for the SCORED stage, in milliseconds.
    pub score_budget_ms: u64,
    /// Generous ceiling for the rule path before it degrades to empty.
    pub analysis_budget_ms: u64,
}

impl Default for ModelCfg {
    fn default() -> Self {
        Self {
            version: "v1.0.0".into(),
            ensemble_size: 3,
            seq_len: 512,
            vocab_size: 8192,
            d_model: 128,
            n_heads: 4,
            base_seed: 42,
            score_budget_ms: 30_000,
            analysis_budget_ms: 15_000,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ConfidenceCfg {
    /// confidence >= high_threshold → tier "high", retrain-eligible.
    pub high_threshold: f32,
    /// confidence < low_threshold → tier "low", flagged for human review.
    pub low_threshold: f32,
    /// Concave exponent p < 1: moderate disagreement costs more than
    /// negligible disagreement.
    pub penalty_exp: f32,
}

impl Default for ConfidenceCfg {
    fn default() -> Self {
        Self {
            high_threshold: 0.85,
            low_threshold: 0.70,
            penalty_exp: 0.7,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AnalysisCfg {
    pub connectives: Vec<String>,
    pub intro_markers: Vec<String>,
    pub conclusion_markers: Vec<String>,
    pub agent_terms: Vec<String>,
    pub action_terms: Vec<String>,
    pub means_terms: Vec<String>,
    /// Distinct connective counts at which usage tiers start.
    pub connectives_sufficient: usize,
    pub connectives_adequate: usize,
    pub connectives_excellent: usize,
    /// unique/total word ratio below this costs cohesion.
    pub min_lexical_diversity: f32,
    /// Paragraphs under this many words count as short for coherence.
    pub short_paragraph_words: usize,
    /// Mean paragraph length band rewarded by coherence.
    pub paragraph_words_lo: usize,
    pub paragraph_words_hi: usize,
    /// LanguageTool-compatible endpoint, e.g. "http://localhost:8081".
    /// None disables external grammar checking entirely.
    pub grammar_endpoint: Option<String>,
    pub grammar_language: String,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            connectives: lexicon::default_connectives(),
            intro_markers: lexicon::default_intro_markers(),
            conclusion_markers: lexicon::default_conclusion_markers(),
            agent_terms: lexicon::default_agent_terms(),
            action_terms: lexicon::default_action_terms(),
            means_terms: lexicon::default_means_terms(),
            connectives_sufficient: 3,
            connectives_adequate: 5,
            connectives_excellent: 8,
            min_lexical_diversity: 0.4,
            short_paragraph_words: 15,
            paragraph_words_lo: 30,
            paragraph_words_hi: 80,
            grammar_endpoint: None,
            grammar_language: "pt-BR".into(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedbackCfg {
    /// Per-competency band cutoffs, descending:
    /// [excellent, very good, good, fair]; below the last is insufficient.
    pub competency_bands: [[f32; 4]; NUM_COMPETENCIES],
    /// Aggregate score band cutoffs, descending.
    pub aggregate_bands: [f32; 4],
    /// How many grammar findings become highlighted excerpts in C1.
    pub max_highlighted_findings: usize,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self {
            competency_bands: [[180.0, 160.0, 140.0, 120.0]; NUM_COMPETENCIES],
            aggregate_bands: [900.0, 800.0, 700.0, 600.0],
            max_highlighted_findings: 3,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrainingCfg {
    /// Below this many total candidates the selector reports
    /// "insufficient samples" instead of a partial set.
    pub min_samples: usize,
    pub max_high_confidence: usize,
    pub max_human_feedback: usize,
}

impl Default for TrainingCfg {
    fn default() -> Self {
        Self {
            min_samples: 50,
            max_high_confidence: 500,
            max_human_feedback: 200,
        }
    }
}

pub fn load_config(path: &str) -> anyhow::Result<EngineConfig> {
    let txt = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<EngineConfig>(&txt)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let cfg = EngineConfig::default();
        assert!(cfg.confidence.low_threshold < cfg.confidence.high_threshold);
        assert!(cfg.confidence.penalty_exp < 1.0);
        assert!(cfg.analysis.connectives.len() >= 8);
        assert_eq!(cfg.model.ensemble_size, 3);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            [confidence]
            high_threshold = 0.9

            [training]
            min_samples = 10
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.confidence.high_threshold, 0.9);
        assert_eq!(cfg.confidence.low_threshold, 0.70);
        assert_eq!(cfg.training.min_samples, 10);
        assert_eq!(cfg.model.seq_len, 512);
    }
}
