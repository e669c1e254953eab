// Core domain types both the ML path and the rule path can see.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of rubric competencies. Each is scored 0..=200; the aggregate
/// score is predicted independently on 0..=1000 (multi-task heads, no
/// reconciliation between the two).
pub const NUM_COMPETENCIES: usize = 5;
pub const COMPETENCY_RANGE: f32 = 200.0;
pub const AGGREGATE_RANGE: f32 = 1000.0;

/// A submitted essay. Immutable once created; a re-score produces a new
/// Correction, never a mutated Essay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Essay {
    pub id: String,
    pub text: String,
    pub title: Option<String>,
    pub prompt_id: Option<i64>,
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Essay {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            title: None,
            prompt_id: None,
            author_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Fixed-length token representation of one essay. Ephemeral: built per
/// request, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedEssay {
    pub token_ids: Vec<usize>,
    /// 1 for real tokens (including the aggregation slot), 0 for padding.
    pub attention_mask: Vec<u8>,
}

/// Raw output of one ensemble member for one encoded essay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScorePrediction {
    pub competencies: [f32; NUM_COMPETENCIES],
    pub aggregate: f32,
}

/// Capability interface every ensemble member satisfies. `score` is
/// mandatory; `attention` is an optional capability: architectures
/// without an internal attention concept simply decline to explain.
pub trait Scorer: Send + Sync {
    fn score(&self, encoded: &EncodedEssay) -> ScorePrediction;

    /// Head-averaged last-layer attention assigned from the aggregation
    /// slot to every position, or None if the member cannot report it.
    fn attention(&self, _encoded: &EncodedEssay) -> Option<Vec<f32>> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

/// Per-output population std across ensemble members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UncertaintyEstimate {
    pub competency_std: [f32; NUM_COMPETENCIES],
    pub aggregate_std: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    Orthography,
    Grammar,
}

/// One grammar or spelling finding from the rule path. Produced fresh per
/// analysis call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrammarFinding {
    pub category: FindingCategory,
    pub message: String,
    pub excerpt: String,
    pub replacement: Option<String>,
    /// Byte offsets [start, end) into the analyzed text.
    pub span: (usize, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectiveUsage {
    Insufficient,
    Sufficient,
    Adequate,
    Excellent,
}

impl ConnectiveUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectiveUsage::Insufficient => "insuficiente",
            ConnectiveUsage::Sufficient => "suficiente",
            ConnectiveUsage::Adequate => "adequado",
            ConnectiveUsage::Excellent => "excelente",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructuralProfile {
    pub has_intro: bool,
    pub has_development: bool,
    pub has_conclusion: bool,
    pub paragraph_count: usize,
    pub connective_usage: ConnectiveUsage,
    pub cohesion: f32,
    pub coherence: f32,
}

/// A text excerpt surfaced to the student inside competency feedback.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Highlight {
    pub excerpt: String,
    pub kind: String,
    pub note: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompetencyScore {
    /// 1..=5.
    pub index: u8,
    /// 0..=200, rounded to a whole number.
    pub value: f32,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub highlights: Vec<Highlight>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenImportance {
    pub token: String,
    pub weight: f32,
    pub position: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpanImportance {
    pub excerpt: String,
    pub weight: f32,
}

/// Interpretability output. Optional: a failed explanation is omitted,
/// never fatal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Explanation {
    pub tokens: Vec<TokenImportance>,
    pub spans: Vec<SpanImportance>,
    pub summary: String,
}

/// One immutable correction per scoring request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Correction {
    pub id: String,
    pub essay_id: String,
    /// 0..=1000, predicted independently of the five competencies.
    pub aggregate: f32,
    pub competencies: Vec<CompetencyScore>,
    pub uncertainty: UncertaintyEstimate,
    pub confidence: f32,
    pub confidence_tier: ConfidenceTier,
    pub findings: Vec<GrammarFinding>,
    pub orthography_errors: usize,
    pub grammar_errors: usize,
    pub structure: StructuralProfile,
    pub overall_feedback: String,
    pub summary: String,
    pub explanation: Option<Explanation>,
    /// True when the grammar resource was down and findings degraded to
    /// empty. Kept so degradations stay observable downstream.
    pub analysis_degraded: bool,
    pub model_version: String,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
    pub retrain_eligible: bool,
    pub needs_human_review: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    HighConfidenceInference,
    HumanFeedback,
}

/// Essay + target scores selected for a future retraining run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingCandidate {
    pub essay_text: String,
    pub competencies: [f32; NUM_COMPETENCIES],
    pub aggregate: f32,
    pub provenance: Provenance,
}

/// Teacher-corrected scores for a previously emitted correction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HumanFeedback {
    pub id: String,
    pub correction_id: String,
    pub reviewer_id: String,
    pub competencies: [f32; NUM_COMPETENCIES],
    pub aggregate: f32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HumanFeedback {
    pub fn new(
        correction_id: impl Into<String>,
        reviewer_id: impl Into<String>,
        competencies: [f32; NUM_COMPETENCIES],
        aggregate: f32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            correction_id: correction_id.into(),
            reviewer_id: reviewer_id.into(),
            competencies,
            aggregate,
            comment: None,
            created_at: Utc::now(),
        }
    }
}
