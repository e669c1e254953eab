// src/corrector/orchestrator.rs
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{info, warn};

use crate::analysis::{AnalysisReport, LinguisticAnalyzer};
use crate::config::EngineConfig;
use crate::core::{
    CompetencyScore, ConfidenceTier, Correction, Essay, Explanation, HumanFeedback,
};
use crate::encoder::Encoder;
use crate::ensemble::{Ensemble, EnsemblePrediction};
use crate::error::CorrectionError;
use crate::explain::Explainer;
use crate::feedback::FeedbackSynthesizer;
use crate::storage::CorrectionStore;

/// Lifecycle of one correction request. Transitions are logged, never
/// stored; the Correction row is the durable artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Received,
    Encoded,
    Scored,
    Analyzed,
    Synthesized,
    Persisted,
    FlaggedForRetrain,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Encoded => "encoded",
            Stage::Scored => "scored",
            Stage::Analyzed => "analyzed",
            Stage::Synthesized => "synthesized",
            Stage::Persisted => "persisted",
            Stage::FlaggedForRetrain => "flagged_for_retrain",
        }
    }
}

/// Static facts about the loaded ensemble, for health/info surfaces.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ModelInfo {
    pub version: String,
    pub ensemble_size: usize,
    pub seq_len: usize,
    pub vocab_size: usize,
    pub competencies: usize,
}

/// Drives one essay through encode, ensemble scoring, linguistic
/// analysis, explanation and feedback synthesis, then persists the
/// resulting immutable Correction.
///
/// The ML lane and the rule lane run concurrently and fail
/// independently: a dead model is fatal, a dead grammar resource only
/// degrades the findings.
pub struct Corrector {
    encoder: Encoder,
    ensemble: Arc<Ensemble>,
    analyzer: Arc<LinguisticAnalyzer>,
    explainer: Explainer,
    synthesizer: FeedbackSynthesizer,
    store: Arc<dyn CorrectionStore>,
    cfg: EngineConfig,
}

impl Corrector {
    pub fn new(
        encoder: Encoder,
        ensemble: Arc<Ensemble>,
        analyzer: Arc<LinguisticAnalyzer>,
        explainer: Explainer,
        synthesizer: FeedbackSynthesizer,
        store: Arc<dyn CorrectionStore>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            encoder,
            ensemble,
            analyzer,
            explainer,
            synthesizer,
            store,
            cfg,
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            version: self.ensemble.version().to_string(),
            ensemble_size: self.ensemble.len(),
            seq_len: self.cfg.model.seq_len,
            vocab_size: self.cfg.model.vocab_size,
            competencies: crate::core::NUM_COMPETENCIES,
        }
    }

    fn stage(&self, stage: Stage, essay_id: &str) {
        info!(stage = stage.as_str(), essay_id, "correction stage");
    }

    /// Scores one essay end to end. The essay is persisted before any
    /// scoring work so a failed correction never loses the submission.
    pub fn correct(&self, essay: &Essay) -> Result<Correction, CorrectionError> {
        let started = Instant::now();
        self.stage(Stage::Received, &essay.id);
        self.store.put_essay(essay)?;

        let encoded = self.encoder.encode(&essay.text);
        self.stage(Stage::Encoded, &essay.id);

        // Rule lane starts first; it only needs the raw text and runs
        // while the ensemble scores.
        let (analysis_tx, analysis_rx) = bounded::<AnalysisReport>(1);
        {
            let analyzer = Arc::clone(&self.analyzer);
            let text = essay.text.clone();
            thread::spawn(move || {
                let _ = analysis_tx.send(analyzer.analyze(&text));
            });
        }

        let (score_tx, score_rx) = bounded::<Result<EnsemblePrediction, CorrectionError>>(1);
        {
            let ensemble = Arc::clone(&self.ensemble);
            let encoded = encoded.clone();
            thread::spawn(move || {
                let _ = score_tx.send(ensemble.predict(&encoded));
            });
        }

        let score_budget = Duration::from_millis(self.cfg.model.score_budget_ms);
        let prediction = match score_rx.recv_timeout(score_budget) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                return Err(CorrectionError::ModelTimeout(score_budget))
            }
            // A dropped sender means the scoring thread died without a
            // result. Structural, not transient.
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CorrectionError::ModelUnavailable)
            }
        };
        self.stage(Stage::Scored, &essay.id);

        let analysis_budget = Duration::from_millis(self.cfg.model.analysis_budget_ms);
        let report = match analysis_rx.recv_timeout(analysis_budget) {
            Ok(report) => report,
            Err(_) => {
                warn!(essay_id = %essay.id, "analysis lane exceeded budget; degrading");
                AnalysisReport {
                    findings: Vec::new(),
                    orthography_errors: 0,
                    grammar_errors: 0,
                    structure: self.analyzer.structure(&essay.text),
                    degraded: true,
                }
            }
        };
        self.stage(Stage::Analyzed, &essay.id);

        let explanation = self.explain(&essay.text);

        let competencies: Vec<CompetencyScore> = prediction
            .competency_mean
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                self.synthesizer.competency_feedback(
                    (i + 1) as u8,
                    value.round(),
                    &essay.text,
                    &report,
                )
            })
            .collect();

        let aggregate = prediction.aggregate_mean.round();
        let overall_feedback = self.synthesizer.overall_feedback(
            aggregate,
            &competencies,
            prediction.confidence,
            self.cfg.confidence.low_threshold,
        );
        let summary = self.synthesizer.summary(aggregate);
        self.stage(Stage::Synthesized, &essay.id);

        let retrain_eligible = prediction.confidence_tier == ConfidenceTier::High;
        let needs_human_review = prediction.confidence_tier == ConfidenceTier::Low;

        let correction = Correction {
            id: uuid::Uuid::new_v4().to_string(),
            essay_id: essay.id.clone(),
            aggregate,
            competencies,
            uncertainty: prediction.uncertainty,
            confidence: prediction.confidence,
            confidence_tier: prediction.confidence_tier,
            findings: report.findings,
            orthography_errors: report.orthography_errors,
            grammar_errors: report.grammar_errors,
            structure: report.structure,
            overall_feedback,
            summary,
            explanation,
            analysis_degraded: report.degraded,
            model_version: self.ensemble.version().to_string(),
            latency_ms: started.elapsed().as_millis() as u64,
            created_at: chrono::Utc::now(),
            retrain_eligible,
            needs_human_review,
        };

        self.store.put_correction(&correction)?;
        self.stage(Stage::Persisted, &essay.id);

        if retrain_eligible {
            self.stage(Stage::FlaggedForRetrain, &essay.id);
        }
        if needs_human_review {
            info!(essay_id = %essay.id, confidence = correction.confidence, "flagged for human review");
        }

        Ok(correction)
    }

    /// Best effort: an ensemble without the attention capability, or a
    /// failed explanation, yields None instead of failing the correction.
    fn explain(&self, text: &str) -> Option<Explanation> {
        let member = self.ensemble.explaining_member()?;
        match self.explainer.explain(&self.encoder, member, text) {
            Ok(explanation) => Some(explanation),
            Err(e) => {
                warn!(error = %e, "explanation skipped");
                None
            }
        }
    }

    /// Records teacher-corrected scores against an existing correction.
    pub fn record_human_feedback(&self, feedback: &HumanFeedback) -> Result<(), CorrectionError> {
        self.store.put_human_feedback(feedback)?;
        info!(
            correction_id = %feedback.correction_id,
            reviewer_id = %feedback.reviewer_id,
            "human feedback recorded"
        );
        Ok(())
    }
}
