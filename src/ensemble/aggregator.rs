// src/ensemble/aggregator.rs
use std::thread;

use tracing::debug;

use crate::config::ConfidenceCfg;
use crate::core::{
    ConfidenceTier, EncodedEssay, ScorePrediction, Scorer, UncertaintyEstimate, AGGREGATE_RANGE,
    COMPETENCY_RANGE, NUM_COMPETENCIES,
};
use crate::error::CorrectionError;

/// Statistically combined output of all ensemble members.
#[derive(Clone, Debug)]
pub struct EnsemblePrediction {
    pub competency_mean: [f32; NUM_COMPETENCIES],
    pub aggregate_mean: f32,
    pub uncertainty: UncertaintyEstimate,
    pub confidence: f32,
    pub confidence_tier: ConfidenceTier,
    pub members: usize,
}

/// A fixed collection of independently parameterized scorers behind the
/// `Scorer` capability interface. Members share no mutable state; each
/// `score` call reads only immutable parameters, so inference fans out
/// across scoped threads.
pub struct Ensemble {
    members: Vec<Box<dyn Scorer>>,
    version: String,
    cfg: ConfidenceCfg,
}

impl Ensemble {
    pub fn new(members: Vec<Box<dyn Scorer>>, version: impl Into<String>, cfg: ConfidenceCfg) -> Self {
        Self {
            members,
            version: version.into(),
            cfg,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The member whose internals back the explanation step, when any
    /// member exposes the attention capability.
    pub fn explaining_member(&self) -> Option<&dyn Scorer> {
        self.members.first().map(|m| m.as_ref())
    }

    /// Runs every member on the encoded essay and combines their outputs.
    ///
    /// Zero members is `ModelUnavailable`, never a zero-confidence guess.
    /// Identical member parameters + identical input reproduce the output
    /// bit-for-bit: there is no randomness at inference.
    pub fn predict(&self, encoded: &EncodedEssay) -> Result<EnsemblePrediction, CorrectionError> {
        if self.members.is_empty() {
            return Err(CorrectionError::ModelUnavailable);
        }

        let predictions: Vec<ScorePrediction> = thread::scope(|s| {
            let handles: Vec<_> = self
                .members
                .iter()
                .map(|member| s.spawn(move || member.score(encoded)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("scorer thread panicked"))
                .collect()
        });

        let n = predictions.len() as f32;

        let mut competency_mean = [0.0f32; NUM_COMPETENCIES];
        let mut competency_std = [0.0f32; NUM_COMPETENCIES];
        for i in 0..NUM_COMPETENCIES {
            let values: Vec<f32> = predictions.iter().map(|p| p.competencies[i]).collect();
            competency_mean[i] = values.iter().sum::<f32>() / n;
            competency_std[i] = population_std(&values, competency_mean[i]);
        }

        let agg_values: Vec<f32> = predictions.iter().map(|p| p.aggregate).collect();
        let aggregate_mean = agg_values.iter().sum::<f32>() / n;
        let aggregate_std = population_std(&agg_values, aggregate_mean);

        let confidence = self.confidence(&competency_std, aggregate_std);
        let confidence_tier = self.tier(confidence);

        debug!(
            aggregate = aggregate_mean,
            confidence,
            tier = confidence_tier.as_str(),
            members = predictions.len(),
            "ensemble prediction combined"
        );

        Ok(EnsemblePrediction {
            competency_mean,
            aggregate_mean,
            uncertainty: UncertaintyEstimate {
                competency_std,
                aggregate_std,
            },
            confidence,
            confidence_tier,
            members: predictions.len(),
        })
    }

    /// Agreement-based confidence: stds normalized by their ranges and
    /// averaged, then a concave penalty (exponent < 1) so moderate
    /// disagreement already costs noticeably more than negligible
    /// disagreement.
    fn confidence(&self, competency_std: &[f32; NUM_COMPETENCIES], aggregate_std: f32) -> f32 {
        let comp_norm = competency_std
            .iter()
            .map(|s| s / COMPETENCY_RANGE)
            .sum::<f32>()
            / NUM_COMPETENCIES as f32;
        let agg_norm = aggregate_std / AGGREGATE_RANGE;

        let avg_norm = (comp_norm + agg_norm) / 2.0;
        (1.0 - avg_norm.powf(self.cfg.penalty_exp)).clamp(0.0, 1.0)
    }

    fn tier(&self, confidence: f32) -> ConfidenceTier {
        if confidence >= self.cfg.high_threshold {
            ConfidenceTier::High
        } else if confidence >= self.cfg.low_threshold {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

fn population_std(values: &[f32], mean: f32) -> f32 {
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
    var.sqrt()
}
