// src/selector/selector.rs
use std::sync::Arc;

use tracing::info;

use crate::config::TrainingCfg;
use crate::core::TrainingCandidate;
use crate::error::CorrectionError;
use crate::storage::CorrectionStore;

/// Outcome of a selection round. Below the minimum sample count no
/// partial set is returned; retraining on a sliver of data would drift
/// the ensemble for nothing.
#[derive(Clone, Debug)]
pub enum SelectionOutcome {
    Selected(Vec<TrainingCandidate>),
    InsufficientSamples { found: usize, required: usize },
}

/// Assembles the next retraining set from stored corrections.
///
/// Reviewer-corrected scores are ground truth and always come first;
/// high-confidence inferences fill the remainder. Both sources are
/// capped independently so self-labelled data cannot crowd out human
/// labels.
pub struct TrainingSelector {
    store: Arc<dyn CorrectionStore>,
    cfg: TrainingCfg,
}

impl TrainingSelector {
    pub fn new(store: Arc<dyn CorrectionStore>, cfg: TrainingCfg) -> Self {
        Self { store, cfg }
    }

    pub fn select_training_candidates(
        &self,
        min_confidence: f32,
        max_count: usize,
    ) -> Result<SelectionOutcome, CorrectionError> {
        let mut candidates = self
            .store
            .human_feedback_candidates(self.cfg.max_human_feedback)?;

        let remaining = max_count
            .saturating_sub(candidates.len())
            .min(self.cfg.max_high_confidence);
        if remaining > 0 {
            candidates.extend(
                self.store
                    .high_confidence_candidates(min_confidence, remaining)?,
            );
        }
        candidates.truncate(max_count);

        if candidates.len() < self.cfg.min_samples {
            info!(
                found = candidates.len(),
                required = self.cfg.min_samples,
                "not enough samples for retraining"
            );
            return Ok(SelectionOutcome::InsufficientSamples {
                found: candidates.len(),
                required: self.cfg.min_samples,
            });
        }

        info!(selected = candidates.len(), "training candidates selected");
        Ok(SelectionOutcome::Selected(candidates))
    }
}
