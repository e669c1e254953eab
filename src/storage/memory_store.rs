// src/storage/memory_store.rs
use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::{Correction, Essay, HumanFeedback, Provenance, TrainingCandidate};
use crate::error::CorrectionError;
use crate::storage::CorrectionStore;

/// RwLock-backed store for tests and ephemeral deployments. Same
/// ordering semantics as the SQLite store: candidate queries return the
/// most recent rows first.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    essays: HashMap<String, Essay>,
    corrections: Vec<Correction>,
    feedback: Vec<HumanFeedback>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl CorrectionStore for MemoryStore {
    fn put_essay(&self, essay: &Essay) -> Result<(), CorrectionError> {
        self.write()
            .essays
            .entry(essay.id.clone())
            .or_insert_with(|| essay.clone());
        Ok(())
    }

    fn essay(&self, id: &str) -> Result<Option<Essay>, CorrectionError> {
        Ok(self.read().essays.get(id).cloned())
    }

    fn put_correction(&self, correction: &Correction) -> Result<(), CorrectionError> {
        self.write().corrections.push(correction.clone());
        Ok(())
    }

    fn correction(&self, id: &str) -> Result<Option<Correction>, CorrectionError> {
        Ok(self
            .read()
            .corrections
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    fn put_human_feedback(&self, feedback: &HumanFeedback) -> Result<(), CorrectionError> {
        self.write().feedback.push(feedback.clone());
        Ok(())
    }

    fn high_confidence_candidates(
        &self,
        min_confidence: f32,
        limit: usize,
    ) -> Result<Vec<TrainingCandidate>, CorrectionError> {
        let inner = self.read();
        let mut out = Vec::new();
        for correction in inner.corrections.iter().rev() {
            if out.len() >= limit {
                break;
            }
            if !correction.retrain_eligible || correction.confidence < min_confidence {
                continue;
            }
            let Some(essay) = inner.essays.get(&correction.essay_id) else {
                continue;
            };
            let mut competencies = [0.0f32; crate::core::NUM_COMPETENCIES];
            for score in &correction.competencies {
                let i = (score.index - 1) as usize;
                if i < competencies.len() {
                    competencies[i] = score.value;
                }
            }
            out.push(TrainingCandidate {
                essay_text: essay.text.clone(),
                competencies,
                aggregate: correction.aggregate,
                provenance: Provenance::HighConfidenceInference,
            });
        }
        Ok(out)
    }

    fn human_feedback_candidates(
        &self,
        limit: usize,
    ) -> Result<Vec<TrainingCandidate>, CorrectionError> {
        let inner = self.read();
        let mut out = Vec::new();
        for feedback in inner.feedback.iter().rev() {
            if out.len() >= limit {
                break;
            }
            let essay_text = inner
                .corrections
                .iter()
                .find(|c| c.id == feedback.correction_id)
                .and_then(|c| inner.essays.get(&c.essay_id))
                .map(|e| e.text.clone());
            let Some(essay_text) = essay_text else {
                continue;
            };
            out.push(TrainingCandidate {
                essay_text,
                competencies: feedback.competencies,
                aggregate: feedback.aggregate,
                provenance: Provenance::HumanFeedback,
            });
        }
        Ok(out)
    }
}
