// src/storage/mod.rs
pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

use crate::core::{Correction, Essay, HumanFeedback, TrainingCandidate};
use crate::error::CorrectionError;

/// Persistence seam for essays, corrections and reviewer feedback.
/// Corrections are append-only: a re-score inserts a new row.
pub trait CorrectionStore: Send + Sync {
    fn put_essay(&self, essay: &Essay) -> Result<(), CorrectionError>;

    fn essay(&self, id: &str) -> Result<Option<Essay>, CorrectionError>;

    fn put_correction(&self, correction: &Correction) -> Result<(), CorrectionError>;

    fn correction(&self, id: &str) -> Result<Option<Correction>, CorrectionError>;

    fn put_human_feedback(&self, feedback: &HumanFeedback) -> Result<(), CorrectionError>;

    /// Most recent retrain-eligible corrections at or above
    /// `min_confidence`, joined with their essay text.
    fn high_confidence_candidates(
        &self,
        min_confidence: f32,
        limit: usize,
    ) -> Result<Vec<TrainingCandidate>, CorrectionError>;

    /// Most recent reviewer-corrected scores, joined with the essay text
    /// of the correction they amend.
    fn human_feedback_candidates(
        &self,
        limit: usize,
    ) -> Result<Vec<TrainingCandidate>, CorrectionError>;
}
