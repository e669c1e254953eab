// src/error.rs
use std::fmt;
use std::time::Duration;

/// Failure modes of the correction pipeline. The ML lane and the rule
/// lane fail differently: model errors abort the correction, analysis
/// errors only degrade it.
#[derive(Debug)]
pub enum CorrectionError {
    /// No loadable ensemble member. A correction without model scores is
    /// never emitted.
    ModelUnavailable,
    /// The ensemble missed its scoring budget.
    ModelTimeout(Duration),
    /// The external grammar resource is absent or unreachable. Callers
    /// degrade to empty findings instead of propagating this.
    AnalysisUnavailable(String),
    /// The explaining member could not produce usable attention.
    ExplanationFailed(String),
    Storage(rusqlite::Error),
    Io(std::io::Error),
    Config(String),
}

impl CorrectionError {
    /// Fatal errors abort the correction; everything else degrades it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CorrectionError::ModelUnavailable
                | CorrectionError::ModelTimeout(_)
                | CorrectionError::Storage(_)
                | CorrectionError::Io(_)
                | CorrectionError::Config(_)
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CorrectionError::ModelTimeout(_) | CorrectionError::AnalysisUnavailable(_)
        )
    }
}

impl fmt::Display for CorrectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionError::ModelUnavailable => {
                write!(f, "no ensemble member available for scoring")
            }
            CorrectionError::ModelTimeout(budget) => {
                write!(f, "ensemble exceeded scoring budget of {budget:?}")
            }
            CorrectionError::AnalysisUnavailable(msg) => {
                write!(f, "grammar analysis unavailable: {msg}")
            }
            CorrectionError::ExplanationFailed(msg) => {
                write!(f, "explanation failed: {msg}")
            }
            CorrectionError::Storage(e) => write!(f, "storage error: {e}"),
            CorrectionError::Io(e) => write!(f, "io error: {e}"),
            CorrectionError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for CorrectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CorrectionError::Storage(e) => Some(e),
            CorrectionError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for CorrectionError {
    fn from(e: rusqlite::Error) -> Self {
        CorrectionError::Storage(e)
    }
}

impl From<std::io::Error> for CorrectionError {
    fn from(e: std::io::Error) -> Self {
        CorrectionError::Io(e)
    }
}
