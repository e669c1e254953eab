// src/lib.rs
//! Automated essay scoring for the five-competency ENEM rubric: a
//! deep-ensemble scorer with agreement-based confidence, a rule-based
//! linguistic analyzer, attention explanations, feedback synthesis and
//! a continual-learning candidate selector.

pub mod analysis;
pub mod config;
pub mod core;
pub mod corrector;
pub mod encoder;
pub mod ensemble;
pub mod error;
pub mod explain;
pub mod feedback;
pub mod model;
pub mod selector;
pub mod storage;

pub use config::{load_config, EngineConfig};
pub use self::core::{Correction, Essay, HumanFeedback, Scorer};
pub use corrector::Corrector;
pub use ensemble::Ensemble;
pub use error::CorrectionError;
