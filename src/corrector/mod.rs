pub mod orchestrator;

pub use orchestrator::{Corrector, ModelInfo, Stage};
