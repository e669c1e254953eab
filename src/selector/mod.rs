pub mod selector;

pub use selector::{SelectionOutcome, TrainingSelector};
