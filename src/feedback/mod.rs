pub mod synthesizer;

pub use synthesizer::{Band, FeedbackSynthesizer};
