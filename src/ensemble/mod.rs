pub mod aggregator;

pub use aggregator::{Ensemble, EnsemblePrediction};
