pub mod repository;
pub mod scorer;

pub use repository::{FsModelRepository, ModelRepository, SeededModelRepository};
pub use scorer::{EssayScorerNet, NeuralScorer};
