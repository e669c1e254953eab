pub mod explainer;

pub use explainer::Explainer;
