pub mod analyzer;
pub mod grammar;
pub mod lexicon;

pub use analyzer::{AnalysisReport, LinguisticAnalyzer};
pub use grammar::{GrammarService, LanguageToolClient};
