pub mod encoder;
pub mod vocab;

pub use encoder::Encoder;
pub use vocab::{Vocab, AGG_ID, PAD_ID};
