// src/encoder/vocab.rs
use xxhash_rust::xxh3::xxh3_64;

/// Padding slot.
pub const PAD_ID: usize = 0;
/// Aggregation slot prepended to every sequence; the scorer pools its
/// hidden state and the explainer reads its attention row.
pub const AGG_ID: usize = 1;
/// First id available to real words.
pub const RESERVED: usize = 2;

/// Hashing vocabulary: a word maps to a stable bucket id, no fitted
/// dictionary required. Deterministic for a fixed size, which is all the
/// encoder needs to be reproducible.
#[derive(Clone, Debug)]
pub struct Vocab {
    size: usize,
}

impl Vocab {
    pub fn new(size: usize) -> Self {
        assert!(size > RESERVED, "vocab must leave room for reserved ids");
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn id_for(&self, word: &str) -> usize {
        (xxh3_64(word.as_bytes()) as usize % (self.size - RESERVED)) + RESERVED
    }

    /// Structural markers carry no text and are excluded from explanations.
    pub fn is_marker(id: usize) -> bool {
        id < RESERVED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_in_range() {
        let v = Vocab::new(1024);
        let a = v.id_for("sociedade");
        assert_eq!(a, v.id_for("sociedade"));
        assert!(a >= RESERVED && a < 1024);
    }

    #[test]
    fn markers_are_reserved() {
        assert!(Vocab::is_marker(PAD_ID));
        assert!(Vocab::is_marker(AGG_ID));
        assert!(!Vocab::is_marker(RESERVED));
    }
}
