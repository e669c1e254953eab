// src/encoder/encoder.rs
use crate::core::EncodedEssay;
use crate::encoder::vocab::{Vocab, AGG_ID, PAD_ID};

/// Turns essay text into the fixed-length (token_ids, attention_mask)
/// pair every scorer consumes. Deterministic for a fixed (text, vocab,
/// seq_len): truncates longer text, pads shorter text, never fails on
/// well-formed input.
#[derive(Clone, Debug)]
pub struct Encoder {
    vocab: Vocab,
    seq_len: usize,
}

impl Encoder {
    pub fn new(vocab_size: usize, seq_len: usize) -> Self {
        assert!(seq_len >= 2, "need room for the aggregation slot plus text");
        Self {
            vocab: Vocab::new(vocab_size),
            seq_len,
        }
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Lowercased word split on non-alphanumeric boundaries. The explainer
    /// relies on this being identical to the split used by `encode`.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect()
    }

    pub fn encode(&self, text: &str) -> EncodedEssay {
        let words = self.tokenize(text);

        let mut token_ids = Vec::with_capacity(self.seq_len);
        token_ids.push(AGG_ID);
        for w in words.iter().take(self.seq_len - 1) {
            token_ids.push(self.vocab.id_for(w));
        }

        let real = token_ids.len();
        token_ids.resize(self.seq_len, PAD_ID);

        let mut attention_mask = vec![1u8; real];
        attention_mask.resize(self.seq_len, 0);

        EncodedEssay {
            token_ids,
            attention_mask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_text() {
        let enc = Encoder::new(1024, 16);
        let e = enc.encode("uma frase curta");
        assert_eq!(e.token_ids.len(), 16);
        assert_eq!(e.attention_mask.len(), 16);
        assert_eq!(e.token_ids[0], AGG_ID);
        // AGG + 3 words real, rest padding
        assert_eq!(e.attention_mask.iter().filter(|&&m| m == 1).count(), 4);
        assert!(e.token_ids[4..].iter().all(|&t| t == PAD_ID));
    }

    #[test]
    fn truncates_long_text() {
        let enc = Encoder::new(1024, 8);
        let long = "palavra ".repeat(50);
        let e = enc.encode(&long);
        assert_eq!(e.token_ids.len(), 8);
        assert!(e.attention_mask.iter().all(|&m| m == 1));
    }

    #[test]
    fn encoding_is_deterministic() {
        let enc = Encoder::new(4096, 64);
        let text = "A sociedade brasileira enfrenta, atualmente, um grave problema.";
        assert_eq!(enc.encode(text), enc.encode(text));
    }

    #[test]
    fn empty_text_still_encodes() {
        let enc = Encoder::new(1024, 8);
        let e = enc.encode("");
        assert_eq!(e.token_ids[0], AGG_ID);
        assert_eq!(e.attention_mask.iter().filter(|&&m| m == 1).count(), 1);
    }
}
