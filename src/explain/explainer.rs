// src/explain/explainer.rs
use tracing::debug;

use crate::core::{Explanation, Scorer, SpanImportance, TokenImportance};
use crate::encoder::Encoder;
use crate::error::CorrectionError;

const TOP_SPANS: usize = 5;

/// Derives token/phrase salience from one scorer's attention internals.
/// Interpretability only: a failure here is recovered by the caller, the
/// correction simply ships without an explanation.
#[derive(Clone, Debug)]
pub struct Explainer {
    top_k: usize,
    span_threshold: f32,
}

impl Default for Explainer {
    fn default() -> Self {
        Self {
            top_k: 10,
            span_threshold: 0.02,
        }
    }
}

impl Explainer {
    pub fn new(top_k: usize, span_threshold: f32) -> Self {
        Self {
            top_k,
            span_threshold,
        }
    }

    pub fn explain(
        &self,
        encoder: &Encoder,
        scorer: &dyn Scorer,
        text: &str,
    ) -> Result<Explanation, CorrectionError> {
        let encoded = encoder.encode(text);
        let weights = scorer.attention(&encoded).ok_or_else(|| {
            CorrectionError::ExplanationFailed("scorer does not expose attention".into())
        })?;

        if weights.len() != encoded.token_ids.len() {
            return Err(CorrectionError::ExplanationFailed(format!(
                "attention length {} does not match sequence length {}",
                weights.len(),
                encoded.token_ids.len()
            )));
        }

        // Positions carrying real words: skip the aggregation slot at 0
        // and everything past the unpadded prefix.
        let words = encoder.tokenize(text);
        let real = words.len().min(encoder.seq_len() - 1);
        if real == 0 {
            return Err(CorrectionError::ExplanationFailed("no tokens to rank".into()));
        }

        let mut member: Vec<(usize, f32)> = (0..real)
            .map(|w| (w, weights[w + 1].max(0.0)))
            .collect();

        let total: f32 = member.iter().map(|(_, v)| v).sum();
        if total > 0.0 {
            for (_, v) in member.iter_mut() {
                *v /= total;
            }
        }

        let spans = self.collect_spans(&words, &member);
        let tokens = self.rank_tokens(&words, &member);
        let summary = summarize(&tokens, &spans);

        debug!(tokens = tokens.len(), spans = spans.len(), "explanation derived");

        Ok(Explanation {
            tokens,
            spans,
            summary,
        })
    }

    fn rank_tokens(&self, words: &[String], member: &[(usize, f32)]) -> Vec<TokenImportance> {
        let mut ranked: Vec<&(usize, f32)> = member.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
            .into_iter()
            .take(self.top_k)
            .map(|&(pos, weight)| TokenImportance {
                token: words[pos].clone(),
                weight,
                position: pos,
            })
            .collect()
    }

    /// Contiguous runs of tokens whose normalized weight clears the
    /// threshold; span importance is the sum of member weights.
    fn collect_spans(&self, words: &[String], member: &[(usize, f32)]) -> Vec<SpanImportance> {
        let mut spans = Vec::new();
        let mut run: Vec<usize> = Vec::new();
        let mut run_weight = 0.0f32;

        for &(pos, weight) in member {
            if weight >= self.span_threshold {
                run.push(pos);
                run_weight += weight;
            } else if !run.is_empty() {
                spans.push(close_run(words, &run, run_weight));
                run.clear();
                run_weight = 0.0;
            }
        }
        if !run.is_empty() {
            spans.push(close_run(words, &run, run_weight));
        }

        spans.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        spans.truncate(TOP_SPANS);
        spans
    }
}

fn close_run(words: &[String], run: &[usize], weight: f32) -> SpanImportance {
    let excerpt = run
        .iter()
        .map(|&i| words[i].as_str())
        .collect::<Vec<_>>()
        .join(" ");
    SpanImportance { excerpt, weight }
}

fn summarize(tokens: &[TokenImportance], spans: &[SpanImportance]) -> String {
    if tokens.is_empty() && spans.is_empty() {
        return "Não foram identificados padrões significativos na análise.".into();
    }

    let mut parts = Vec::new();
    if !tokens.is_empty() {
        let top: Vec<&str> = tokens.iter().take(3).map(|t| t.token.as_str()).collect();
        parts.push(format!(
            "As palavras mais relevantes para a avaliação foram: {}.",
            top.join(", ")
        ));
    }
    if !spans.is_empty() {
        parts.push(format!(
            "Foram identificados {} trechos com alta relevância na argumentação.",
            spans.len()
        ));
    }
    parts.join(" ")
}
