// src/model/scorer.rs
use burn::{
    module::Module,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Embedding, EmbeddingConfig, Linear, LinearConfig,
    },
    tensor::{activation, backend::Backend, Bool, Int, Tensor},
};

use crate::core::{EncodedEssay, ScorePrediction, Scorer, NUM_COMPETENCIES};

/// One regression head: d_model -> hidden -> 1, squashed by the caller.
#[derive(Module, Debug)]
pub struct RegressionHead<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> RegressionHead<B> {
    pub fn new(d_in: usize, d_hidden: usize, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(d_in, d_hidden).init(device),
            fc2: LinearConfig::new(d_hidden, 1).init(device),
        }
    }

    /// x: [B, D] -> [B, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = activation::relu(self.fc1.forward(x));
        self.fc2.forward(h)
    }
}

/// Essay scoring network. Multi-task regression: the five competency
/// heads are an indexed collection of identical sub-modules and the
/// aggregate head is independent of them (the outputs need not sum).
///
/// Every head passes through a sigmoid scaled to its range, so outputs
/// stay in-bounds regardless of internal numeric drift.
#[derive(Module, Debug)]
pub struct EssayScorerNet<B: Backend> {
    embedding: Embedding<B>,
    attention: MultiHeadAttention<B>,
    competency_heads: Vec<RegressionHead<B>>,
    aggregate_head: RegressionHead<B>,
}

impl<B: Backend> EssayScorerNet<B> {
    pub fn new(vocab_size: usize, d_model: usize, n_heads: usize, device: &B::Device) -> Self {
        Self {
            embedding: EmbeddingConfig::new(vocab_size, d_model).init(device),
            attention: MultiHeadAttentionConfig::new(d_model, n_heads).init(device),
            competency_heads: (0..NUM_COMPETENCIES)
                .map(|_| RegressionHead::new(d_model, d_model / 2, device))
                .collect(),
            aggregate_head: RegressionHead::new(d_model, d_model, device),
        }
    }

    /// ids: [B, T] Int, pad_mask: [B, T] Bool (true at padded positions).
    /// Returns (competencies [B, 5] in 0..=200, aggregate [B, 1] in 0..=1000).
    pub fn forward(
        &self,
        ids: Tensor<B, 2, Int>,
        pad_mask: Tensor<B, 2, Bool>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let pooled = self.pooled(ids, pad_mask);

        let comps: Vec<Tensor<B, 2>> = self
            .competency_heads
            .iter()
            .map(|head| activation::sigmoid(head.forward(pooled.clone())).mul_scalar(200.0))
            .collect();
        let competencies = Tensor::cat(comps, 1); // [B, 5]

        let aggregate =
            activation::sigmoid(self.aggregate_head.forward(pooled)).mul_scalar(1000.0); // [B, 1]

        (competencies, aggregate)
    }

    /// Attention weights of the (single, hence last) layer: [B, H, T, T].
    pub fn attention_weights(
        &self,
        ids: Tensor<B, 2, Int>,
        pad_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 4> {
        let x = self.embedding.forward(ids);
        let out = self.attention.forward(MhaInput::self_attn(x).mask_pad(pad_mask));
        out.weights
    }

    /// Hidden state of the aggregation slot (position 0): [B, D].
    fn pooled(&self, ids: Tensor<B, 2, Int>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
        let x = self.embedding.forward(ids); // [B, T, D]
        let out = self.attention.forward(MhaInput::self_attn(x).mask_pad(pad_mask));
        let context = out.context; // [B, T, D]

        let [b, _t, d] = context.dims();
        context.slice([0..b, 0..1, 0..d]).reshape([b, d])
    }
}

/// An ensemble member backed by `EssayScorerNet`. Stateless at inference;
/// parameters are read-only for the process lifetime, so members can run
/// on parallel threads.
#[derive(Debug)]
pub struct NeuralScorer<B: Backend> {
    net: EssayScorerNet<B>,
    device: B::Device,
}

impl<B: Backend> NeuralScorer<B> {
    pub fn new(net: EssayScorerNet<B>, device: B::Device) -> Self {
        Self { net, device }
    }

    fn tensors(&self, encoded: &EncodedEssay) -> (Tensor<B, 2, Int>, Tensor<B, 2, Bool>) {
        let t = encoded.token_ids.len();

        let ids_host: Vec<i32> = encoded.token_ids.iter().map(|&id| id as i32).collect();
        let ids = Tensor::<B, 1, Int>::from_ints(ids_host.as_slice(), &self.device).reshape([1, t]);

        let mask_host: Vec<f32> = encoded.attention_mask.iter().map(|&m| m as f32).collect();
        let mask =
            Tensor::<B, 1>::from_floats(mask_host.as_slice(), &self.device).reshape([1, t]);
        let pad_mask = mask.equal_elem(0.0); // true where padded

        (ids, pad_mask)
    }
}

impl<B: Backend> Scorer for NeuralScorer<B>
where
    NeuralScorer<B>: Send + Sync,
{
    fn score(&self, encoded: &EncodedEssay) -> ScorePrediction {
        let (ids, pad_mask) = self.tensors(encoded);
        let (comps, aggregate) = self.net.forward(ids, pad_mask);

        let comps_host = comps.to_data();
        let comps_host = comps_host.as_slice::<f32>().expect("competencies f32");
        let mut competencies = [0.0f32; NUM_COMPETENCIES];
        competencies.copy_from_slice(&comps_host[..NUM_COMPETENCIES]);

        let agg_host = aggregate.to_data();
        let aggregate = agg_host.as_slice::<f32>().expect("aggregate f32")[0];

        ScorePrediction {
            competencies,
            aggregate,
        }
    }

    fn attention(&self, encoded: &EncodedEssay) -> Option<Vec<f32>> {
        let (ids, pad_mask) = self.tensors(encoded);
        let weights = self.net.attention_weights(ids, pad_mask); // [1, H, T, T]
        let [_b, _h, t, _t2] = weights.dims();

        // Head-averaged, then the aggregation slot's outgoing row.
        let avg = weights.mean_dim(1).reshape([t, t]); // [T, T]
        let row = avg.slice([0..1, 0..t]).reshape([t]); // [T]

        let host = row.to_data();
        Some(host.as_slice::<f32>().ok()?.to_vec())
    }
}
