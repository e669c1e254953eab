// tests/aggregator_test.rs
use redator::config::{ConfidenceCfg, ModelCfg};
use redator::core::{ConfidenceTier, EncodedEssay, ScorePrediction, Scorer, NUM_COMPETENCIES};
use redator::encoder::Encoder;
use redator::ensemble::Ensemble;
use redator::error::CorrectionError;
use redator::model::{ModelRepository, SeededModelRepository};

type B = burn_ndarray::NdArray<f32>;

struct StubScorer {
    competencies: [f32; NUM_COMPETENCIES],
    aggregate: f32,
}

impl Scorer for StubScorer {
    fn score(&self, _encoded: &EncodedEssay) -> ScorePrediction {
        ScorePrediction {
            competencies: self.competencies,
            aggregate: self.aggregate,
        }
    }
}

fn stub_ensemble(specs: &[([f32; NUM_COMPETENCIES], f32)]) -> Ensemble {
    let members: Vec<Box<dyn Scorer>> = specs
        .iter()
        .map(|&(competencies, aggregate)| {
            Box::new(StubScorer {
                competencies,
                aggregate,
            }) as Box<dyn Scorer>
        })
        .collect();
    Ensemble::new(members, "test", ConfidenceCfg::default())
}

fn encoded() -> EncodedEssay {
    Encoder::new(512, 64).encode("A escola pública precisa de mais investimento.")
}

#[test]
fn empty_ensemble_is_model_unavailable() {
    let ensemble = stub_ensemble(&[]);
    let err = ensemble.predict(&encoded()).unwrap_err();
    assert!(matches!(err, CorrectionError::ModelUnavailable));
    assert!(err.is_fatal());
}

#[test]
fn agreeing_members_reach_high_tier() {
    // Aggregates 700/720/710: population std ≈ 8.165, so near-total
    // agreement and a confidence well above the high threshold.
    let ensemble = stub_ensemble(&[
        ([150.0; NUM_COMPETENCIES], 700.0),
        ([150.0; NUM_COMPETENCIES], 720.0),
        ([150.0; NUM_COMPETENCIES], 710.0),
    ]);

    let prediction = ensemble.predict(&encoded()).unwrap();
    assert!((prediction.aggregate_mean - 710.0).abs() < 0.01);
    assert!((prediction.uncertainty.aggregate_std - 8.165).abs() < 0.01);
    assert!(prediction.confidence > 0.85, "confidence={}", prediction.confidence);
    assert_eq!(prediction.confidence_tier, ConfidenceTier::High);
    assert_eq!(prediction.members, 3);
}

#[test]
fn disagreeing_members_fall_to_low_tier() {
    // Members disagree on everything: per-competency std ≈ 40.8 and
    // aggregate std ≈ 204, which lands below the low threshold.
    let ensemble = stub_ensemble(&[
        ([80.0; NUM_COMPETENCIES], 400.0),
        ([180.0; NUM_COMPETENCIES], 900.0),
        ([130.0; NUM_COMPETENCIES], 650.0),
    ]);

    let prediction = ensemble.predict(&encoded()).unwrap();
    assert!((prediction.aggregate_mean - 650.0).abs() < 0.01);
    assert!(prediction.confidence < 0.70, "confidence={}", prediction.confidence);
    assert_eq!(prediction.confidence_tier, ConfidenceTier::Low);
}

#[test]
fn wider_spread_never_raises_confidence() {
    let narrow = stub_ensemble(&[
        ([150.0; NUM_COMPETENCIES], 700.0),
        ([150.0; NUM_COMPETENCIES], 710.0),
        ([150.0; NUM_COMPETENCIES], 720.0),
    ]);
    let wide = stub_ensemble(&[
        ([150.0; NUM_COMPETENCIES], 650.0),
        ([150.0; NUM_COMPETENCIES], 710.0),
        ([150.0; NUM_COMPETENCIES], 770.0),
    ]);

    let input = encoded();
    let narrow_pred = narrow.predict(&input).unwrap();
    let wide_pred = wide.predict(&input).unwrap();

    // Same mean, wider disagreement.
    assert!((narrow_pred.aggregate_mean - wide_pred.aggregate_mean).abs() < 0.01);
    assert!(wide_pred.confidence < narrow_pred.confidence);
}

fn small_cfg() -> ModelCfg {
    ModelCfg {
        vocab_size: 512,
        seq_len: 64,
        d_model: 32,
        n_heads: 2,
        ensemble_size: 2,
        ..ModelCfg::default()
    }
}

fn seeded_ensemble(cfg: &ModelCfg) -> Ensemble {
    let device = burn_ndarray::NdArrayDevice::default();
    let members: Vec<redator::model::NeuralScorer<B>> = SeededModelRepository::new(cfg.clone())
        .load(&cfg.version, &device)
        .unwrap();
    let members: Vec<Box<dyn Scorer>> = members
        .into_iter()
        .map(|m| Box::new(m) as Box<dyn Scorer>)
        .collect();
    Ensemble::new(members, cfg.version.clone(), ConfidenceCfg::default())
}

#[test]
fn seeded_members_score_within_ranges() {
    let cfg = small_cfg();
    let ensemble = seeded_ensemble(&cfg);
    let input = Encoder::new(cfg.vocab_size, cfg.seq_len)
        .encode("A leitura diária amplia o vocabulário dos estudantes brasileiros.");

    let prediction = ensemble.predict(&input).unwrap();
    for (i, &mean) in prediction.competency_mean.iter().enumerate() {
        assert!((0.0..=200.0).contains(&mean), "c{} out of range: {mean}", i + 1);
    }
    assert!((0.0..=1000.0).contains(&prediction.aggregate_mean));
    assert!((0.0..=1.0).contains(&prediction.confidence));
}

#[test]
fn seeded_prediction_is_reproducible() {
    let cfg = small_cfg();
    let input = Encoder::new(cfg.vocab_size, cfg.seq_len)
        .encode("O transporte coletivo merece atenção das autoridades municipais.");

    let first = seeded_ensemble(&cfg).predict(&input).unwrap();
    let second = seeded_ensemble(&cfg).predict(&input).unwrap();

    assert_eq!(first.competency_mean, second.competency_mean);
    assert_eq!(first.aggregate_mean, second.aggregate_mean);
    assert_eq!(first.confidence, second.confidence);
}
