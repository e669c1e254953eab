// tests/pipeline_test.rs
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use redator::analysis::LinguisticAnalyzer;
use redator::config::{EngineConfig, ModelCfg, TrainingCfg};
use redator::core::{
    ConfidenceTier, EncodedEssay, Essay, HumanFeedback, Provenance, ScorePrediction, Scorer,
    NUM_COMPETENCIES,
};
use redator::corrector::Corrector;
use redator::encoder::Encoder;
use redator::ensemble::Ensemble;
use redator::error::CorrectionError;
use redator::explain::Explainer;
use redator::feedback::FeedbackSynthesizer;
use redator::model::{ModelRepository, SeededModelRepository};
use redator::selector::{SelectionOutcome, TrainingSelector};
use redator::storage::{CorrectionStore, MemoryStore};

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

struct SlowScorer {
    delay: Duration,
}

impl Scorer for SlowScorer {
    fn score(&self, _encoded: &EncodedEssay) -> ScorePrediction {
        thread::sleep(self.delay);
        ScorePrediction {
            competencies: [150.0; NUM_COMPETENCIES],
            aggregate: 700.0,
        }
    }
}

fn agreeing_members() -> Vec<Box<dyn Scorer>> {
    [700.0, 720.0, 710.0]
        .into_iter()
        .map(|aggregate| {
            Box::new(StubScorer {
                competencies: [150.0; NUM_COMPETENCIES],
                aggregate,
            }) as Box<dyn Scorer>
        })
        .collect()
}

fn disagreeing_members() -> Vec<Box<dyn Scorer>> {
    [
        ([80.0; NUM_COMPETENCIES], 400.0),
        ([180.0; NUM_COMPETENCIES], 900.0),
        ([130.0; NUM_COMPETENCIES], 650.0),
    ]
    .into_iter()
    .map(|(competencies, aggregate)| {
        Box::new(StubScorer {
            competencies,
            aggregate,
        }) as Box<dyn Scorer>
    })
    .collect()
}

fn corrector_with(
    members: Vec<Box<dyn Scorer>>,
    store: Arc<MemoryStore>,
    cfg: EngineConfig,
) -> Corrector {
    let ensemble = Arc::new(Ensemble::new(
        members,
        cfg.model.version.clone(),
        cfg.confidence.clone(),
    ));
    let analyzer = Arc::new(LinguisticAnalyzer::new(cfg.analysis.clone()));
    let synthesizer = FeedbackSynthesizer::new(cfg.feedback.clone(), cfg.analysis.clone());
    let encoder = Encoder::new(cfg.model.vocab_size, cfg.model.seq_len);
    Corrector::new(
        encoder,
        ensemble,
        analyzer,
        Explainer::default(),
        synthesizer,
        store,
        cfg,
    )
}

const ESSAY: &str = "Atualmente, o debate sobre educação digital cresce no país.\n\n\
    As escolas buscam adaptar seus métodos de ensino à nova realidade.\n\n\
    Além disso, os professores recebem capacitação contínua durante o ano.\n\n\
    Portanto, o governo deve implementar políticas públicas por meio de \
    investimento contínuo em infraestrutura.";

#[test]
fn agreeing_ensemble_produces_retrain_eligible_correction() {
    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(agreeing_members(), store.clone(), EngineConfig::default());

    let essay = Essay::new(ESSAY);
    let correction = corrector.correct(&essay).unwrap();

    assert_eq!(correction.aggregate, 710.0);
    assert_eq!(correction.confidence_tier, ConfidenceTier::High);
    assert!(correction.retrain_eligible);
    assert!(!correction.needs_human_review);
    assert_eq!(correction.competencies.len(), NUM_COMPETENCIES);
    assert!(!correction.overall_feedback.contains("professor"));

    // Stub members have no attention capability.
    assert!(correction.explanation.is_none());

    // Both the essay and the correction are durable.
    assert!(store.essay(&essay.id).unwrap().is_some());
    let stored = store.correction(&correction.id).unwrap().unwrap();
    assert_eq!(stored.essay_id, essay.id);
}

#[test]
fn disagreeing_ensemble_is_flagged_for_human_review() {
    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(disagreeing_members(), store, EngineConfig::default());

    let correction = corrector.correct(&Essay::new(ESSAY)).unwrap();

    assert_eq!(correction.confidence_tier, ConfidenceTier::Low);
    assert!(correction.needs_human_review);
    assert!(!correction.retrain_eligible);
    assert!(correction
        .overall_feedback
        .contains("Recomenda-se validação da correção por um professor"));
}

struct PanickingScorer;

impl Scorer for PanickingScorer {
    fn score(&self, _encoded: &EncodedEssay) -> ScorePrediction {
        panic!("member parameters corrupted");
    }
}

#[test]
fn dead_scoring_lane_is_model_unavailable_not_timeout() {
    let members: Vec<Box<dyn Scorer>> = vec![Box::new(PanickingScorer)];
    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(members, store, EngineConfig::default());

    let err = corrector.correct(&Essay::new(ESSAY)).unwrap_err();
    assert!(matches!(err, CorrectionError::ModelUnavailable));
    assert!(!err.is_transient());
}

#[test]
fn slow_ensemble_exceeds_score_budget() {
    let mut cfg = EngineConfig::default();
    cfg.model.score_budget_ms = 50;

    let members: Vec<Box<dyn Scorer>> = vec![Box::new(SlowScorer {
        delay: Duration::from_millis(500),
    })];
    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(members, store, cfg);

    let err = corrector.correct(&Essay::new(ESSAY)).unwrap_err();
    assert!(matches!(err, CorrectionError::ModelTimeout(_)));
    assert!(err.is_fatal());
}

#[test]
fn seeded_ensemble_scores_and_explains_end_to_end() {
    let mut cfg = EngineConfig::default();
    cfg.model = ModelCfg {
        vocab_size: 512,
        seq_len: 64,
        d_model: 32,
        n_heads: 2,
        ensemble_size: 2,
        ..ModelCfg::default()
    };

    let device = burn_ndarray::NdArrayDevice::default();
    let members: Vec<redator::model::NeuralScorer<B>> =
        SeededModelRepository::new(cfg.model.clone())
            .load(&cfg.model.version, &device)
            .unwrap();
    let members: Vec<Box<dyn Scorer>> = members
        .into_iter()
        .map(|m| Box::new(m) as Box<dyn Scorer>)
        .collect();

    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(members, store, cfg);

    let correction = corrector.correct(&Essay::new(ESSAY)).unwrap();

    assert!((0.0..=1000.0).contains(&correction.aggregate));
    for comp in &correction.competencies {
        assert!((0.0..=200.0).contains(&comp.value));
        assert!(!comp.feedback.is_empty());
    }
    assert!(!correction.summary.is_empty());

    let explanation = correction.explanation.expect("attention-capable ensemble");
    assert!(!explanation.tokens.is_empty());
    assert!(!explanation.summary.is_empty());
}

#[test]
fn selector_reports_insufficient_samples() {
    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(agreeing_members(), store.clone(), EngineConfig::default());

    // 30 high-confidence corrections plus 10 reviewer corrections.
    let mut correction_ids = Vec::new();
    for i in 0..30 {
        let correction = corrector
            .correct(&Essay::new(format!("{ESSAY}\n\nVariação número {i}.")))
            .unwrap();
        assert!(correction.retrain_eligible);
        correction_ids.push(correction.id);
    }
    for correction_id in correction_ids.iter().take(10) {
        corrector
            .record_human_feedback(&HumanFeedback::new(
                correction_id,
                "prof-1",
                [140.0; NUM_COMPETENCIES],
                720.0,
            ))
            .unwrap();
    }

    let selector = TrainingSelector::new(store, TrainingCfg::default());
    match selector.select_training_candidates(0.85, 600).unwrap() {
        SelectionOutcome::InsufficientSamples { found, required } => {
            assert_eq!(found, 40);
            assert_eq!(required, 50);
        }
        SelectionOutcome::Selected(_) => panic!("40 samples must not satisfy a 50 minimum"),
    }
}

#[test]
fn human_feedback_outranks_high_confidence_inferences() {
    let store = Arc::new(MemoryStore::new());
    let corrector = corrector_with(agreeing_members(), store.clone(), EngineConfig::default());

    let mut correction_ids = Vec::new();
    for i in 0..5 {
        let correction = corrector
            .correct(&Essay::new(format!("{ESSAY}\n\nVariação número {i}.")))
            .unwrap();
        correction_ids.push(correction.id);
    }
    for correction_id in correction_ids.iter().take(2) {
        corrector
            .record_human_feedback(&HumanFeedback::new(
                correction_id,
                "prof-2",
                [160.0; NUM_COMPETENCIES],
                800.0,
            ))
            .unwrap();
    }

    let selector = TrainingSelector::new(
        store,
        TrainingCfg {
            min_samples: 3,
            ..TrainingCfg::default()
        },
    );
    let outcome = selector.select_training_candidates(0.85, 100).unwrap();
    let candidates = match outcome {
        SelectionOutcome::Selected(candidates) => candidates,
        other => panic!("expected a selected set, got {other:?}"),
    };

    assert_eq!(candidates.len(), 7);
    assert!(candidates[..2]
        .iter()
        .all(|c| c.provenance == Provenance::HumanFeedback));
    assert!(candidates[2..]
        .iter()
        .all(|c| c.provenance == Provenance::HighConfidenceInference));
}
