// src/bin/grade.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use redator::analysis::LinguisticAnalyzer;
use redator::config::{load_config, EngineConfig};
use redator::core::{Essay, Scorer};
use redator::corrector::Corrector;
use redator::encoder::Encoder;
use redator::ensemble::Ensemble;
use redator::explain::Explainer;
use redator::feedback::FeedbackSynthesizer;
use redator::model::{FsModelRepository, ModelRepository, SeededModelRepository};
use redator::storage::{CorrectionStore, SqliteStore};

type B = burn_ndarray::NdArray<f32>;

/// Scores one essay from a text file and prints the correction.
#[derive(Parser)]
#[command(name = "grade", version)]
struct Args {
    /// Path to a UTF-8 text file with the essay.
    essay: PathBuf,

    /// Optional TOML config; defaults apply when absent.
    #[arg(long)]
    config: Option<String>,

    /// Directory with trained member records. Without it the ensemble is
    /// initialized from deterministic seeds.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// SQLite database path.
    #[arg(long, default_value = "corrections.db")]
    db: PathBuf,

    /// Essay title, when known.
    #[arg(long)]
    title: Option<String>,

    /// Emit the full correction as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    let text = std::fs::read_to_string(&args.essay)
        .with_context(|| format!("reading {}", args.essay.display()))?;
    let mut essay = Essay::new(text);
    if let Some(title) = args.title {
        essay = essay.with_title(title);
    }

    let device = burn_ndarray::NdArrayDevice::default();
    let members: Vec<redator::model::NeuralScorer<B>> = match &args.model_dir {
        Some(dir) => FsModelRepository::new(dir.clone(), cfg.model.clone())
            .load(&cfg.model.version, &device)?,
        None => SeededModelRepository::new(cfg.model.clone()).load(&cfg.model.version, &device)?,
    };
    let members: Vec<Box<dyn Scorer>> = members
        .into_iter()
        .map(|m| Box::new(m) as Box<dyn Scorer>)
        .collect();

    let ensemble = Arc::new(Ensemble::new(
        members,
        cfg.model.version.clone(),
        cfg.confidence.clone(),
    ));
    let analyzer = Arc::new(LinguisticAnalyzer::new(cfg.analysis.clone()));
    let synthesizer = FeedbackSynthesizer::new(cfg.feedback.clone(), cfg.analysis.clone());
    let store: Arc<dyn CorrectionStore> = Arc::new(SqliteStore::open(&args.db)?);
    let encoder = Encoder::new(cfg.model.vocab_size, cfg.model.seq_len);

    let corrector = Corrector::new(
        encoder,
        ensemble,
        analyzer,
        Explainer::default(),
        synthesizer,
        store,
        cfg,
    );

    let correction = corrector.correct(&essay)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&correction)?);
        return Ok(());
    }

    println!("{}", correction.summary);
    println!();
    for comp in &correction.competencies {
        println!("Competência {}: {}/200", comp.index, comp.value.round() as i64);
        println!("  {}", comp.feedback);
        for strength in &comp.strengths {
            println!("  + {strength}");
        }
        for improvement in &comp.improvements {
            println!("  - {improvement}");
        }
    }
    println!();
    println!("{}", correction.overall_feedback);
    println!();
    println!(
        "confiança: {:.2} ({}) | modelo {} | {} ms",
        correction.confidence,
        correction.confidence_tier.as_str(),
        correction.model_version,
        correction.latency_ms
    );

    Ok(())
}
