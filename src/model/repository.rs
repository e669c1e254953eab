// src/model/repository.rs
use std::path::PathBuf;

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::config::ModelCfg;
use crate::error::CorrectionError;
use crate::model::scorer::{EssayScorerNet, EssayScorerNetRecord, NeuralScorer};

/// Loads versioned parameter sets. Members load once at process start and
/// stay immutable for the process lifetime; a version switch builds a
/// whole new ensemble, so no request ever observes a mix of versions.
pub trait ModelRepository<B: Backend> {
    fn load(
        &self,
        version: &str,
        device: &B::Device,
    ) -> Result<Vec<NeuralScorer<B>>, CorrectionError>;
}

/// Reads trained member records from `{base_dir}/{version}/scorer_{i}.mpk`.
/// Missing members are skipped; zero loadable members is `ModelUnavailable`.
pub struct FsModelRepository {
    base_dir: PathBuf,
    cfg: ModelCfg,
}

impl FsModelRepository {
    pub fn new(base_dir: impl Into<PathBuf>, cfg: ModelCfg) -> Self {
        Self {
            base_dir: base_dir.into(),
            cfg,
        }
    }
}

impl<B: Backend> ModelRepository<B> for FsModelRepository {
    fn load(
        &self,
        version: &str,
        device: &B::Device,
    ) -> Result<Vec<NeuralScorer<B>>, CorrectionError> {
        let version_dir = self.base_dir.join(version);
        let mut members = Vec::with_capacity(self.cfg.ensemble_size);

        for i in 0..self.cfg.ensemble_size {
            // The recorder appends its own extension to the stem.
            let stem = version_dir.join(format!("scorer_{i}"));
            if !stem.with_extension("bin").exists() {
                tracing::warn!(member = i, path = %stem.display(), "member record not found");
                continue;
            }

            let record: EssayScorerNetRecord<B> = BinFileRecorder::<FullPrecisionSettings>::new()
                .load(stem.clone(), device)
                .map_err(|e| {
                    CorrectionError::Config(format!("bad record {}: {e}", stem.display()))
                })?;

            let net = EssayScorerNet::new(
                self.cfg.vocab_size,
                self.cfg.d_model,
                self.cfg.n_heads,
                device,
            )
            .load_record(record);

            info!(member = i, version, "scorer member loaded");
            members.push(NeuralScorer::new(net, device.clone()));
        }

        if members.is_empty() {
            return Err(CorrectionError::ModelUnavailable);
        }
        Ok(members)
    }
}

/// Builds fresh members from deterministic seeds (member i seeds the
/// backend with base_seed + i before init). Used for bootstrap runs and
/// tests; identical config + seed reproduces identical parameters.
pub struct SeededModelRepository {
    cfg: ModelCfg,
}

impl SeededModelRepository {
    pub fn new(cfg: ModelCfg) -> Self {
        Self { cfg }
    }
}

impl<B: Backend> ModelRepository<B> for SeededModelRepository {
    fn load(
        &self,
        version: &str,
        device: &B::Device,
    ) -> Result<Vec<NeuralScorer<B>>, CorrectionError> {
        if self.cfg.ensemble_size == 0 {
            return Err(CorrectionError::ModelUnavailable);
        }

        let mut members = Vec::with_capacity(self.cfg.ensemble_size);
        for i in 0..self.cfg.ensemble_size {
            B::seed(device, self.cfg.base_seed + i as u64);
            let net = EssayScorerNet::new(
                self.cfg.vocab_size,
                self.cfg.d_model,
                self.cfg.n_heads,
                device,
            );
            // Parameters are lazily initialized; fork materializes them here,
            // while the member's seed is active, instead of on the first
            // (concurrent) score call.
            let net = net.fork(device);
            members.push(NeuralScorer::new(net, device.clone()));
        }

        info!(
            version,
            members = members.len(),
            "seeded ensemble initialized"
        );
        Ok(members)
    }
}
