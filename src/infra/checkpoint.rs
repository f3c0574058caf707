// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Every file lives directly in the model directory and is
// addressed by a stem; the recorder adds the extension:
//
//   models/
//     lstm_wt-103.mpk        ← pretrained language model
//     itos_wt-103.json       ← its vocabulary
//     enc.mpk                ← fine-tuned encoder
//     lstm_imdb-clas.mpk     ← trained classifier
//     lstm_imdb-clas.json    ← TrainConfig used to build it
//
// Loading weights needs a module of the same shape. The saved
// config (architecture, dataset → class count) rebuilds that
// module before the record is loaded into it.
//
// Burn's CompactRecorder:
//   - Serialises module parameters to MessagePack
//   - Stores floats at half precision
//   - Type-safe: loading fails if the shapes don't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;

/// Stem of the fine-tuned encoder shared by the two training phases.
pub const ENCODER_STEM: &str = "enc";

/// Extension CompactRecorder appends to every stem.
const WEIGHTS_EXT: &str = "mpk";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of a saved module, extension included.
    pub fn module_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{WEIGHTS_EXT}"))
    }

    pub fn has(&self, stem: &str) -> bool {
        self.module_path(stem).exists()
    }

    /// Record all parameters of `module` under `stem`.
    pub fn save_module<B: Backend, M: Module<B>>(&self, stem: &str, module: &M) -> Result<()> {
        let path = self.dir.join(stem);
        CompactRecorder::new()
            .record(module.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;
        tracing::info!("Saved weights '{}'", self.module_path(stem).display());
        Ok(())
    }

    /// Load the weights saved under `stem` into `module`, which must have
    /// the same shape.
    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        stem:   &str,
        module: M,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(stem);
        let record: M::Record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load weights '{}'", self.module_path(stem).display()))?;
        tracing::info!("Loaded weights '{}'", self.module_path(stem).display());
        Ok(module.load_record(record))
    }

    pub fn save_config(&self, stem: &str, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(format!("{stem}.json"));
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self, stem: &str) -> Result<TrainConfig> {
        let path = self.dir.join(format!("{stem}.json"));
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Vocabulary of a pretrained language model.
    pub fn load_itos(&self, pretrain_name: &str) -> Result<Vec<String>> {
        let path = self.dir.join(format!("itos_{pretrain_name}.json"));
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read pretrained vocabulary '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed pretrained vocabulary '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::RnnEncoderConfig;

    type TestBackend = NdArray;

    #[test]
    fn test_module_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let device = Default::default();
        let cfg = RnnEncoderConfig::new(10, 4, 6, 2);

        let saved = cfg.init::<TestBackend>(&device);
        assert!(!ckpt.has(ENCODER_STEM));
        ckpt.save_module(ENCODER_STEM, &saved).unwrap();
        assert!(ckpt.has(ENCODER_STEM));

        let loaded = ckpt
            .load_module(ENCODER_STEM, cfg.init::<TestBackend>(&device), &device)
            .unwrap();
        let a: Vec<f32> = saved.embedding.weight.val().into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.embedding.weight.val().into_data().to_vec().unwrap();
        // Half-precision storage
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2);
        }
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg = TrainConfig { name: "xnli-clas".into(), bs: 32, ..TrainConfig::default() };
        ckpt.save_config("lstm_xnli-clas", &cfg).unwrap();
        assert_eq!(ckpt.load_config("lstm_xnli-clas").unwrap(), cfg);
    }

    #[test]
    fn test_pretrained_vocab() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("itos_wt-103.json"), r#"["xxunk","xxpad","the"]"#).unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert_eq!(ckpt.load_itos("wt-103").unwrap(), vec!["xxunk", "xxpad", "the"]);
        assert!(ckpt.load_itos("missing").is_err());
    }
}
