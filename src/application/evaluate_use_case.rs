// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a trained classifier on one split:
//
//   Step 1: Load <arch>_<name>.json → the TrainConfig of the run
//   Step 2: Load the cached ids and vocabulary of that run
//   Step 3: Rebuild the classifier and load its weights
//   Step 4: Loss + accuracy on the requested split
//
// Runs on a plain (non-autodiff) backend: no gradients needed.

use anyhow::Result;
use burn::prelude::*;

use crate::application::{prepare_use_case::prepare, validation::check_data};
use crate::data::dataset::ClasDataset;
use crate::domain::split::Split;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    evaluator::{evaluate_classifier, EvalStats},
    model::Architecture,
    trainer::{select_device, ComputeDevice, CpuBackend, GpuBackend},
};

pub struct EvaluateUseCase {
    model_dir: String,
    stem:      String,
    split:     Split,
    cuda_id:   i32,
}

impl EvaluateUseCase {
    pub fn new(model_dir: String, arch: Architecture, name: &str, split: Split, cuda_id: i32) -> Self {
        Self {
            model_dir,
            stem: format!("{}_{}", arch.name(), name),
            split,
            cuda_id,
        }
    }

    pub fn execute(&self) -> Result<EvalStats> {
        match select_device(self.cuda_id) {
            ComputeDevice::Gpu(device) => self.run::<GpuBackend>(&device),
            ComputeDevice::Cpu(device) => self.run::<CpuBackend>(&device),
        }
    }

    fn run<B: Backend>(&self, device: &B::Device) -> Result<EvalStats> {
        // ── Step 1: Run configuration ─────────────────────────────────────────
        let ckpt = CheckpointManager::new(&self.model_dir);
        let cfg  = ckpt.load_config(&self.stem)?;

        // ── Step 2: Cached data ───────────────────────────────────────────────
        let paths = check_data(&cfg)?;
        let data  = prepare(&cfg, &paths)?;
        let split = data.get(self.split);

        // ── Step 3: Classifier ────────────────────────────────────────────────
        let classifier = cfg
            .classifier_config(data.vocab.len(), paths.dataset.num_classes())
            .init::<B>(device);
        let classifier = ckpt.load_module(&self.stem, classifier, device)?;

        // ── Step 4: Score ─────────────────────────────────────────────────────
        let stats = evaluate_classifier(
            &classifier,
            ClasDataset::new(&split.ids, &split.labels),
            cfg.bs,
            device,
        );
        println!(
            "{} on {}: loss={:.4} accuracy={:.2}% ({} examples)",
            self.stem, self.split, stats.loss(), stats.accuracy() * 100.0, stats.total,
        );
        Ok(stats)
    }
}
