// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 0: Select the device, GPU or CPU       (Layer 5)
//   Step 1: Validate the run configuration      (Layer 2)
//   Step 2: Read + cache ids, build vocabulary  (Layer 4 / 6)
//   Step 3: Fine-tune the pretrained LM, save
//           its encoder as "enc"                (Layer 5 / 6)
//   Step 4: Load "enc" into a classifier and
//           train it in three stages            (Layer 5 / 6)
//   Step 5: Save weights + config               (Layer 6)
//   Step 6: Report test accuracy                (Layer 5)
//
// Steps 1-6 are generic over the autodiff backend; step 0 picks
// wgpu or ndarray.
//
// Reference: Howard & Ruder (2018) ULMFiT
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::{backend::Autodiff, module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::application::{
    prepare_use_case::prepare,
    validation::{check_data, check_training},
};
use crate::data::dataset::ClasDataset;
use crate::infra::{
    checkpoint::{CheckpointManager, ENCODER_STEM},
    metrics::MetricsLogger,
};
use crate::ml::{
    evaluator::{evaluate_classifier, EvalStats},
    model::{Architecture, ClassifierConfig, LanguageModelConfig, RnnEncoderConfig},
    pretrained::adapt_language_model,
    trainer::{
        fine_tune_language_model, select_device, train_classifier, ComputeDevice, CpuBackend,
        GpuBackend,
    },
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings of a run. Saved next to the classifier weights so
// `evaluate` can rebuild the same model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub lang:           String,
    /// -1 runs on the CPU
    pub cuda_id:        i32,
    pub pretrain_name:  String,
    pub model_dir:      String,
    pub arch:           Architecture,
    /// Layer sizes overriding those of `arch`
    #[serde(default)]
    pub emb_sz:         Option<usize>,
    #[serde(default)]
    pub nh:             Option<usize>,
    #[serde(default)]
    pub nl:             Option<usize>,
    pub fine_tune:      bool,
    pub max_vocab:      usize,
    pub bs:             usize,
    pub bptt:           usize,
    pub name:           String,
    pub dataset:        String,
    pub lm_epochs:      usize,
    pub lm_lr_min:      f64,
    pub lm_lr_max:      f64,
    pub clas_lr:        f64,
    /// beta_1 at the ends and at the peak of a one-cycle stage
    pub moms:           (f64, f64),
    pub wd:             f64,
    pub final_epochs:   usize,
    pub seed:           u64,
    pub valid_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            lang:           "en".to_string(),
            cuda_id:        0,
            pretrain_name:  "wt-103".to_string(),
            model_dir:      "models".to_string(),
            arch:           Architecture::Lstm,
            emb_sz:         None,
            nh:             None,
            nl:             None,
            fine_tune:      true,
            max_vocab:      30000,
            bs:             70,
            bptt:           70,
            name:           "imdb-clas".to_string(),
            dataset:        "imdb".to_string(),
            lm_epochs:      2,
            lm_lr_min:      1e-4,
            lm_lr_max:      1e-2,
            clas_lr:        5e-3,
            moms:           (0.8, 0.7),
            wd:             1e-7,
            final_epochs:   10,
            seed:           42,
            valid_fraction: 0.1,
        }
    }
}

impl TrainConfig {
    /// `<arch>_<name>`: weights, config and metrics file stem.
    pub fn model_stem(&self) -> String {
        format!("{}_{}", self.arch.name(), self.name)
    }

    /// The classifier pools over at most this many trailing positions.
    pub fn max_len(&self) -> usize {
        20 * self.bptt
    }

    pub fn encoder_config(&self, vocab_size: usize) -> RnnEncoderConfig {
        let (emb, nh, nl) = self.arch.dims();
        RnnEncoderConfig::new(
            vocab_size,
            self.emb_sz.unwrap_or(emb),
            self.nh.unwrap_or(nh),
            self.nl.unwrap_or(nl),
        )
    }

    pub fn classifier_config(&self, vocab_size: usize, num_classes: usize) -> ClassifierConfig {
        ClassifierConfig::new(self.encoder_config(vocab_size), num_classes)
            .with_bptt(self.bptt)
            .with_max_len(self.max_len())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<EvalStats> {
        // ── Step 0: Device ────────────────────────────────────────────────────
        match select_device(self.config.cuda_id) {
            ComputeDevice::Gpu(device) => self.run::<Autodiff<GpuBackend>>(&device),
            ComputeDevice::Cpu(device) => self.run::<Autodiff<CpuBackend>>(&device),
        }
    }

    /// The pipeline on backend `B`; returns the test-split scores.
    fn run<B: AutodiffBackend>(&self, device: &B::Device) -> Result<EvalStats> {
        let cfg = &self.config;
        println!("Dataset: {}. Language: {}.", cfg.dataset, cfg.lang);

        // ── Step 1: Validate ──────────────────────────────────────────────────
        let paths     = check_data(cfg)?;
        let model_dir = check_training(cfg)?;
        let ckpt      = CheckpointManager::new(&model_dir);
        let metrics   = MetricsLogger::new(model_dir.join(format!("{}_metrics.csv", cfg.model_stem())))?;

        // ── Step 2: Ids + vocabulary ──────────────────────────────────────────
        let data = prepare(cfg, &paths)?;
        println!(
            "Train size: {}. Valid size: {}. Test size: {}.",
            data.trn.ids.len(), data.val.ids.len(), data.tst.ids.len(),
        );

        // ── Step 3: Language model fine-tuning ────────────────────────────────
        if cfg.fine_tune {
            println!("Fine-tuning the language model...");
            let pretrained_itos = ckpt.load_itos(&cfg.pretrain_name)?;
            let pretrained = LanguageModelConfig::new(cfg.encoder_config(pretrained_itos.len()))
                .init::<B>(device);
            let pretrained = ckpt.load_module(
                &format!("{}_{}", cfg.arch.name(), cfg.pretrain_name),
                pretrained,
                device,
            )?;
            let lm = adapt_language_model(pretrained, &pretrained_itos, data.vocab.itos(), device)?;

            let lm = fine_tune_language_model(lm, &data.trn.ids, &data.val.ids, cfg, device, &metrics)?;
            ckpt.save_module(ENCODER_STEM, &lm.encoder)?;
        }

        // ── Step 4: Classifier ────────────────────────────────────────────────
        let mut classifier = cfg
            .classifier_config(data.vocab.len(), paths.dataset.num_classes())
            .init::<B>(device);
        classifier.encoder = ckpt.load_module(ENCODER_STEM, classifier.encoder, device)?;

        let classifier = train_classifier(
            classifier,
            &data.trn.ids,
            &data.trn.labels,
            &data.val.ids,
            &data.val.labels,
            cfg,
            device,
            &metrics,
        )?;

        // ── Step 5: Save ──────────────────────────────────────────────────────
        println!("Saving models at {}", model_dir.display());
        ckpt.save_module(&cfg.model_stem(), &classifier)?;
        ckpt.save_config(&cfg.model_stem(), cfg)?;

        // ── Step 6: Test accuracy ─────────────────────────────────────────────
        let classifier = classifier.valid();
        let stats = evaluate_classifier(
            &classifier,
            ClasDataset::new(&data.tst.ids, &data.tst.labels),
            cfg.bs,
            device,
        );
        println!("Test loss: {:.4}. Test accuracy: {:.2}%", stats.loss(), stats.accuracy() * 100.0);
        tracing::info!("Training complete!");
        Ok(stats)
    }
}
