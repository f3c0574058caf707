// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Staged training on top of burn's DataLoader and AdamW.
//
// A `Stage` is a number of epochs with one learning-rate policy
// and one freeze state. Per batch:
//
//   loss.backward()
//     → model.group_grads()          gradients split per layer group
//     → optim.step(lr[g], …)         once per trainable group
//
// Gradients of frozen groups are dropped, so their weights never
// move. burn's AdamW only updates parameters present in the
// gradients it is given.
//
// `StageScheduler` yields the peak-relative rate and Adam's
// beta_1 for every step. beta_1 is part of the optimizer, not of
// its state, so a momentum change rebuilds the optimizer and
// reloads the moment estimates from its record.
//
// Key Burn 0.20 insight:
//   - Training uses an AutodiffBackend for gradients
//   - model.valid() returns the model on the inner backend
//   - Validation batchers must use that inner backend too

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use anyhow::{ensure, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    data::dataloader::{DataLoader, DataLoaderBuilder},
    lr_scheduler::LrScheduler,
    module::AutodiffModule,
    optim::{AdamWConfig, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ClasBatcher, LmBatcher},
    dataset::{ClasDataset, LmDataset},
};
use crate::domain::vocab::PAD_ID;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::evaluator::EvalStats;
use crate::ml::model::{EncoderState, LanguageModel, LayerGroups, LossOutput, TextClassifier};
use crate::ml::schedule::{LearningRates, Policy, StageScheduler, Trainable};

pub type GpuBackend = Wgpu;
pub type CpuBackend = NdArray;

// ─── Device ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeDevice {
    Gpu(WgpuDevice),
    Cpu(NdArrayDevice),
}

/// `-1` selects the CPU, any other id the matching discrete GPU. A GPU
/// wgpu cannot open falls back to the CPU.
pub fn select_device(cuda_id: i32) -> ComputeDevice {
    if cuda_id >= 0 {
        let device = WgpuDevice::DiscreteGpu(cuda_id as usize);
        if has_adapter(&device) {
            tracing::info!("Using WGPU device: {:?}", device);
            return ComputeDevice::Gpu(device);
        }
        println!("GPU {cuda_id} not available. Setting device=-1.");
    }
    tracing::info!("Using the ndarray CPU backend");
    ComputeDevice::Cpu(NdArrayDevice::Cpu)
}

/// wgpu panics on the first tensor when no adapter matches the device.
fn has_adapter(device: &WgpuDevice) -> bool {
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let found = panic::catch_unwind(AssertUnwindSafe(|| {
        Tensor::<GpuBackend, 1>::zeros([1], device).into_data();
    }))
    .is_ok();
    panic::set_hook(hook);
    found
}

// ─── Stages ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name:      String,
    pub epochs:    usize,
    pub rates:     LearningRates,
    pub policy:    Policy,
    pub moms:      (f64, f64),
    pub trainable: Trainable,
}

/// All layers, constant discriminative rates.
pub fn language_model_stage(cfg: &TrainConfig) -> Stage {
    Stage {
        name:      "lm".into(),
        epochs:    cfg.lm_epochs,
        rates:     LearningRates::Slice(cfg.lm_lr_min, cfg.lm_lr_max),
        policy:    Policy::Constant,
        moms:      cfg.moms,
        trainable: Trainable::All,
    }
}

/// Head only, then the last two groups, then everything.
pub fn classifier_stages(cfg: &TrainConfig) -> Vec<Stage> {
    let stage = |name: &str, epochs, trainable| Stage {
        name:   name.into(),
        epochs,
        rates:  LearningRates::Uniform(cfg.clas_lr),
        policy: Policy::one_cycle(),
        moms:   cfg.moms,
        trainable,
    };
    vec![
        stage("head", 1, Trainable::LastGroups(1)),
        stage("last2", 1, Trainable::LastGroups(2)),
        stage("all", cfg.final_epochs, Trainable::All),
    ]
}

/// AdamW (decoupled weight decay). `beta_1` is set per step from the
/// stage's momentum curve.
pub fn optimizer_config(cfg: &TrainConfig) -> AdamWConfig {
    AdamWConfig::new()
        .with_beta_1(cfg.moms.0 as f32)
        .with_beta_2(0.99)
        .with_weight_decay(cfg.wd as f32)
}

// ─── Generic stage loop ───────────────────────────────────────────────────────
#[allow(clippy::too_many_arguments)]
pub fn fit_stage<B, M, TB, VB>(
    mut model:      M,
    stage:          &Stage,
    optim_cfg:      &AdamWConfig,
    batch_size:     usize,
    train_loader:   &Arc<dyn DataLoader<B, TB>>,
    valid_loader:   &Arc<dyn DataLoader<B::InnerBackend, VB>>,
    mut train_step: impl FnMut(&M, TB) -> LossOutput<B>,
    mut valid_step: impl FnMut(&M::InnerModule, VB) -> LossOutput<B::InnerBackend>,
    metrics:        &MetricsLogger,
) -> Result<M>
where
    B: AutodiffBackend,
    M: LayerGroups<B>,
{
    if stage.epochs == 0 {
        tracing::info!("Stage '{}': 0 epochs, skipped", stage.name);
        return Ok(model);
    }

    let steps_per_epoch = train_loader.num_items().div_ceil(batch_size.max(1));
    ensure!(steps_per_epoch > 0, "Stage '{}' has no training batches", stage.name);

    let num_groups  = model.num_groups();
    let base_rates  = stage.rates.per_group(num_groups);
    let peak        = stage.rates.max();
    let first_group = stage.trainable.first_group(num_groups);
    ensure!(peak > 0.0, "Stage '{}' has no positive learning rate", stage.name);

    let mut sched  = StageScheduler::new(stage.policy, peak, stage.moms, steps_per_epoch * stage.epochs);
    let mut beta_1 = sched.momentum();
    let mut optim  = optim_cfg.clone().with_beta_1(beta_1 as f32).init::<B, M>();

    tracing::info!(
        "Stage '{}': {} epochs × {} steps, groups {}..{} trainable, rates {:?}",
        stage.name, stage.epochs, steps_per_epoch, first_group, num_groups, base_rates,
    );

    for epoch in 1..=stage.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let out = train_step(&model, batch);
            train_loss_sum += out.loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let momentum = sched.momentum();
            if momentum != beta_1 {
                optim = optim_cfg
                    .clone()
                    .with_beta_1(momentum as f32)
                    .init::<B, M>()
                    .load_record(optim.to_record());
                beta_1 = momentum;
            }
            let lr = sched.step();

            let mut grads = out.loss.backward();
            for (group, group_grads) in model.group_grads(&mut grads) {
                if group >= first_group {
                    model = optim.step(lr * base_rates[group] / peak, model, group_grads);
                }
            }
        }

        let train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut valid = EvalStats::default();
        for batch in valid_loader.iter() {
            valid.record(valid_step(&model_valid, batch));
        }

        println!(
            "[{}] Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | accuracy={:.1}%",
            stage.name, epoch, stage.epochs, train_loss, valid.loss(), valid.accuracy() * 100.0,
        );
        metrics.log(&EpochMetrics::new(
            &stage.name, epoch, train_loss, valid.loss(), valid.accuracy(),
        ))?;
    }

    Ok(model)
}

// ─── Language model fine-tuning ───────────────────────────────────────────────
/// Each of the `bs` rows of the token stream is read window after window,
/// with the LSTM state carried from one window of a row to the next.
pub fn fine_tune_language_model<B: AutodiffBackend>(
    model:   LanguageModel<B>,
    trn:     &[Vec<u32>],
    val:     &[Vec<u32>],
    cfg:     &TrainConfig,
    device:  &B::Device,
    metrics: &MetricsLogger,
) -> Result<LanguageModel<B>> {
    let train_dataset = LmDataset::new(trn, cfg.bptt, cfg.bs);
    let valid_dataset = LmDataset::new(val, cfg.bptt, cfg.bs);
    tracing::info!(
        "Language model data: {} train tokens, {} valid tokens",
        train_dataset.token_count(), valid_dataset.token_count(),
    );

    // Unshuffled: consecutive batches continue the same rows
    let train_loader = DataLoaderBuilder::new(LmBatcher::<B>::new())
        .batch_size(cfg.bs)
        .num_workers(1)
        .set_device(device.clone())
        .build(train_dataset);
    let valid_loader = DataLoaderBuilder::new(LmBatcher::<B::InnerBackend>::new())
        .batch_size(cfg.bs)
        .num_workers(1)
        .set_device(device.clone())
        .build(valid_dataset);

    let mut train_state: Option<EncoderState<B>> = None;
    let mut valid_state: Option<EncoderState<B::InnerBackend>> = None;
    fit_stage(
        model,
        &language_model_stage(cfg),
        &optimizer_config(cfg),
        cfg.bs,
        &train_loader,
        &valid_loader,
        |m: &LanguageModel<B>, b| {
            let carried = if b.reset { None } else { train_state.take() };
            let (out, state) = m.forward_loss_with_state(b.inputs, b.targets, carried);
            train_state = Some(state);
            out
        },
        |m: &LanguageModel<B::InnerBackend>, b| {
            let carried = if b.reset { None } else { valid_state.take() };
            let (out, state) = m.forward_loss_with_state(b.inputs, b.targets, carried);
            valid_state = Some(state);
            out
        },
        metrics,
    )
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[allow(clippy::too_many_arguments)]
pub fn train_classifier<B: AutodiffBackend>(
    mut model:  TextClassifier<B>,
    trn_ids:    &[Vec<u32>],
    trn_labels: &[u32],
    val_ids:    &[Vec<u32>],
    val_labels: &[u32],
    cfg:        &TrainConfig,
    device:     &B::Device,
    metrics:    &MetricsLogger,
) -> Result<TextClassifier<B>> {
    let train_dataset = ClasDataset::new(trn_ids, trn_labels);
    let valid_dataset = ClasDataset::new(val_ids, val_labels);
    tracing::info!(
        "Classifier data: {} train, {} valid examples",
        train_dataset.sample_count(), valid_dataset.sample_count(),
    );

    let train_loader = DataLoaderBuilder::new(ClasBatcher::<B>::new(PAD_ID))
        .batch_size(cfg.bs)
        .shuffle(cfg.seed)
        .num_workers(1)
        .set_device(device.clone())
        .build(train_dataset);
    let valid_loader = DataLoaderBuilder::new(ClasBatcher::<B::InnerBackend>::new(PAD_ID))
        .batch_size(cfg.bs)
        .num_workers(1)
        .set_device(device.clone())
        .build(valid_dataset);

    let optim_cfg = optimizer_config(cfg);
    for stage in classifier_stages(cfg) {
        model = fit_stage(
            model,
            &stage,
            &optim_cfg,
            cfg.bs,
            &train_loader,
            &valid_loader,
            |m: &TextClassifier<B>, b| m.forward_loss(b.ids, b.labels),
            |m: &TextClassifier<B::InnerBackend>, b| m.forward_loss(b.ids, b.labels),
            metrics,
        )?;
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;

    use crate::ml::model::{ClassifierConfig, LanguageModelConfig, RnnEncoderConfig};

    type TestAutodiff = Autodiff<NdArray>;

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            bs: 2,
            bptt: 4,
            lm_epochs: 1,
            final_epochs: 1,
            ..TrainConfig::default()
        }
    }

    fn docs() -> Vec<Vec<u32>> {
        vec![vec![2, 3, 4, 5, 6, 7], vec![8, 9, 2, 3], vec![4, 5, 6, 7, 8, 9, 2]]
    }

    fn values<B: Backend, const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    /// Run one classifier stage over `docs()` and return the model.
    fn fit_classifier_stage(
        model: TextClassifier<TestAutodiff>,
        stage: &Stage,
        ids:   &[Vec<u32>],
    ) -> Result<TextClassifier<TestAutodiff>> {
        let dir = tempfile::tempdir().unwrap();
        let metrics = MetricsLogger::new(dir.path().join("m.csv")).unwrap();
        let device = Default::default();
        let cfg = tiny_config();
        let labels: Vec<u32> = (0..ids.len() as u32).map(|i| i % 2).collect();

        let train_loader = DataLoaderBuilder::new(ClasBatcher::<TestAutodiff>::new(PAD_ID))
            .batch_size(cfg.bs)
            .set_device(device)
            .build(ClasDataset::new(ids, &labels));
        let valid_loader = DataLoaderBuilder::new(ClasBatcher::<NdArray>::new(PAD_ID))
            .batch_size(cfg.bs)
            .set_device(device)
            .build(ClasDataset::new(ids, &labels));

        fit_stage(
            model,
            stage,
            &optimizer_config(&cfg),
            cfg.bs,
            &train_loader,
            &valid_loader,
            |m: &TextClassifier<TestAutodiff>, b| m.forward_loss(b.ids, b.labels),
            |m: &TextClassifier<NdArray>, b| m.forward_loss(b.ids, b.labels),
            &metrics,
        )
    }

    fn tiny_classifier() -> TextClassifier<TestAutodiff> {
        ClassifierConfig::new(RnnEncoderConfig::new(12, 6, 8, 2), 2)
            .with_bptt(3)
            .init::<TestAutodiff>(&Default::default())
    }

    #[test]
    fn test_cpu_device_selection() {
        assert_eq!(select_device(-1), ComputeDevice::Cpu(NdArrayDevice::Cpu));
        assert_eq!(select_device(-7), ComputeDevice::Cpu(NdArrayDevice::Cpu));
    }

    #[test]
    fn test_missing_gpu_falls_back_without_panicking() {
        match select_device(0) {
            ComputeDevice::Gpu(device) => assert_eq!(device, WgpuDevice::DiscreteGpu(0)),
            ComputeDevice::Cpu(device) => assert_eq!(device, NdArrayDevice::Cpu),
        }
    }

    #[test]
    fn test_stage_plan() {
        let cfg = TrainConfig::default();
        let lm = language_model_stage(&cfg);
        assert_eq!(lm.epochs, 2);
        assert_eq!(lm.rates, LearningRates::Slice(1e-4, 1e-2));
        assert_eq!(lm.policy, Policy::Constant);
        assert_eq!(lm.trainable, Trainable::All);

        let stages = classifier_stages(&cfg);
        let plan: Vec<(usize, Trainable)> = stages.iter().map(|s| (s.epochs, s.trainable)).collect();
        assert_eq!(
            plan,
            vec![(1, Trainable::LastGroups(1)), (1, Trainable::LastGroups(2)), (10, Trainable::All)],
        );
        assert!(stages.iter().all(|s| s.rates == LearningRates::Uniform(5e-3)));
        assert!(stages.iter().all(|s| s.policy == Policy::one_cycle()));
        assert!(stages.iter().all(|s| s.moms == (0.8, 0.7)));
    }

    #[test]
    fn test_fine_tune_language_model_runs_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = MetricsLogger::new(dir.path().join("m.csv")).unwrap();
        let device = Default::default();
        let cfg = tiny_config();

        let lm = LanguageModelConfig::new(RnnEncoderConfig::new(12, 6, 8, 2))
            .init::<TestAutodiff>(&device);
        let docs = docs();
        let lm = fine_tune_language_model(lm, &docs, &docs, &cfg, &device, &metrics).unwrap();
        assert_eq!(lm.encoder.embedding.weight.dims(), [12, 6]);

        let csv = std::fs::read_to_string(dir.path().join("m.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().starts_with("lm,1,"));
    }

    #[test]
    fn test_head_stage_leaves_the_encoder_alone() {
        let model = tiny_classifier();
        let before = values(model.encoder.embedding.weight.val());

        let stages = classifier_stages(&tiny_config());
        let model = fit_classifier_stage(model, &stages[0], &docs()).unwrap();

        assert_eq!(values(model.encoder.embedding.weight.val()), before);
    }

    #[test]
    fn test_last2_stage_trains_only_the_top_lstm_and_head() {
        // Groups: embedding, lstm 0, lstm 1, head
        let model = tiny_classifier();
        let embedding = values(model.encoder.embedding.weight.val());
        let lstm0 = values(model.encoder.layers[0].input_gate.input_transform.weight.val());
        let lstm1 = values(model.encoder.layers[1].input_gate.input_transform.weight.val());
        let head = values(model.head_out.weight.val());

        let stages = classifier_stages(&tiny_config());
        let model = fit_classifier_stage(model, &stages[1], &docs()).unwrap();

        assert_eq!(values(model.encoder.embedding.weight.val()), embedding);
        assert_eq!(values(model.encoder.layers[0].input_gate.input_transform.weight.val()), lstm0);
        assert_ne!(values(model.encoder.layers[1].input_gate.input_transform.weight.val()), lstm1);
        assert_ne!(values(model.head_out.weight.val()), head);
    }

    #[test]
    fn test_zero_epoch_stage_is_skipped() {
        let model = tiny_classifier();
        let before = values(model.head_out.weight.val());
        let stage = Stage { epochs: 0, ..classifier_stages(&tiny_config())[2].clone() };

        // No training data at all: only an epoch would need a batch
        let model = fit_classifier_stage(model, &stage, &[]).unwrap();
        assert_eq!(values(model.head_out.weight.val()), before);

        let stage = Stage { epochs: 1, ..stage };
        assert!(fit_classifier_stage(tiny_classifier(), &stage, &[]).is_err());
    }

    #[test]
    fn test_optimizer_is_adamw_with_the_configured_decay() {
        let cfg = TrainConfig { wd: 0.01, ..tiny_config() };
        let json: serde_json::Value =
            serde_json::from_str(&optimizer_config(&cfg).to_string()).unwrap();
        assert!((json["beta_1"].as_f64().unwrap() - 0.8).abs() < 1e-6);
        assert!((json["beta_2"].as_f64().unwrap() - 0.99).abs() < 1e-6);
        assert!((json["weight_decay"].as_f64().unwrap() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_momentum_change_keeps_training() {
        // Three batches per epoch; one-cycle moves beta_1 on every step
        let ids: Vec<Vec<u32>> = (0..6).map(|i| vec![2 + i, 3 + i, 4]).collect();
        let stage = Stage { epochs: 2, ..classifier_stages(&tiny_config())[2].clone() };
        let model = fit_classifier_stage(tiny_classifier(), &stage, &ids).unwrap();
        assert!(values(model.head_out.weight.val()).iter().all(|v| v.is_finite()));
    }
}
