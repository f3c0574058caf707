// ============================================================
// Layer 2 — Run Validation
// ============================================================
// Checks a TrainConfig before any file is read. Every failure
// aborts the run with an "Error: ..." message naming the
// offending setting.
//
//   check_data      dataset / language / directory layout
//   check_training  model directory, architecture, sizes, and
//                   the fine-tuned encoder when fine-tuning is off

use anyhow::{ensure, Result};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::domain::dataset_kind::DatasetKind;
use crate::infra::checkpoint::{CheckpointManager, ENCODER_STEM};

/// Directories a validated run reads from and caches into.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub dataset:     DatasetKind,
    /// `<data_dir>/<dataset>`
    pub dataset_dir: PathBuf,
    /// `<data_dir>/<dataset>/tmp`
    pub tmp_dir:     PathBuf,
}

pub fn check_data(cfg: &TrainConfig) -> Result<DataPaths> {
    let dataset: DatasetKind = cfg.dataset.parse()?;
    ensure!(
        dataset != DatasetKind::Imdb || cfg.lang == "en",
        "Error: IMDb is only available in English."
    );
    ensure!(
        dataset.supports_lang(&cfg.lang),
        "Error: {dataset} is not available in '{}'.",
        cfg.lang
    );

    let data_dir = Path::new(&cfg.data_dir);
    let dir_name = data_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ensure!(
        dir_name == "data",
        "Error: Name of data directory should be data, not {dir_name}."
    );

    let dataset_dir = data_dir.join(dataset.name());
    ensure!(data_dir.exists(), "Error: {} does not exist.", data_dir.display());
    ensure!(dataset_dir.exists(), "Error: {} does not exist.", dataset_dir.display());

    let tmp_dir = dataset_dir.join("tmp");
    Ok(DataPaths { dataset, dataset_dir, tmp_dir })
}

/// Returns the model directory.
pub fn check_training(cfg: &TrainConfig) -> Result<PathBuf> {
    let model_dir = PathBuf::from(&cfg.model_dir);
    ensure!(model_dir.exists(), "Error: {} does not exist.", model_dir.display());
    ensure!(
        cfg.arch.is_available(),
        "Error: the {} architecture is not available, use --arch lstm.",
        cfg.arch.name()
    );
    ensure!(cfg.bs > 0, "Error: batch size must be positive.");
    ensure!(cfg.bptt > 0, "Error: bptt must be positive.");
    ensure!(cfg.max_vocab > 0, "Error: max_vocab must be positive.");
    let enc = cfg.encoder_config(1);
    ensure!(
        enc.emb_size > 0 && enc.hidden_size > 0 && enc.num_layers > 0,
        "Error: emb_sz, nh and nl must be positive."
    );
    ensure!(
        cfg.lm_lr_min > 0.0 && cfg.lm_lr_max > 0.0 && cfg.clas_lr > 0.0,
        "Error: learning rates must be positive."
    );
    ensure!(
        cfg.valid_fraction > 0.0 && cfg.valid_fraction < 1.0,
        "Error: valid fraction must be in (0, 1), got {}.",
        cfg.valid_fraction
    );

    if !cfg.fine_tune {
        let ckpt = CheckpointManager::new(&model_dir);
        ensure!(
            ckpt.has(ENCODER_STEM),
            "Error: no fine-tuned encoder at {}. Run with --fine-tune true first.",
            ckpt.module_path(ENCODER_STEM).display()
        );
    }
    Ok(model_dir)
}
