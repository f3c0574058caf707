// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch of
// each stage.
//
// Metrics recorded per epoch:
//   - stage:      "lm", "head", "last2" or "all"
//   - epoch:      the epoch number within the stage (1, 2, ...)
//   - train_loss: average cross-entropy loss on training batches
//   - valid_loss: average cross-entropy loss on validation batches
//   - accuracy:   next-token accuracy (lm) or class accuracy
//
// Output file: <model_dir>/<arch>_<name>_metrics.csv
//
// Example CSV output:
//   stage,epoch,train_loss,valid_loss,accuracy
//   lm,1,4.512300,4.389100,0.281000
//   head,1,0.612000,0.498700,0.771000
//   ...
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of metrics data for a single epoch of a stage
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub stage: String,

    /// Starts at 1 in every stage
    pub epoch: usize,

    pub train_loss: f64,

    /// Should track train_loss; divergence indicates overfitting
    pub valid_loss: f64,

    /// Range: [0.0, 1.0]
    pub accuracy: f64,
}

impl EpochMetrics {
    pub fn new(
        stage:      &str,
        epoch:      usize,
        train_loss: f64,
        valid_loss: f64,
        accuracy:   f64,
    ) -> Self {
        Self { stage: stage.to_string(), epoch, train_loss, valid_loss, accuracy }
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so repeated
    /// runs append to the same log.
    pub fn new(csv_path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = csv_path.into();
        if let Some(dir) = csv_path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "stage,epoch,train_loss,valid_loss,accuracy")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.stage,
            m.epoch,
            m.train_loss,
            m.valid_loss,
            m.accuracy,
        )?;

        tracing::info!(
            "[{}] epoch {}: train_loss={:.4}, valid_loss={:.4}, accuracy={:.4}",
            m.stage,
            m.epoch,
            m.train_loss,
            m.valid_loss,
            m.accuracy,
        );

        Ok(())
    }
}
