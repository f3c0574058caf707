// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Loss and accuracy accumulated over batches. Used by the
// trainer after every epoch, and on its own to score a saved
// classifier on the test split.
//
// argmax(1) returns [N, 1]; it is reshaped to [N] before the
// comparison with the targets.

use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::data::{batcher::ClasBatcher, dataset::ClasDataset};
use crate::domain::vocab::PAD_ID;
use crate::ml::model::{LossOutput, TextClassifier};

/// Running totals over a pass on a split.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalStats {
    pub loss_sum: f64,
    pub batches:  usize,
    pub correct:  usize,
    pub total:    usize,
}

impl EvalStats {
    pub fn record<B: Backend>(&mut self, out: LossOutput<B>) {
        let n = out.targets.dims()[0];
        let predicted = out.logits.argmax(1).reshape([n]);
        let correct: i64 = predicted
            .equal(out.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        self.loss_sum += out.loss.into_scalar().elem::<f64>();
        self.batches  += 1;
        self.correct  += correct as usize;
        self.total    += n;
    }

    /// Mean batch loss, NaN when nothing was recorded.
    pub fn loss(&self) -> f64 {
        if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total > 0 { self.correct as f64 / self.total as f64 } else { 0.0 }
    }
}

/// Score a classifier on every example of `dataset`, in order.
pub fn evaluate_classifier<B: Backend>(
    model:      &TextClassifier<B>,
    dataset:    ClasDataset,
    batch_size: usize,
    device:     &B::Device,
) -> EvalStats {
    let loader = DataLoaderBuilder::new(ClasBatcher::<B>::new(PAD_ID))
        .batch_size(batch_size)
        .num_workers(1)
        .set_device(device.clone())
        .build(dataset);

    let mut stats = EvalStats::default();
    for batch in loader.iter() {
        stats.record(model.forward_loss(batch.ids, batch.labels));
    }
    tracing::debug!("Evaluated {} examples in {} batches", stats.total, stats.batches);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::{ClassifierConfig, RnnEncoderConfig};

    type TestBackend = NdArray;

    #[test]
    fn test_record_counts_correct_predictions() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[2.0, 0.0], [0.0, 3.0], [1.0, 0.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1], &device);
        let loss = Tensor::<TestBackend, 1>::from_floats([0.5], &device);

        let mut stats = EvalStats::default();
        stats.record(LossOutput { loss, logits, targets });

        assert_eq!(stats.correct, 2);
        assert_eq!(stats.total, 3);
        assert!((stats.loss() - 0.5).abs() < 1e-6);
        assert!((stats.accuracy() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats() {
        let stats = EvalStats::default();
        assert!(stats.loss().is_nan());
        assert_eq!(stats.accuracy(), 0.0);
    }

    #[test]
    fn test_evaluate_classifier_visits_every_example() {
        let device = Default::default();
        let clf = ClassifierConfig::new(RnnEncoderConfig::new(16, 6, 8, 2), 2)
            .init::<TestBackend>(&device);
        let ds = ClasDataset::new(
            &[vec![2, 3, 4], vec![5, 6], vec![7, 8, 9, 10], vec![11]],
            &[0, 1, 1, 0],
        );

        let stats = evaluate_classifier(&clf, ds, 3, &device);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.batches, 2);
        assert!(stats.loss().is_finite());
        assert!(stats.accuracy() <= 1.0);
    }
}
