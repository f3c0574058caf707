// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implement burn's Batcher trait to turn item vectors into
// tensors on the loader's device.
//
// Language-model items are all exactly `bptt` long, so the
// flatten-then-reshape trick works directly:
//   [s1_t1, ..., s1_tT, s2_t1, ..., sN_tT] → [N, T]
// A batch made of first windows starts its rows afresh.
//
// Classifier items have different lengths. They are padded on
// the LEFT with the padding id up to the longest item, so the
// last time step of every row is a real token; the pooling
// head reads its final hidden state from there.

use std::marker::PhantomData;

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::{ClasItem, LmItem};

// ─── Language model ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct LmBatch<B: Backend> {
    /// [batch, bptt]
    pub inputs:  Tensor<B, 2, Int>,
    /// [batch, bptt]
    pub targets: Tensor<B, 2, Int>,
    /// No earlier window to carry the LSTM state from
    pub reset:   bool,
}

#[derive(Clone, Debug)]
pub struct LmBatcher<B: Backend> {
    _backend: PhantomData<B>,
}

impl<B: Backend> LmBatcher<B> {
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<B: Backend> Batcher<B, LmItem, LmBatch<B>> for LmBatcher<B> {
    fn batch(&self, items: Vec<LmItem>, device: &B::Device) -> LmBatch<B> {
        let batch_size = items.len();
        let seq_len    = items[0].input.len();
        let reset      = items[0].window == 0;

        let inputs: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input.iter().map(|&x| x as i32))
            .collect();
        let targets: Vec<i32> = items
            .iter()
            .flat_map(|s| s.target.iter().map(|&x| x as i32))
            .collect();

        LmBatch {
            inputs:  Tensor::<B, 1, Int>::from_ints(inputs.as_slice(), device)
                .reshape([batch_size, seq_len]),
            targets: Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device)
                .reshape([batch_size, seq_len]),
            reset,
        }
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ClasBatch<B: Backend> {
    /// [batch, longest item], left-padded
    pub ids:    Tensor<B, 2, Int>,
    /// [batch]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ClasBatcher<B: Backend> {
    pad_id:   u32,
    _backend: PhantomData<B>,
}

impl<B: Backend> ClasBatcher<B> {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id, _backend: PhantomData }
    }
}

impl<B: Backend> Batcher<B, ClasItem, ClasBatch<B>> for ClasBatcher<B> {
    fn batch(&self, items: Vec<ClasItem>, device: &B::Device) -> ClasBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.iter().map(|s| s.ids.len()).max().unwrap_or(0).max(1);

        let mut flat = Vec::with_capacity(batch_size * seq_len);
        for item in &items {
            let pad = seq_len - item.ids.len();
            flat.extend(std::iter::repeat(self.pad_id as i32).take(pad));
            flat.extend(item.ids.iter().map(|&x| x as i32));
        }
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        ClasBatch {
            ids:    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
                .reshape([batch_size, seq_len]),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device),
        }
    }
}
