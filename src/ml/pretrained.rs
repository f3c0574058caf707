// ============================================================
// Layer 5 — Pretrained Language Model Import
// ============================================================
// The pretrained language model was trained with its own
// vocabulary (`itos_<name>.json`). Before fine-tuning, every
// vocabulary-sized parameter is re-indexed to the task
// vocabulary:
//
//   encoder embedding  [vocab, emb]  rows
//   decoder weight     [emb, vocab]  columns (transpose, remap, transpose back)
//   decoder bias       [vocab]
//
// A token the pretrained model never saw starts from the mean
// of all pretrained rows.

use std::collections::HashMap;

use anyhow::{anyhow, ensure, Result};
use burn::{module::Param, prelude::*};

use crate::ml::model::LanguageModel;

/// Re-index the `dim`-wide rows of `old` (laid out by `old_itos`) to
/// `new_itos`. Rows for tokens missing from `old_itos` are the mean row.
pub fn remap_rows(old: &[f32], dim: usize, old_itos: &[String], new_itos: &[String]) -> Vec<f32> {
    let old_rows = if dim == 0 { 0 } else { old.len() / dim };

    let mut mean = vec![0.0f32; dim];
    for row in old.chunks_exact(dim.max(1)).take(old_rows) {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    if old_rows > 0 {
        mean.iter_mut().for_each(|m| *m /= old_rows as f32);
    }

    let stoi: HashMap<&str, usize> = old_itos
        .iter()
        .enumerate()
        .take(old_rows)
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    let mut out = Vec::with_capacity(new_itos.len() * dim);
    let mut hits = 0usize;
    for token in new_itos {
        match stoi.get(token.as_str()) {
            Some(&i) => {
                out.extend_from_slice(&old[i * dim..(i + 1) * dim]);
                hits += 1;
            }
            None => out.extend_from_slice(&mean),
        }
    }
    tracing::debug!("{hits}/{} tokens found in the pretrained vocabulary", new_itos.len());
    out
}

/// Move a language model loaded with `old_itos` onto `new_itos`.
pub fn adapt_language_model<B: Backend>(
    mut lm:   LanguageModel<B>,
    old_itos: &[String],
    new_itos: &[String],
    device:   &B::Device,
) -> Result<LanguageModel<B>> {
    let [old_vocab, emb] = lm.encoder.embedding.weight.dims();
    ensure!(
        old_vocab == old_itos.len(),
        "Pretrained embedding has {old_vocab} rows but its vocabulary has {} tokens",
        old_itos.len()
    );
    let new_vocab = new_itos.len();

    let embedding = to_vec(lm.encoder.embedding.weight.val())?;
    let embedding = remap_rows(&embedding, emb, old_itos, new_itos);
    lm.encoder.embedding.weight = Param::from_tensor(
        Tensor::<B, 2>::from_data(TensorData::new(embedding, [new_vocab, emb]), device),
    );

    // Linear stores its weight as [d_input, d_output]
    let decoder = to_vec(lm.decoder.weight.val().transpose())?;
    let decoder = remap_rows(&decoder, emb, old_itos, new_itos);
    lm.decoder.weight = Param::from_tensor(
        Tensor::<B, 2>::from_data(TensorData::new(decoder, [new_vocab, emb]), device).transpose(),
    );

    if let Some(bias) = lm.decoder.bias.take() {
        let bias = remap_rows(&to_vec(bias.val())?, 1, old_itos, new_itos);
        lm.decoder.bias = Some(Param::from_tensor(
            Tensor::<B, 1>::from_data(TensorData::new(bias, [new_vocab]), device),
        ));
    }

    tracing::info!("Adapted pretrained language model: {old_vocab} → {new_vocab} tokens");
    Ok(lm)
}

fn to_vec<B: Backend, const D: usize>(t: Tensor<B, D>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read pretrained weights: {e:?}"))
}
