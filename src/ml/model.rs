// ============================================================
// Layer 5 — Models
// ============================================================
// Three burn modules built from one encoder:
//
//   RnnEncoder     Embedding → LSTM × num_layers
//                  (last layer projects back to emb_size)
//   LanguageModel  RnnEncoder → Linear to the vocabulary
//   TextClassifier RnnEncoder over bptt chunks → [last | max | mean]
//                  pooling → BatchNorm → Dropout → Linear → ReLU
//                  → BatchNorm → Dropout → Linear to classes
//
// The encoder is the part that moves between the two tasks:
// it is fine-tuned inside the language model, saved, then
// loaded into the classifier.
//
// LSTM state flows from one window (language model) or chunk
// (classifier) to the next, detached: gradients stop at the
// window boundary.
//
// Both task models implement `LayerGroups`, which splits their
// gradients per layer group so the trainer can freeze groups
// and give each its own learning rate.

use burn::{
    module::AutodiffModule,
    nn::{
        loss::CrossEntropyLossConfig,
        lstm::{Lstm, LstmConfig, LstmState},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear,
        LinearConfig,
    },
    optim::GradientsParams,
    prelude::*,
    tensor::{activation::relu, backend::AutodiffBackend},
};
use serde::{Deserialize, Serialize};

use crate::domain::vocab::PAD_ID;

// ─── Architecture ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Lstm,
    Qrnn,
}

impl Architecture {
    pub fn name(self) -> &'static str {
        match self {
            Architecture::Lstm => "lstm",
            Architecture::Qrnn => "qrnn",
        }
    }

    /// (embedding size, hidden size, layers)
    pub fn dims(self) -> (usize, usize, usize) {
        match self {
            Architecture::Lstm => (400, 1150, 3),
            Architecture::Qrnn => (400, 1550, 3),
        }
    }

    /// burn has LSTM layers but no quasi-recurrent ones.
    pub fn is_available(self) -> bool {
        matches!(self, Architecture::Lstm)
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct RnnEncoderConfig {
    pub vocab_size:  usize,
    pub emb_size:    usize,
    pub hidden_size: usize,
    pub num_layers:  usize,
    #[config(default = 0.25)]
    pub input_dropout: f64,
    #[config(default = 0.15)]
    pub hidden_dropout: f64,
}

impl RnnEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RnnEncoder<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.emb_size).init(device);
        let last = self.num_layers.saturating_sub(1);
        let layers = (0..self.num_layers)
            .map(|i| {
                let d_input  = if i == 0 { self.emb_size } else { self.hidden_size };
                let d_hidden = if i == last { self.emb_size } else { self.hidden_size };
                LstmConfig::new(d_input, d_hidden, true).init(device)
            })
            .collect();
        RnnEncoder {
            embedding,
            layers,
            input_dropout:  DropoutConfig::new(self.input_dropout).init(),
            hidden_dropout: DropoutConfig::new(self.hidden_dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct RnnEncoder<B: Backend> {
    pub embedding:      Embedding<B>,
    pub layers:         Vec<Lstm<B>>,
    pub input_dropout:  Dropout,
    pub hidden_dropout: Dropout,
}

/// One LSTM state per layer.
pub type EncoderState<B> = Vec<LstmState<B, 2>>;

impl<B: Backend> RnnEncoder<B> {
    /// ids: [batch, seq_len] → hidden states of the last layer: [batch, seq_len, emb_size],
    /// starting from `state` (zeros when `None`). Also returns the state after
    /// the last position, detached.
    pub fn forward_with_state(
        &self,
        ids:   Tensor<B, 2, Int>,
        state: Option<EncoderState<B>>,
    ) -> (Tensor<B, 3>, EncoderState<B>) {
        let mut x = self.input_dropout.forward(self.embedding.forward(ids));
        let mut incoming = state.unwrap_or_default().into_iter();
        let mut outgoing = Vec::with_capacity(self.layers.len());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let (out, state) = layer.forward(x, incoming.next());
            outgoing.push(LstmState::new(state.cell.detach(), state.hidden.detach()));
            x = if i == last { out } else { self.hidden_dropout.forward(out) };
        }
        (x, outgoing)
    }
}

// ─── Loss output ──────────────────────────────────────────────────────────────
/// Loss plus the flattened logits/targets it was computed from, so callers
/// can derive accuracy without a second forward pass.
pub struct LossOutput<B: Backend> {
    pub loss:    Tensor<B, 1>,
    /// [N, classes]
    pub logits:  Tensor<B, 2>,
    /// [N]
    pub targets: Tensor<B, 1, Int>,
}

// ─── Language model ───────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LanguageModelConfig {
    pub encoder: RnnEncoderConfig,
    #[config(default = 0.1)]
    pub output_dropout: f64,
}

impl LanguageModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LanguageModel<B> {
        LanguageModel {
            encoder:        self.encoder.init(device),
            output_dropout: DropoutConfig::new(self.output_dropout).init(),
            decoder:        LinearConfig::new(self.encoder.emb_size, self.encoder.vocab_size)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LanguageModel<B: Backend> {
    pub encoder:        RnnEncoder<B>,
    pub output_dropout: Dropout,
    pub decoder:        Linear<B>,
}

impl<B: Backend> LanguageModel<B> {
    /// Loss of one window that continues the rows of the previous one.
    pub fn forward_loss_with_state(
        &self,
        inputs:  Tensor<B, 2, Int>,
        targets: Tensor<B, 2, Int>,
        state:   Option<EncoderState<B>>,
    ) -> (LossOutput<B>, EncoderState<B>) {
        let [batch_size, seq_len] = inputs.dims();
        let (hidden, state) = self.encoder.forward_with_state(inputs, state);
        let logits = self.decoder.forward(self.output_dropout.forward(hidden));
        let [_, _, vocab] = logits.dims();

        let logits  = logits.reshape([batch_size * seq_len, vocab]);
        let targets = targets.reshape([batch_size * seq_len]);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets.clone());

        (LossOutput { loss, logits, targets }, state)
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub encoder:     RnnEncoderConfig,
    pub num_classes: usize,
    #[config(default = 50)]
    pub head_hidden: usize,
    #[config(default = 0.4)]
    pub pool_dropout: f64,
    #[config(default = 0.1)]
    pub head_dropout: f64,
    /// Chunk length the encoder reads a document in
    #[config(default = 70)]
    pub bptt: usize,
    /// Trailing positions kept for pooling
    #[config(default = 1400)]
    pub max_len: usize,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TextClassifier<B> {
        let pooled = 3 * self.encoder.emb_size;
        TextClassifier {
            encoder:      self.encoder.init(device),
            pool_norm:    BatchNormConfig::new(pooled).init(device),
            pool_dropout: DropoutConfig::new(self.pool_dropout).init(),
            head_hidden:  LinearConfig::new(pooled, self.head_hidden).init(device),
            head_norm:    BatchNormConfig::new(self.head_hidden).init(device),
            head_dropout: DropoutConfig::new(self.head_dropout).init(),
            head_out:     LinearConfig::new(self.head_hidden, self.num_classes).init(device),
            pad_id:       PAD_ID as usize,
            bptt:         self.bptt.max(1),
            max_len:      self.max_len.max(1),
        }
    }
}

#[derive(Module, Debug)]
pub struct TextClassifier<B: Backend> {
    pub encoder:      RnnEncoder<B>,
    pub pool_norm:    BatchNorm<B>,
    pub pool_dropout: Dropout,
    pub head_hidden:  Linear<B>,
    pub head_norm:    BatchNorm<B>,
    pub head_dropout: Dropout,
    pub head_out:     Linear<B>,
    pub pad_id:       usize,
    pub bptt:         usize,
    pub max_len:      usize,
}

impl<B: Backend> TextClassifier<B> {
    /// Encode `ids` chunk by chunk, carrying the LSTM state along.
    /// Returns the outputs of the last `max_len` positions and which of
    /// those positions are padding.
    fn encode(&self, ids: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 2, Bool>) {
        let [batch_size, seq_len] = ids.dims();
        let keep_from = seq_len.saturating_sub(self.max_len);

        let mut state   = None;
        let mut outputs = Vec::new();
        let mut start   = 0;
        while start < seq_len {
            let end = (start + self.bptt).min(seq_len);
            let chunk = ids.clone().slice([0..batch_size, start..end]);
            let (out, next) = self.encoder.forward_with_state(chunk, state);
            state = Some(next);
            if end > keep_from {
                let [_, _, emb] = out.dims();
                let from = keep_from.max(start) - start;
                outputs.push(out.slice([0..batch_size, from..end - start, 0..emb]));
            }
            start = end;
        }

        let pad_mask = ids
            .slice([0..batch_size, keep_from..seq_len])
            .equal_elem(self.pad_id as i64);
        (Tensor::cat(outputs, 1), pad_mask)
    }

    /// ids: [batch, seq_len], left-padded → class logits: [batch, classes]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let (hidden, pad_mask) = self.encode(ids); // [batch, kept, emb], [batch, kept]
        let [batch_size, kept, emb] = hidden.dims();

        // Left padding puts the last real token at the final position
        let last = hidden
            .clone()
            .slice([0..batch_size, kept - 1..kept, 0..emb])
            .reshape([batch_size, emb]);

        let mask3 = pad_mask
            .clone()
            .unsqueeze_dim::<3>(2)
            .expand([batch_size, kept, emb]);

        let max_pool = hidden
            .clone()
            .mask_fill(mask3.clone(), -1.0e9)
            .max_dim(1)
            .reshape([batch_size, emb]);

        let real_tokens = pad_mask
            .bool_not()
            .float()
            .sum_dim(1)
            .clamp_min(1.0)
            .expand([batch_size, emb]);
        let mean_pool = hidden
            .mask_fill(mask3, 0.0)
            .sum_dim(1)
            .reshape([batch_size, emb])
            .div(real_tokens);

        let pooled = Tensor::cat(vec![last, max_pool, mean_pool], 1); // [batch, 3*emb]
        let x = self.pool_dropout.forward(self.pool_norm.forward(pooled));
        let x = relu(self.head_hidden.forward(x));
        let x = self.head_dropout.forward(self.head_norm.forward(x));
        self.head_out.forward(x)
    }

    pub fn forward_loss(&self, ids: Tensor<B, 2, Int>, labels: Tensor<B, 1, Int>) -> LossOutput<B> {
        let logits = self.forward(ids);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels.clone());
        LossOutput { loss, logits, targets: labels }
    }
}

// ─── Layer groups ─────────────────────────────────────────────────────────────
/// Splits a model's parameters into ordered groups (input side first).
/// A group can be frozen or given its own learning rate.
pub trait LayerGroups<B: AutodiffBackend>: AutodiffModule<B> {
    fn num_groups(&self) -> usize;

    /// Take this model's gradients out of `grads`, tagged with their group.
    /// A group may appear more than once when it spans several submodules.
    fn group_grads(&self, grads: &mut B::Gradients) -> Vec<(usize, GradientsParams)>;
}

/// Groups: one per LSTM layer, then embedding + decoder.
impl<B: AutodiffBackend> LayerGroups<B> for LanguageModel<B> {
    fn num_groups(&self) -> usize {
        self.encoder.layers.len() + 1
    }

    fn group_grads(&self, grads: &mut B::Gradients) -> Vec<(usize, GradientsParams)> {
        let top = self.encoder.layers.len();
        let mut groups: Vec<(usize, GradientsParams)> = self
            .encoder
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| (i, GradientsParams::from_module::<B, _>(grads, layer)))
            .collect();
        groups.push((top, GradientsParams::from_module::<B, _>(grads, &self.encoder.embedding)));
        groups.push((top, GradientsParams::from_module::<B, _>(grads, &self.decoder)));
        groups
    }
}

/// Groups: embedding, one per LSTM layer, then the pooling head.
impl<B: AutodiffBackend> LayerGroups<B> for TextClassifier<B> {
    fn num_groups(&self) -> usize {
        self.encoder.layers.len() + 2
    }

    fn group_grads(&self, grads: &mut B::Gradients) -> Vec<(usize, GradientsParams)> {
        let head = self.encoder.layers.len() + 1;
        let mut groups = vec![(0, GradientsParams::from_module::<B, _>(grads, &self.encoder.embedding))];
        for (i, layer) in self.encoder.layers.iter().enumerate() {
            groups.push((i + 1, GradientsParams::from_module::<B, _>(grads, layer)));
        }
        groups.push((head, GradientsParams::from_module::<B, _>(grads, &self.pool_norm)));
        groups.push((head, GradientsParams::from_module::<B, _>(grads, &self.head_hidden)));
        groups.push((head, GradientsParams::from_module::<B, _>(grads, &self.head_norm)));
        groups.push((head, GradientsParams::from_module::<B, _>(grads, &self.head_out)));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;
    type TestAutodiff = Autodiff<NdArray>;

    fn tiny_encoder(vocab: usize) -> RnnEncoderConfig {
        RnnEncoderConfig::new(vocab, 8, 12, 3)
    }

    fn ids<B: Backend>(rows: &[[i32; 4]], device: &B::Device) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = rows.iter().flatten().copied().collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), 4])
    }

    #[test]
    fn test_arch_sizes() {
        assert_eq!(Architecture::Lstm.dims(), (400, 1150, 3));
        assert_eq!(Architecture::Qrnn.dims(), (400, 1550, 3));
        assert!(!Architecture::Qrnn.is_available());
    }

    #[test]
    fn test_encoder_ends_in_embedding_size() {
        let device = Default::default();
        let enc = tiny_encoder(20).init::<TestBackend>(&device);
        let (out, state) = enc.forward_with_state(ids(&[[2, 3, 4, 5], [6, 7, 8, 9]], &device), None);
        assert_eq!(out.dims(), [2, 4, 8]);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_language_model_logits_cover_vocab() {
        let device = Default::default();
        let lm = LanguageModelConfig::new(tiny_encoder(20)).init::<TestBackend>(&device);
        let (out, _) = lm.forward_loss_with_state(
            ids(&[[2, 3, 4, 5]], &device),
            ids(&[[3, 4, 5, 6]], &device),
            None,
        );
        assert_eq!(out.logits.dims(), [4, 20]);
        assert_eq!(out.targets.dims(), [4]);
        let loss: f32 = out.loss.into_scalar().elem();
        assert!(loss.is_finite());
    }

    #[test]
    fn test_classifier_handles_left_padding() {
        let device = Default::default();
        let clf = ClassifierConfig::new(tiny_encoder(20), 3).init::<TestBackend>(&device);
        let logits = clf.forward(ids(&[[1, 1, 2, 3], [4, 5, 6, 7]], &device));
        assert_eq!(logits.dims(), [2, 3]);
        let values: Vec<f32> = logits.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_state_carries_across_windows() {
        let device = Default::default();
        let enc = tiny_encoder(20).init::<TestBackend>(&device);
        let (full, _) = enc.forward_with_state(ids(&[[2, 3, 4, 5], [6, 7, 8, 9]], &device), None);

        let first  = Tensor::<TestBackend, 1, Int>::from_ints([2, 3, 6, 7].as_slice(), &device).reshape([2, 2]);
        let second = Tensor::<TestBackend, 1, Int>::from_ints([4, 5, 8, 9].as_slice(), &device).reshape([2, 2]);
        let (a, state) = enc.forward_with_state(first, None);
        let (b, _) = enc.forward_with_state(second, Some(state));
        assert_eq!(a.dims(), [2, 2, 8]);

        let chunked: Vec<f32> = Tensor::cat(vec![a, b], 1).into_data().to_vec().unwrap();
        let whole: Vec<f32> = full.into_data().to_vec().unwrap();
        for (x, y) in chunked.iter().zip(&whole) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_classifier_pools_only_the_last_max_len_positions() {
        let device = Default::default();
        let clf = ClassifierConfig::new(tiny_encoder(20), 2)
            .with_bptt(3)
            .with_max_len(2)
            .init::<TestBackend>(&device);
        let input = ids(&[[1, 2, 3, 4], [5, 6, 7, 8]], &device);

        let (kept, pad_mask) = clf.encode(input.clone());
        assert_eq!(kept.dims(), [2, 2, 8]);
        assert_eq!(pad_mask.dims(), [2, 2]);

        let tail: Vec<f32> = clf
            .encoder
            .forward_with_state(input, None).0
            .slice([0..2, 2..4, 0..8])
            .into_data()
            .to_vec()
            .unwrap();
        let kept: Vec<f32> = kept.into_data().to_vec().unwrap();
        for (x, y) in kept.iter().zip(&tail) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_group_counts() {
        let device = Default::default();
        let lm = LanguageModelConfig::new(tiny_encoder(20)).init::<TestAutodiff>(&device);
        let clf = ClassifierConfig::new(tiny_encoder(20), 2).init::<TestAutodiff>(&device);
        assert_eq!(lm.num_groups(), 4);
        assert_eq!(clf.num_groups(), 5);
    }

    #[test]
    fn test_group_grads_are_tagged_in_order() {
        let device = Default::default();
        let clf = ClassifierConfig::new(tiny_encoder(20), 2).init::<TestAutodiff>(&device);
        let labels = Tensor::<TestAutodiff, 1, Int>::from_ints([0, 1].as_slice(), &device);
        let out = clf.forward_loss(ids(&[[1, 2, 3, 4], [5, 6, 7, 8]], &device), labels);
        let mut grads = out.loss.backward();

        let groups: Vec<usize> = clf.group_grads(&mut grads).into_iter().map(|(g, _)| g).collect();
        assert_eq!(groups, vec![0, 1, 2, 3, 4, 4, 4, 4]);
    }
}
