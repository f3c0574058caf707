// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw dataset files to tensor batches:
//
//   ImdbReader / XnliReader → read files, label examples
//       │
//       ▼
//   Preprocessor + WordTokenizer → clean text, split into tokens
//       │
//       ▼
//   (domain::Vocab)         → token strings to ids
//       │
//       ▼
//   LmDataset / ClasDataset → implement burn's Dataset trait
//       │
//       ▼
//   LmBatcher / ClasBatcher → stack items into tensors
//       │
//       ▼
//   DataLoader              → feeds batches to the trainer

/// IMDb movie review reader
pub mod imdb;

/// XNLI sentence-pair reader
pub mod xnli;

/// Cleans raw review / sentence text
pub mod preprocessor;

/// Word-level tokenization and example markers
pub mod tokenizer;

/// Seeded train/validation split
pub mod splitter;

/// burn datasets for the language model and the classifier
pub mod dataset;

/// burn batchers for both datasets
pub mod batcher;
