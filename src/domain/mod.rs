// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the system works with:
// datasets, splits, labelled examples and the vocabulary.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only structs, enums and traits

// Supported datasets and their label sets
pub mod dataset_kind;

// trn / val / tst
pub mod split;

// A tokenised example with its class id
pub mod labeled_text;

// Token <-> id mapping with reserved unknown / padding ids
pub mod vocab;

// Core abstractions that other layers implement
pub mod traits;
