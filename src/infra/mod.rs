// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of the
// other layers:
//
//   vocab_store.rs — vocabulary JSON per language
//   id_cache.rs    — encoded splits + labels, so a second run
//                    skips reading and tokenizing raw text
//   checkpoint.rs  — module weights (burn CompactRecorder),
//                    the TrainConfig JSON, pretrained vocab
//   metrics.rs     — per-epoch metrics CSV
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Vocabulary persistence
pub mod vocab_store;

/// Cached token ids and labels per split
pub mod id_cache;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
