// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn model and training code lives here.
//
//   model.rs      — encoder, language model, classifier,
//                   layer groups
//   schedule.rs   — discriminative rates, one-cycle, freezing
//   trainer.rs    — staged training loop, LM fine-tuning,
//                   classifier stages
//   pretrained.rs — re-index a pretrained LM to a new vocabulary
//   evaluator.rs  — loss / accuracy over a split
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Howard & Ruder (2018) ULMFiT

/// Encoder, language model and classifier
pub mod model;

/// Learning-rate policies and freeze states
pub mod schedule;

/// Staged training loop
pub mod trainer;

/// Pretrained language model import
pub mod pretrained;

/// Loss and accuracy over a dataset
pub mod evaluator;
