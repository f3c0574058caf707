// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal per command (prepare, train, evaluate).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file formats (that's Layer 4 and 6)
//   - Only workflow coordination and run validation
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Checks on the run configuration
pub mod validation;

// Read / cache / encode the dataset
pub mod prepare_use_case;

// The full training workflow
pub mod train_use_case;

// Score a trained classifier
pub mod evaluate_use_case;
