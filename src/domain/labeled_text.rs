// ============================================================
// Layer 3 — Labelled Text Domain Types
// ============================================================
// One tokenised example with its class id, and the three
// splits (train / validation / test) a reader produces.
//
// By the time a LabeledText exists the raw file has already
// been cleaned and tokenised; the rest of the pipeline only
// ever deals with token strings and, later, token ids.

use serde::{Deserialize, Serialize};

use crate::domain::split::Split;

/// A tokenised example and its integer class id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    /// Token strings, already lower-cased and marker-prefixed
    pub tokens: Vec<String>,

    /// Class id, `0..num_classes`
    pub label: usize,
}

impl LabeledText {
    pub fn new(tokens: Vec<String>, label: usize) -> Self {
        Self { tokens, label }
    }
}

/// The labeled texts of all three splits, as returned by a reader.
#[derive(Debug, Clone, Default)]
pub struct SplitTexts {
    pub trn: Vec<LabeledText>,
    pub val: Vec<LabeledText>,
    pub tst: Vec<LabeledText>,
}

impl SplitTexts {
    pub fn get(&self, split: Split) -> &[LabeledText] {
        match split {
            Split::Trn => &self.trn,
            Split::Val => &self.val,
            Split::Tst => &self.tst,
        }
    }

    /// Labels of one split, in example order.
    pub fn labels(&self, split: Split) -> Vec<u32> {
        self.get(split).iter().map(|t| t.label as u32).collect()
    }
}
