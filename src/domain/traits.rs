// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer reads datasets through this trait only,
// so IMDb and XNLI (and any later reader) are interchangeable.

use anyhow::Result;

use crate::domain::labeled_text::SplitTexts;

// ─── ClassificationSource ─────────────────────────────────────────────────────
/// Anything that can produce tokenised, labelled train/valid/test splits.
///
/// Implementations:
///   - ImdbReader → `data/imdb/{train,test}/{neg,pos}/*.txt`
///   - XnliReader → XNLI-MT training TSV + XNLI dev/test TSVs
pub trait ClassificationSource {
    /// Read all three splits for one language.
    fn read_splits(&self, lang: &str) -> Result<SplitTexts>;
}
