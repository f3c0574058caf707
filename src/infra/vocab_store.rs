// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// The vocabulary is built once from the training split and
// saved next to the cached ids, so later runs map tokens to
// exactly the same ids.
//
// On disk it is a JSON list of token strings (itos):
//   ["xxunk", "xxpad", "the", ",", ".", ...]
// Position in the list is the token id.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::vocab::Vocab;

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, lang: &str) -> PathBuf {
        self.dir.join(format!("vocab_{lang}.json"))
    }

    pub fn save(&self, lang: &str, vocab: &Vocab) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path(lang);
        fs::write(&path, serde_json::to_string(vocab.itos())?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        tracing::info!("Saved vocabulary ({} tokens) to '{}'", vocab.len(), path.display());
        Ok(())
    }

    pub fn load(&self, lang: &str) -> Result<Vocab> {
        let path = self.path(lang);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        let itos: Vec<String> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed vocabulary file '{}'", path.display()))?;
        let vocab = Vocab::from_itos(itos)?;
        tracing::info!("Loaded vocabulary ({} tokens) from '{}'", vocab.len(), path.display());
        Ok(vocab)
    }
}
