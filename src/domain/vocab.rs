// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Maps token strings to integer ids and back.
//
// Layout of the id space:
//   0        xxunk   (anything not seen in the training split)
//   1        xxpad   (left padding in classifier batches)
//   2..      training tokens, most frequent first
//
// Ties in frequency keep the order in which tokens were first
// seen, so building twice from the same input always yields
// the same ids.

use std::collections::HashMap;

use anyhow::{ensure, Result};

pub const UNK: &str = "xxunk";
pub const PAD: &str = "xxpad";
pub const UNK_ID: u32 = 0;
pub const PAD_ID: u32 = 1;

/// Marks the start of every example.
pub const BOS: &str = "xxbos";
/// Introduces a field in multi-field examples (`xxfld 1 ... xxfld 2 ...`).
pub const FLD: &str = "xxfld";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocab {
    itos: Vec<String>,
    stoi: HashMap<String, u32>,
}

impl Vocab {
    /// Count tokens over the training documents and keep the `max_vocab`
    /// most frequent, behind the two reserved entries.
    pub fn build<'a>(docs: impl IntoIterator<Item = &'a [String]>, max_vocab: usize) -> Self {
        // token -> index into `counts`, which is kept in first-seen order
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, usize)> = Vec::new();

        for doc in docs {
            for tok in doc {
                let tok = tok.as_str();
                if tok == UNK || tok == PAD {
                    continue;
                }
                match index.get(tok) {
                    Some(&i) => counts[i].1 += 1,
                    None => {
                        index.insert(tok, counts.len());
                        counts.push((tok, 1));
                    }
                }
            }
        }

        // Stable sort: equal counts stay in first-seen order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(max_vocab);

        let mut itos = Vec::with_capacity(counts.len() + 2);
        itos.push(UNK.to_string());
        itos.push(PAD.to_string());
        itos.extend(counts.into_iter().map(|(tok, _)| tok.to_string()));

        Self::index(itos)
    }

    /// Rebuild a vocabulary from a persisted id → token list.
    pub fn from_itos(itos: Vec<String>) -> Result<Self> {
        ensure!(
            itos.get(UNK_ID as usize).map(String::as_str) == Some(UNK)
                && itos.get(PAD_ID as usize).map(String::as_str) == Some(PAD),
            "Vocabulary does not start with the reserved tokens '{UNK}' and '{PAD}'"
        );
        Ok(Self::index(itos))
    }

    fn index(itos: Vec<String>) -> Self {
        let stoi = itos
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
        Self { itos, stoi }
    }

    /// Id of a token, or the unknown id.
    pub fn id(&self, token: &str) -> u32 {
        self.stoi.get(token).copied().unwrap_or(UNK_ID)
    }

    pub fn encode(&self, tokens: &[String]) -> Vec<u32> {
        tokens.iter().map(|t| self.id(t)).collect()
    }

    pub fn itos(&self) -> &[String] {
        &self.itos
    }

    pub fn len(&self) -> usize {
        self.itos.len()
    }
}
