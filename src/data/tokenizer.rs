// ============================================================
// Layer 4 — Word Tokenizer
// ============================================================
// Turns cleaned text into word-level tokens using the pieces of
// the `tokenizers` crate that do not need a trained model:
//
//   BertNormalizer  → lower-case, strip control chars, put spaces
//                     around CJK ideographs (XNLI has `zh`)
//   Whitespace      → split into `\w+` runs and punctuation runs
//
// The vocabulary is ours (see domain::vocab), so no tokenizer
// model is ever trained or saved here.
//
// Every example starts with `xxbos`. Multi-field examples (XNLI
// premise + hypothesis) mark each field as `xxfld <n>`.

use anyhow::Result;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{
    NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer,
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::vocab::{BOS, FLD};

pub struct WordTokenizer {
    preprocessor:  Preprocessor,
    normalizer:    BertNormalizer,
    pre_tokenizer: Whitespace,
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self {
            preprocessor:  Preprocessor::new(),
            // clean_text, handle_chinese_chars, keep accents, lowercase
            normalizer:    BertNormalizer::new(true, true, Some(false), true),
            pre_tokenizer: Whitespace::default(),
        }
    }

    /// Word tokens of one piece of raw text, without markers.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let cleaned = self.preprocessor.clean(text);

        let mut normalized = NormalizedString::from(cleaned.as_str());
        self.normalizer
            .normalize(&mut normalized)
            .map_err(|e| anyhow::anyhow!("Normalisation error: {e}"))?;

        let mut pretokenized = PreTokenizedString::from(normalized);
        self.pre_tokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| anyhow::anyhow!("Pre-tokenisation error: {e}"))?;

        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(word, _, _)| word.to_string())
            .collect())
    }

    /// Tokens of a full example: `xxbos`, then the field tokens.
    /// With more than one field each is introduced by `xxfld <n>`.
    pub fn tokenize_example(&self, fields: &[&str]) -> Result<Vec<String>> {
        let mut tokens = vec![BOS.to_string()];
        let multi = fields.len() > 1;
        for (i, field) in fields.iter().enumerate() {
            if multi {
                tokens.push(FLD.to_string());
                tokens.push((i + 1).to_string());
            }
            tokens.extend(self.tokenize(field)?);
        }
        Ok(tokens)
    }
}

impl Default for WordTokenizer {
    fn default() -> Self {
        Self::new()
    }
}
