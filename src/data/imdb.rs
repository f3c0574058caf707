// ============================================================
// Layer 4 — IMDb Reader
// ============================================================
// Reads the Large Movie Review Dataset in its extracted layout:
//
//   data/imdb/
//     train/
//       neg/  0_3.txt 1_1.txt ...
//       pos/  0_9.txt ...
//       unsup/          ← ignored, unlabelled
//     test/
//       neg/ pos/
//
// One review per file. The label is the sub-directory name.
// IMDb ships no validation split, so `val` is carved out of
// `train` with a seeded shuffle; `tst` is the official test set.
//
// Files are visited in sorted order so the token stream (and
// with it the vocabulary tie-breaking) does not depend on the
// order the filesystem returns entries in.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{splitter::split_train_val, tokenizer::WordTokenizer};
use crate::domain::{
    dataset_kind::DatasetKind,
    labeled_text::{LabeledText, SplitTexts},
    traits::ClassificationSource,
};

pub struct ImdbReader {
    /// `data/imdb`
    dir:            PathBuf,
    valid_fraction: f64,
    seed:           u64,
    tokenizer:      WordTokenizer,
}

impl ImdbReader {
    pub fn new(dir: impl Into<PathBuf>, valid_fraction: f64, seed: u64) -> Self {
        Self {
            dir: dir.into(),
            valid_fraction,
            seed,
            tokenizer: WordTokenizer::new(),
        }
    }

    /// Read every labelled review under `<dir>/<part>/{neg,pos}`.
    fn read_part(&self, part: &str) -> Result<Vec<LabeledText>> {
        let mut texts = Vec::new();

        for (label, class) in DatasetKind::Imdb.class_names().iter().enumerate() {
            let class_dir = self.dir.join(part).join(class);
            for path in sorted_txt_files(&class_dir)? {
                match fs::read_to_string(&path) {
                    Ok(raw) => {
                        let tokens = self.tokenizer.tokenize_example(&[raw.as_str()])?;
                        texts.push(LabeledText::new(tokens, label));
                    }
                    // A single unreadable review is not worth aborting the run for
                    Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
                }
            }
        }

        tracing::info!("Read {} IMDb reviews from '{}'", texts.len(), part);
        Ok(texts)
    }
}

impl ClassificationSource for ImdbReader {
    fn read_splits(&self, _lang: &str) -> Result<SplitTexts> {
        let train = self.read_part("train")?;
        let tst   = self.read_part("test")?;
        let (trn, val) = split_train_val(train, 1.0 - self.valid_fraction, self.seed);
        Ok(SplitTexts { trn, val, tst })
    }
}

/// All `*.txt` files directly inside `dir`, sorted by path.
fn sorted_txt_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_review(root: &Path, part: &str, class: &str, name: &str, text: &str) {
        let dir = root.join(part).join(class);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_reads_labels_from_directory_names() {
        let tmp = tempfile::tempdir().unwrap();
        write_review(tmp.path(), "train", "neg", "0_1.txt", "Awful.");
        write_review(tmp.path(), "train", "pos", "0_9.txt", "Superb!");
        write_review(tmp.path(), "test",  "neg", "0_2.txt", "Dull.");
        write_review(tmp.path(), "test",  "pos", "0_8.txt", "Fun.");

        let reader = ImdbReader::new(tmp.path(), 0.0, 42);
        let splits = reader.read_splits("en").unwrap();

        assert_eq!(splits.trn.len(), 2);
        assert!(splits.val.is_empty());
        assert_eq!(splits.tst.len(), 2);
        assert_eq!(splits.tst[0].tokens, vec!["xxbos", "dull", "."]);
        assert_eq!(splits.tst[0].label, 0);
        assert_eq!(splits.tst[1].label, 1);
    }

    #[test]
    fn test_validation_is_carved_from_train() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..10 {
            write_review(tmp.path(), "train", "pos", &format!("{i}_9.txt"), "good");
            write_review(tmp.path(), "train", "neg", &format!("{i}_1.txt"), "bad");
        }
        write_review(tmp.path(), "test", "pos", "0_9.txt", "good");
        fs::create_dir_all(tmp.path().join("test").join("neg")).unwrap();

        let splits = ImdbReader::new(tmp.path(), 0.2, 42).read_splits("en").unwrap();
        assert_eq!(splits.trn.len(), 16);
        assert_eq!(splits.val.len(), 4);
        assert_eq!(splits.tst.len(), 1);
    }

    #[test]
    fn test_missing_class_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_review(tmp.path(), "train", "neg", "0_1.txt", "Awful.");
        assert!(ImdbReader::new(tmp.path(), 0.1, 42).read_splits("en").is_err());
    }
}
