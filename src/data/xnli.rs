// ============================================================
// Layer 4 — XNLI Reader
// ============================================================
// Expected layout under data/xnli:
//
//   XNLI-MT-1.0/multinli/multinli.train.<lang>.tsv
//       premise <TAB> hypo <TAB> label          (machine-translated
//                                                MultiNLI training set)
//   XNLI-1.0/xnli.dev.tsv
//   XNLI-1.0/xnli.test.tsv
//       language, gold_label, ..., sentence1, sentence2, ...
//       (all 15 languages in one file; filtered on `language`)
//
// Splits: trn = MT training file, val = dev, tst = test.
//
// The training files spell contradiction "contradictory";
// it is normalised before the label lookup. Rows with a missing
// column or an unknown label are skipped with a warning.

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::data::tokenizer::WordTokenizer;
use crate::domain::{
    dataset_kind::DatasetKind,
    labeled_text::{LabeledText, SplitTexts},
    traits::ClassificationSource,
};

pub struct XnliReader {
    /// `data/xnli`
    dir:       PathBuf,
    tokenizer: WordTokenizer,
}

/// Column positions of the fields one TSV layout needs.
struct Columns {
    premise:    usize,
    hypothesis: usize,
    label:      usize,
    language:   Option<usize>,
}

impl XnliReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), tokenizer: WordTokenizer::new() }
    }

    fn train_file(&self, lang: &str) -> PathBuf {
        self.dir
            .join("XNLI-MT-1.0")
            .join("multinli")
            .join(format!("multinli.train.{lang}.tsv"))
    }

    fn eval_file(&self, part: &str) -> PathBuf {
        self.dir.join("XNLI-1.0").join(format!("xnli.{part}.tsv"))
    }

    fn read_tsv(&self, path: &PathBuf, lang: &str) -> Result<Vec<LabeledText>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let mut lines = content.lines();

        let header: Vec<&str> = lines
            .next()
            .with_context(|| format!("'{}' is empty", path.display()))?
            .split('\t')
            .collect();
        let cols = Columns::from_header(&header)
            .with_context(|| format!("Unexpected header in '{}'", path.display()))?;

        let mut texts   = Vec::new();
        let mut skipped = 0usize;

        for line in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            if let Some(col) = cols.language {
                if fields.get(col) != Some(&lang) {
                    continue;
                }
            }
            let (Some(premise), Some(hypothesis), Some(label)) = (
                fields.get(cols.premise),
                fields.get(cols.hypothesis),
                fields.get(cols.label).and_then(|l| parse_label(l)),
            ) else {
                skipped += 1;
                continue;
            };
            let tokens = self.tokenizer.tokenize_example(&[*premise, *hypothesis])?;
            texts.push(LabeledText::new(tokens, label));
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} malformed rows in '{}'", skipped, path.display());
        }
        tracing::info!("Read {} XNLI pairs from '{}'", texts.len(), path.display());
        Ok(texts)
    }
}

impl Columns {
    fn from_header(header: &[&str]) -> Result<Self> {
        let find = |name: &str| header.iter().position(|h| *h == name);

        // XNLI-MT training layout
        if let (Some(premise), Some(hypothesis), Some(label)) =
            (find("premise"), find("hypo"), find("label"))
        {
            return Ok(Self { premise, hypothesis, label, language: None });
        }

        // XNLI dev/test layout
        if let (Some(premise), Some(hypothesis), Some(label), Some(language)) =
            (find("sentence1"), find("sentence2"), find("gold_label"), find("language"))
        {
            return Ok(Self { premise, hypothesis, label, language: Some(language) });
        }

        bail!("expected 'premise/hypo/label' or 'language/gold_label/sentence1/sentence2' columns")
    }
}

fn parse_label(raw: &str) -> Option<usize> {
    let label = match raw.trim() {
        "contradictory" => "contradiction",
        other => other,
    };
    DatasetKind::Xnli.label_id(label)
}

impl ClassificationSource for XnliReader {
    fn read_splits(&self, lang: &str) -> Result<SplitTexts> {
        Ok(SplitTexts {
            trn: self.read_tsv(&self.train_file(lang), lang)?,
            val: self.read_tsv(&self.eval_file("dev"), lang)?,
            tst: self.read_tsv(&self.eval_file("test"), lang)?,
        })
    }
}
