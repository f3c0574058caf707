// ============================================================
// Layer 3 — Supported Datasets
// ============================================================
// Only two classification datasets have readers: IMDb movie
// reviews (binary sentiment, English only) and XNLI (three-way
// natural language inference in 15 languages).

use std::{fmt, str::FromStr};

use anyhow::bail;

/// The 15 languages XNLI ships dev/test data for.
pub const XNLI_LANGS: [&str; 15] = [
    "ar", "bg", "de", "el", "en", "es", "fr", "hi", "ru", "sw", "th", "tr", "ur", "vi", "zh",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Imdb,
    Xnli,
}

impl DatasetKind {
    /// Directory name under `data/`, also the CLI spelling.
    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Imdb => "imdb",
            DatasetKind::Xnli => "xnli",
        }
    }

    /// Class names in label-id order.
    pub fn class_names(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Imdb => &["neg", "pos"],
            DatasetKind::Xnli => &["contradiction", "entailment", "neutral"],
        }
    }

    pub fn num_classes(self) -> usize {
        self.class_names().len()
    }

    /// Label id of a class name, if the dataset knows it.
    pub fn label_id(self, class: &str) -> Option<usize> {
        self.class_names().iter().position(|c| *c == class)
    }

    pub fn supports_lang(self, lang: &str) -> bool {
        match self {
            DatasetKind::Imdb => lang == "en",
            DatasetKind::Xnli => XNLI_LANGS.contains(&lang),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "imdb" => Ok(DatasetKind::Imdb),
            "xnli" => Ok(DatasetKind::Xnli),
            other => bail!("Error: {other} processing is not implemented."),
        }
    }
}
