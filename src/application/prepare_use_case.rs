// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Turns a dataset directory into encoded splits:
//
//   cache present (tmp/trn_<lang>_ids.json)
//     → load vocabulary + ids + labels, read no raw text
//   otherwise
//     → reader (IMDb / XNLI) → tokens per split
//     → vocabulary from the training split only
//     → encode every split, unknown tokens → xxunk
//     → write vocabulary, val, tst, and trn last
//
// `train` runs this as its first step; `prepare` runs it alone
// so the slow tokenization can happen ahead of training.

use anyhow::Result;

use crate::application::{
    train_use_case::TrainConfig,
    validation::{check_data, DataPaths},
};
use crate::data::{imdb::ImdbReader, xnli::XnliReader};
use crate::domain::{
    dataset_kind::DatasetKind,
    split::Split,
    traits::ClassificationSource,
    vocab::Vocab,
};
use crate::infra::{id_cache::IdCache, vocab_store::VocabStore};

/// Encoded examples of one split and their labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitIds {
    pub ids:    Vec<Vec<u32>>,
    pub labels: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct PreparedData {
    pub vocab: Vocab,
    pub trn:   SplitIds,
    pub val:   SplitIds,
    pub tst:   SplitIds,
}

impl PreparedData {
    pub fn get(&self, split: Split) -> &SplitIds {
        match split {
            Split::Trn => &self.trn,
            Split::Val => &self.val,
            Split::Tst => &self.tst,
        }
    }
}

fn source(cfg: &TrainConfig, paths: &DataPaths) -> Box<dyn ClassificationSource> {
    match paths.dataset {
        DatasetKind::Imdb => Box::new(ImdbReader::new(&paths.dataset_dir, cfg.valid_fraction, cfg.seed)),
        DatasetKind::Xnli => Box::new(XnliReader::new(&paths.dataset_dir)),
    }
}

/// Load the cached splits, or read, encode and cache them.
pub fn prepare(cfg: &TrainConfig, paths: &DataPaths) -> Result<PreparedData> {
    let cache = IdCache::new(&paths.tmp_dir);
    let store = VocabStore::new(&paths.tmp_dir);

    if cache.is_cached(&cfg.lang) {
        println!("Loading the cached data...");
        let vocab = store.load(&cfg.lang)?;
        let load = |split: Split| -> Result<SplitIds> {
            let (ids, labels) = cache.load_split(split, &cfg.lang)?;
            Ok(SplitIds { ids, labels })
        };
        return Ok(PreparedData {
            trn: load(Split::Trn)?,
            val: load(Split::Val)?,
            tst: load(Split::Tst)?,
            vocab,
        });
    }

    println!("Reading the data...");
    let texts = source(cfg, paths).read_splits(&cfg.lang)?;
    let vocab = Vocab::build(texts.trn.iter().map(|t| t.tokens.as_slice()), cfg.max_vocab);
    tracing::info!("Built vocabulary of {} tokens (max_vocab={})", vocab.len(), cfg.max_vocab);
    store.save(&cfg.lang, &vocab)?;

    let encode = |split: Split| SplitIds {
        ids:    texts.get(split).iter().map(|t| vocab.encode(&t.tokens)).collect(),
        labels: texts.labels(split),
    };
    let (trn, val, tst) = (encode(Split::Trn), encode(Split::Val), encode(Split::Tst));

    for (split, data) in [(Split::Val, &val), (Split::Tst, &tst), (Split::Trn, &trn)] {
        cache.save_split(split, &cfg.lang, &data.ids, &data.labels)?;
    }
    Ok(PreparedData { vocab, trn, val, tst })
}

// ─── PrepareUseCase ───────────────────────────────────────────────────────────
pub struct PrepareUseCase {
    config: TrainConfig,
}

impl PrepareUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PreparedData> {
        let cfg   = &self.config;
        let paths = check_data(cfg)?;
        let data  = prepare(cfg, &paths)?;
        println!(
            "Vocabulary: {} tokens. Train size: {}. Valid size: {}. Test size: {}.",
            data.vocab.len(), data.trn.ids.len(), data.val.ids.len(), data.tst.ids.len(),
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocab::UNK_ID;
    use std::{fs, path::Path};

    fn write_review(dir: &Path, part: &str, class: &str, file: &str, text: &str) {
        let d = dir.join(part).join(class);
        fs::create_dir_all(&d).unwrap();
        fs::write(d.join(file), text).unwrap();
    }

    /// A tiny IMDb tree under `<tmp>/data/imdb`.
    fn imdb_fixture() -> (tempfile::TempDir, TrainConfig) {
        let root = tempfile::tempdir().unwrap();
        let imdb = root.path().join("data").join("imdb");
        for i in 0..5 {
            write_review(&imdb, "train", "pos", &format!("{i}_9.txt"), "A great film , great acting .");
            write_review(&imdb, "train", "neg", &format!("{i}_1.txt"), "A dull film .<br /><br />Awful .");
        }
        write_review(&imdb, "test", "pos", "0_8.txt", "Great zebra film .");
        write_review(&imdb, "test", "neg", "0_2.txt", "Dull .");

        let cfg = TrainConfig {
            data_dir: root.path().join("data").to_string_lossy().into_owned(),
            valid_fraction: 0.2,
            ..TrainConfig::default()
        };
        (root, cfg)
    }

    #[test]
    fn test_fresh_run_encodes_and_caches() {
        let (_root, cfg) = imdb_fixture();
        let paths = check_data(&cfg).unwrap();
        let data = prepare(&cfg, &paths).unwrap();

        assert_eq!(data.trn.ids.len() + data.val.ids.len(), 10);
        assert_eq!(data.val.ids.len(), 2);
        assert_eq!(data.tst.ids.len(), 2);
        assert_eq!(data.trn.ids.len(), data.trn.labels.len());

        // "zebra" only occurs in the test split
        assert_eq!(data.vocab.id("zebra"), UNK_ID);
        let test_pos = data
            .tst
            .labels
            .iter()
            .position(|&l| l == 1)
            .unwrap();
        assert!(data.tst.ids[test_pos].contains(&UNK_ID));

        assert!(paths.tmp_dir.join("vocab_en.json").exists());
        assert!(paths.tmp_dir.join("trn_en_ids.json").exists());
        assert!(paths.tmp_dir.join("tst_en_lbl.json").exists());
    }

    #[test]
    fn test_second_run_reads_only_the_cache() {
        let (_root, cfg) = imdb_fixture();
        let paths = check_data(&cfg).unwrap();
        let fresh = prepare(&cfg, &paths).unwrap();

        // Raw reviews are gone; only the cache can answer now
        fs::remove_dir_all(paths.dataset_dir.join("train")).unwrap();
        fs::remove_dir_all(paths.dataset_dir.join("test")).unwrap();

        let cached = prepare(&cfg, &paths).unwrap();
        assert_eq!(cached.vocab.itos(), fresh.vocab.itos());
        for split in [Split::Trn, Split::Val, Split::Tst] {
            assert_eq!(cached.get(split), fresh.get(split));
        }
    }

    #[test]
    fn test_vocab_is_deterministic_across_fresh_runs() {
        let (_a, cfg_a) = imdb_fixture();
        let (_b, cfg_b) = imdb_fixture();
        let a = prepare(&cfg_a, &check_data(&cfg_a).unwrap()).unwrap();
        let b = prepare(&cfg_b, &check_data(&cfg_b).unwrap()).unwrap();
        assert_eq!(a.vocab.itos(), b.vocab.itos());
        assert_eq!(a.trn, b.trn);
    }

    #[test]
    fn test_max_vocab_bounds_the_vocabulary() {
        let (_root, cfg) = imdb_fixture();
        let cfg = TrainConfig { max_vocab: 3, ..cfg };
        let data = prepare(&cfg, &check_data(&cfg).unwrap()).unwrap();
        assert_eq!(data.vocab.len(), 5);
    }
}
