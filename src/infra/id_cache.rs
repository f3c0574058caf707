// ============================================================
// Layer 6 — Token Id Cache
// ============================================================
// Tokenizing a full dataset is the slowest part of a cold run,
// so encoded splits are cached as JSON under <dataset>/tmp:
//
//   trn_<lang>_ids.json   [[2, 15, 9, ...], ...]   one list per example
//   trn_<lang>_lbl.json   [1, 0, ...]              one label per example
//   (same for val / tst)
//
// The training ids file marks a complete cache: it is written
// last, so an interrupted run is never mistaken for a finished
// one.

use anyhow::{ensure, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::split::Split;

pub struct IdCache {
    dir: PathBuf,
}

impl IdCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn is_cached(&self, lang: &str) -> bool {
        self.dir.join(Split::Trn.ids_file(lang)).exists()
    }

    pub fn save_split(&self, split: Split, lang: &str, ids: &[Vec<u32>], labels: &[u32]) -> Result<()> {
        ensure!(
            ids.len() == labels.len(),
            "{split}: {} id sequences but {} labels",
            ids.len(),
            labels.len()
        );
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // Labels first: the ids file is the completion marker
        write_json(&self.dir.join(split.labels_file(lang)), &labels)?;
        write_json(&self.dir.join(split.ids_file(lang)), &ids)?;
        tracing::debug!("Cached {} {split} examples", ids.len());
        Ok(())
    }

    pub fn load_split(&self, split: Split, lang: &str) -> Result<(Vec<Vec<u32>>, Vec<u32>)> {
        let ids: Vec<Vec<u32>> = read_json(&self.dir.join(split.ids_file(lang)))?;
        let labels: Vec<u32> = read_json(&self.dir.join(split.labels_file(lang)))?;
        ensure!(
            ids.len() == labels.len(),
            "Cached {split} split is inconsistent: {} id sequences but {} labels",
            ids.len(),
            labels.len()
        );
        Ok((ids, labels))
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string(value)?)
        .with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed cache file '{}'", path.display()))
}
