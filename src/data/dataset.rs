use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One language-model window: `bptt` input ids and the ids that follow each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmItem {
    pub input:  Vec<u32>,
    pub target: Vec<u32>,
    /// Position of the window along its row; 0 starts a row
    pub window: usize,
}

/// All documents of a split concatenated into one stream, cut into
/// `rows` equal rows, each read in consecutive `bptt`-long windows.
///
/// Items are ordered window-major: items `k*rows .. (k+1)*rows` are
/// window `k` of every row, so an unshuffled loader with
/// `batch_size == rows` hands each row's windows over in order. A row's
/// remainder shorter than `bptt` is dropped.
pub struct LmDataset {
    stream:  Vec<u32>,
    bptt:    usize,
    rows:    usize,
    row_len: usize,
}

impl LmDataset {
    pub fn new(docs: &[Vec<u32>], bptt: usize, rows: usize) -> Self {
        let stream: Vec<u32> = docs.iter().flatten().copied().collect();
        let rows = rows.max(1);
        let row_len = stream.len().saturating_sub(1) / rows;
        Self { stream, bptt, rows, row_len }
    }

    pub fn token_count(&self) -> usize {
        self.stream.len()
    }

    fn windows_per_row(&self) -> usize {
        if self.bptt == 0 { 0 } else { self.row_len / self.bptt }
    }
}

impl Dataset<LmItem> for LmDataset {
    fn get(&self, index: usize) -> Option<LmItem> {
        if index >= self.len() {
            return None;
        }
        let (window, row) = (index / self.rows, index % self.rows);
        let start = row * self.row_len + window * self.bptt;
        Some(LmItem {
            input:  self.stream[start..start + self.bptt].to_vec(),
            target: self.stream[start + 1..start + self.bptt + 1].to_vec(),
            window,
        })
    }

    fn len(&self) -> usize {
        self.rows * self.windows_per_row()
    }
}

/// One classification example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClasItem {
    pub ids:   Vec<u32>,
    pub label: u32,
}

pub struct ClasDataset {
    items: Vec<ClasItem>,
}

impl ClasDataset {
    /// Pair whole documents with their labels.
    pub fn new(ids: &[Vec<u32>], labels: &[u32]) -> Self {
        let items = ids
            .iter()
            .zip(labels)
            .map(|(seq, &label)| ClasItem { ids: seq.clone(), label })
            .collect();
        Self { items }
    }

    pub fn sample_count(&self) -> usize {
        self.items.len()
    }
}

impl Dataset<ClasItem> for ClasDataset {
    fn get(&self, index: usize) -> Option<ClasItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lm_windows_shift_targets_by_one() {
        let ds = LmDataset::new(&[vec![10, 11, 12], vec![13, 14, 15, 16]], 3, 1);
        assert_eq!(ds.token_count(), 7);
        assert_eq!(ds.len(), 2);

        let first = ds.get(0).unwrap();
        assert_eq!(first.input,  vec![10, 11, 12]);
        assert_eq!(first.target, vec![11, 12, 13]);
        assert_eq!(first.window, 0);

        let second = ds.get(1).unwrap();
        assert_eq!(second.input,  vec![13, 14, 15]);
        assert_eq!(second.target, vec![14, 15, 16]);
        assert_eq!(second.window, 1);

        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_lm_rows_continue_across_batches() {
        // 17 tokens → 2 rows of 8, each read as two windows of 4
        let stream: Vec<u32> = (0..17).collect();
        let ds = LmDataset::new(&[stream], 4, 2);
        assert_eq!(ds.len(), 4);

        let inputs: Vec<Vec<u32>> = (0..4).map(|i| ds.get(i).unwrap().input).collect();
        assert_eq!(inputs[0], vec![0, 1, 2, 3]);
        assert_eq!(inputs[1], vec![8, 9, 10, 11]);
        assert_eq!(inputs[2], vec![4, 5, 6, 7]);
        assert_eq!(inputs[3], vec![12, 13, 14, 15]);
        assert_eq!(ds.get(3).unwrap().target, vec![13, 14, 15, 16]);
        assert_eq!(ds.get(2).unwrap().window, 1);
    }

    #[test]
    fn test_lm_stream_too_short_is_empty() {
        let ds = LmDataset::new(&[vec![1, 2, 3]], 3, 1);
        assert_eq!(ds.len(), 0);
        let ds = LmDataset::new(&[(0..10).collect::<Vec<u32>>()], 3, 4);
        assert_eq!(ds.len(), 0);
    }

    #[test]
    fn test_clas_items_keep_whole_documents() {
        let ds = ClasDataset::new(&[vec![1, 2, 3, 4, 5], vec![6]], &[1, 0]);
        assert_eq!(ds.get(0).unwrap().ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(ds.get(1).unwrap().ids, vec![6]);
        assert_eq!(ds.get(1).unwrap().label, 0);
        assert_eq!(ds.sample_count(), 2);
    }
}
