// --- File: src/core/storage.rs
use crate::core::config::StorageKind;
use crate::core::types::ItemId;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Row operations every transition matrix representation supports.
///
/// The model only talks to its matrix through this trait, so the dense and
/// sparse variants are interchangeable.
pub trait TransitionStorage {
    /// Number of rows (and columns).
    fn dimension(&self) -> usize;

    /// Overwrites a single cell. Writing `0.0` clears it.
    fn set(&mut self, row: usize, col: usize, value: f64);

    fn get(&self, row: usize, col: usize) -> f64;

    /// Calls `f(col, value)` for each non-zero cell of `row`, in column order.
    fn for_each_nonzero<F: FnMut(usize, f64)>(&self, row: usize, f: F);

    fn row_sum(&self, row: usize) -> f64 {
        let mut sum = 0.0;
        self.for_each_nonzero(row, |_, value| sum += value);
        sum
    }

    /// Scales every row to sum to 1. Rows summing to 0 stay all zero.
    fn normalize_rows(&mut self);

    /// Best `n` entries of `row`, highest value first.
    ///
    /// The diagonal and zero cells are never returned. Equal values are
    /// ordered by ascending `tie_key(col)`.
    /// O(k log n) where k is the number of non-zero cells in the row.
    fn row_top_n<K: Fn(usize) -> ItemId>(&self, row: usize, n: usize, tie_key: K) -> Vec<(usize, f64)> {
        if n == 0 {
            return vec![];
        }
        let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(n.min(self.dimension()) + 1);
        self.for_each_nonzero(row, |col, value| {
            if col == row || value <= 0.0 {
                return;
            }
            let candidate = Ranked { value, key: tie_key(col), col };
            if heap.len() < n {
                heap.push(Reverse(candidate));
                return;
            }
            let worst = heap.peek().map(|Reverse(ranked)| *ranked);
            if worst.is_some_and(|worst| candidate > worst) {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        });
        // Sorting `Reverse` ascending yields best-first.
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse(ranked)| (ranked.col, ranked.value))
            .collect()
    }

    /// All ranked entries of `row`, in the same order `row_top_n` uses.
    fn row_ranked<K: Fn(usize) -> ItemId>(&self, row: usize, tie_key: K) -> Vec<(usize, f64)> {
        let mut ranked = Vec::new();
        self.for_each_nonzero(row, |col, value| {
            if col != row && value > 0.0 {
                ranked.push(Ranked { value, key: tie_key(col), col });
            }
        });
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        ranked.into_iter().map(|r| (r.col, r.value)).collect()
    }
}

/// Heap entry: larger value wins, then smaller tie key.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    value: f64,
    key: ItemId,
    col: usize,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.key.cmp(&self.key))
            .then_with(|| other.col.cmp(&self.col))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Row-major `n x n` matrix. Memory is O(n^2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(n: usize) -> Self {
        Self { n, data: vec![0.0; n * n] }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.n..(row + 1) * self.n]
    }
}

impl TransitionStorage for DenseMatrix {
    fn dimension(&self) -> usize {
        self.n
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.n + col] = value;
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    fn for_each_nonzero<F: FnMut(usize, f64)>(&self, row: usize, mut f: F) {
        for (col, &value) in self.row(row).iter().enumerate() {
            if value != 0.0 {
                f(col, value);
            }
        }
    }

    fn row_sum(&self, row: usize) -> f64 {
        self.row(row).iter().sum()
    }

    fn normalize_rows(&mut self) {
        if self.n == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(self.n) {
            let sum: f64 = row.iter().sum();
            if sum == 0.0 {
                continue;
            }
            for value in row.iter_mut() {
                *value /= sum;
            }
        }
    }
}

/// One column-sorted `(col, value)` list per row. Memory is O(n + nnz).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    pub fn zeros(n: usize) -> Self {
        Self { rows: vec![Vec::new(); n] }
    }

    pub fn nonzero_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

impl TransitionStorage for SparseMatrix {
    fn dimension(&self) -> usize {
        self.rows.len()
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        let cells = &mut self.rows[row];
        match cells.binary_search_by_key(&col, |&(c, _)| c) {
            Ok(pos) if value == 0.0 => {
                cells.remove(pos);
            }
            Ok(pos) => cells[pos].1 = value,
            Err(_) if value == 0.0 => {}
            Err(pos) => cells.insert(pos, (col, value)),
        }
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        let cells = &self.rows[row];
        cells
            .binary_search_by_key(&col, |&(c, _)| c)
            .map(|pos| cells[pos].1)
            .unwrap_or(0.0)
    }

    fn for_each_nonzero<F: FnMut(usize, f64)>(&self, row: usize, mut f: F) {
        for &(col, value) in &self.rows[row] {
            f(col, value);
        }
    }

    fn normalize_rows(&mut self) {
        for cells in &mut self.rows {
            let sum: f64 = cells.iter().map(|&(_, v)| v).sum();
            if sum == 0.0 {
                continue;
            }
            for (_, value) in cells.iter_mut() {
                *value /= sum;
            }
        }
    }
}

/// The matrix behind a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Storage {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl Storage {
    /// `kind` must already be resolved; `Auto` is treated as dense.
    pub fn zeros(kind: StorageKind, n: usize) -> Self {
        match kind {
            StorageKind::Sparse => Storage::Sparse(SparseMatrix::zeros(n)),
            StorageKind::Dense | StorageKind::Auto => Storage::Dense(DenseMatrix::zeros(n)),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Storage::Dense(_) => StorageKind::Dense,
            Storage::Sparse(_) => StorageKind::Sparse,
        }
    }

    /// Checks the layout invariants every row operation relies on: a dense
    /// buffer of exactly `n * n` cells, sparse columns strictly increasing and
    /// below `n`, and no negative or non-finite cells.
    pub fn check_shape(&self) -> std::result::Result<(), String> {
        match self {
            Storage::Dense(m) => {
                let expected = m.n.checked_mul(m.n).ok_or_else(|| format!("dimension {} overflows", m.n))?;
                if m.data.len() != expected {
                    return Err(format!("dense buffer holds {} cells, expected {}", m.data.len(), expected));
                }
                if let Some(bad) = m.data.iter().find(|v| !v.is_finite() || **v < 0.0) {
                    return Err(format!("dense cell value {} is not a probability", bad));
                }
            }
            Storage::Sparse(m) => {
                let n = m.rows.len();
                for (row, cells) in m.rows.iter().enumerate() {
                    if cells.windows(2).any(|w| w[0].0 >= w[1].0) {
                        return Err(format!("sparse row {} columns are not strictly increasing", row));
                    }
                    if let Some(&(col, value)) = cells.iter().find(|&&(col, v)| col >= n || !v.is_finite() || v < 0.0) {
                        return Err(format!("sparse row {} has cell ({}, {}) outside a {}x{} matrix", row, col, value, n, n));
                    }
                }
            }
        }
        Ok(())
    }
}

impl TransitionStorage for Storage {
    fn dimension(&self) -> usize {
        match self {
            Storage::Dense(m) => m.dimension(),
            Storage::Sparse(m) => m.dimension(),
        }
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        match self {
            Storage::Dense(m) => m.set(row, col, value),
            Storage::Sparse(m) => m.set(row, col, value),
        }
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            Storage::Dense(m) => m.get(row, col),
            Storage::Sparse(m) => m.get(row, col),
        }
    }

    fn for_each_nonzero<F: FnMut(usize, f64)>(&self, row: usize, f: F) {
        match self {
            Storage::Dense(m) => m.for_each_nonzero(row, f),
            Storage::Sparse(m) => m.for_each_nonzero(row, f),
        }
    }

    fn row_sum(&self, row: usize) -> f64 {
        match self {
            Storage::Dense(m) => m.row_sum(row),
            Storage::Sparse(m) => m.row_sum(row),
        }
    }

    fn normalize_rows(&mut self) {
        match self {
            Storage::Dense(m) => m.normalize_rows(),
            Storage::Sparse(m) => m.normalize_rows(),
        }
    }
}
