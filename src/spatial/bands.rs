//! Row bands for the worker pool.

use serde::{Deserialize, Serialize};

/// Contiguous grid rows `[start_row, end_row)` handled by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub start_row: usize,
    pub end_row: usize,
}

impl Band {
    #[inline]
    pub fn contains(&self, row: usize) -> bool {
        row >= self.start_row && row < self.end_row
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end_row - self.start_row
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_row <= self.start_row
    }

    /// Row range `[lo, hi)` covering the band plus `depth` rows on each side,
    /// clipped to the grid.
    #[inline]
    pub fn halo(&self, rows: usize, depth: usize) -> (usize, usize) {
        (self.start_row.saturating_sub(depth), (self.end_row + depth).min(rows))
    }
}

/// Split `rows` into `ceil(rows / workers)`-row bands, last one truncated.
/// Fewer bands than workers come back when rows run out first.
pub fn partition_rows(rows: usize, workers: usize) -> Vec<Band> {
    let workers = workers.max(1);
    let per = rows.div_ceil(workers).max(1);
    let mut bands = Vec::with_capacity(workers);
    let mut start = 0;
    while start < rows {
        let end = (start + per).min(rows);
        bands.push(Band { start_row: start, end_row: end });
        start = end;
    }
    bands
}
