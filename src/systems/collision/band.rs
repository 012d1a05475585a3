//! Band-local solve for the worker pool.
//!
//! A band owns the bodies whose row (at gather time) lies inside it. It also
//! copies every body within `passes + 1` rows above and below as a halo and
//! runs the full multi-pass solve over owned and halo bodies together, in
//! global index order. Halo copies therefore move the way the real bodies do,
//! and a pair straddling a band edge sees the same neighbours in both bands.
//! Bodies past the halo edge are missing, but a correction travels at most
//! one row upward per pass, so the lower edge never reaches the owned rows.
//! Only owned slots are handed back: each body is returned by exactly one
//! band.

use serde::{Deserialize, Serialize};

use crate::domain::particle::{slot_count, STRIDE};
use crate::spatial::{Band, CellGrid};

use super::access::{TransportView, FALLBACK_ELASTICITY};
use super::solver::{run_passes, SolveParams, SolveStats};

/// Halo depth in rows for a solve of `passes` passes.
#[inline]
pub fn halo_depth(passes: u32) -> usize {
    passes.max(1) as usize + 1
}

/// Owned slots produced by one band, keyed by global particle index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandWrites {
    pub indices: Vec<u32>,
    /// `indices.len() * STRIDE` floats in index order.
    pub slots: Vec<f32>,
}

impl BandWrites {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Copy every owned slot into a full-size buffer. Indices past the end of
    /// `target` are skipped.
    pub fn scatter_into(&self, target: &mut [f32]) -> usize {
        let mut written = 0;
        for (k, &gi) in self.indices.iter().enumerate() {
            let dst = gi as usize * STRIDE;
            if dst + STRIDE > target.len() {
                continue;
            }
            target[dst..dst + STRIDE].copy_from_slice(&self.slots[k * STRIDE..(k + 1) * STRIDE]);
            written += 1;
        }
        written
    }
}

/// Reusable scratch for band solves; one per worker.
#[derive(Debug)]
pub struct BandSolver {
    grid: CellGrid,
    rng: u32,
    global: Vec<u32>,
    owned: Vec<bool>,
    local: Vec<f32>,
    elasticity: Vec<f32>,
    ready: bool,
}

impl BandSolver {
    pub fn new(seed: u32) -> Self {
        Self {
            grid: CellGrid::new(),
            rng: seed,
            global: Vec::new(),
            owned: Vec::new(),
            local: Vec::new(),
            elasticity: Vec::new(),
            ready: false,
        }
    }

    /// Copy the band's bodies and its halo out of the full transport buffer,
    /// keeping global index order. Returns the number of owned bodies.
    pub fn gather(&mut self, slots: &[f32], elasticity: &[f32], band: Band, params: &SolveParams) -> usize {
        let dims = params.dims();
        let (lo, hi) = band.halo(dims.rows, halo_depth(params.passes));
        let count = slot_count(slots);

        self.global.clear();
        self.owned.clear();
        self.local.clear();
        self.elasticity.clear();
        for i in 0..count {
            let at = i * STRIDE;
            let row = dims.row_of(slots[at + 1]);
            if row < lo || row >= hi {
                continue;
            }
            self.global.push(i as u32);
            self.owned.push(band.contains(row));
            self.local.extend_from_slice(&slots[at..at + STRIDE]);
            self.elasticity.push(elasticity.get(i).copied().unwrap_or(FALLBACK_ELASTICITY));
        }
        self.ready = true;
        self.owned.iter().filter(|&&o| o).count()
    }

    /// Run all passes on the gathered bodies and hand back the owned slots.
    pub fn run(&mut self, params: &SolveParams) -> (BandWrites, SolveStats) {
        if !std::mem::take(&mut self.ready) {
            return (BandWrites::default(), SolveStats::default());
        }
        let stats = {
            let mut view = TransportView::new(&mut self.local, &self.elasticity);
            run_passes(&mut view, params, &mut self.grid, &mut self.rng, Some(self.owned.as_slice()))
        };

        let mut writes = BandWrites::default();
        for (k, &gi) in self.global.iter().enumerate() {
            if !self.owned[k] {
                continue;
            }
            writes.indices.push(gi);
            writes.slots.extend_from_slice(&self.local[k * STRIDE..(k + 1) * STRIDE]);
        }
        (writes, stats)
    }

    /// `gather` then `run` on one buffer.
    pub fn solve(
        &mut self,
        slots: &[f32],
        elasticity: &[f32],
        band: Band,
        params: &SolveParams,
    ) -> (BandWrites, SolveStats) {
        self.gather(slots, elasticity, band, params);
        self.run(params)
    }
}
