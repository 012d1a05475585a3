//! Multi-pass grid solver.
//!
//! Each pass rebuilds the grid from current positions and walks every occupied
//! cell with the forward stencil. Only the last pass exchanges impulses; the
//! earlier ones just untangle overlaps.

use serde::{Deserialize, Serialize};

use crate::core::random::DEFAULT_SEED;
use crate::spatial::{CellGrid, GridDims, FORWARD_STENCIL};

use super::access::BodyAccess;
use super::pair::{resolve_pair, ImpulseMode, PairOutcome};

/// Pass count at which the last-pass impulse runs at full strength.
pub const BASE_PASSES: u32 = 3;

/// `min(1, BASE_PASSES / passes)`.
#[inline]
pub fn impulse_scale(passes: u32) -> f32 {
    (BASE_PASSES as f32 / passes.max(1) as f32).min(1.0)
}

/// World geometry and quality dial for one solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveParams {
    pub cell_size: f32,
    pub width: f32,
    pub height: f32,
    pub passes: u32,
}

impl SolveParams {
    #[inline]
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.width, self.height, self.cell_size)
    }

    #[inline]
    pub fn effective_passes(&self) -> u32 {
        self.passes.max(1)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveStats {
    pub passes: u32,
    /// Pair counters. A band solve only counts pairs whose lower-index body it
    /// owns, so merged band stats count each pair once.
    pub pairs_tested: u64,
    pub contacts: u64,
    pub impulses: u64,
}

impl SolveStats {
    /// Fold in the counters of another band of the same dispatch.
    pub fn merge(&mut self, other: &SolveStats) {
        self.passes = self.passes.max(other.passes);
        self.pairs_tested += other.pairs_tested;
        self.contacts += other.contacts;
        self.impulses += other.impulses;
    }

    #[inline]
    fn record(&mut self, outcome: PairOutcome) {
        self.pairs_tested += 1;
        match outcome {
            PairOutcome::Apart => {}
            PairOutcome::Separated => self.contacts += 1,
            PairOutcome::Bounced => {
                self.contacts += 1;
                self.impulses += 1;
            }
        }
    }
}

/// Single-threaded reference solver. Keeps its grid between calls.
#[derive(Debug)]
pub struct SequentialSolver {
    grid: CellGrid,
    rng: u32,
}

impl Default for SequentialSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SequentialSolver {
    pub fn new(seed: u32) -> Self {
        Self { grid: CellGrid::new(), rng: seed }
    }

    pub fn reseed(&mut self, seed: u32) {
        self.rng = seed;
    }

    pub fn solve<B: BodyAccess + ?Sized>(&mut self, bodies: &mut B, params: &SolveParams) -> SolveStats {
        run_passes(bodies, params, &mut self.grid, &mut self.rng, None)
    }
}

/// Run every pass over the whole grid. With `owned`, only pairs whose
/// lower-index body is marked are counted in the stats.
pub(crate) fn run_passes<B: BodyAccess + ?Sized>(
    bodies: &mut B,
    params: &SolveParams,
    grid: &mut CellGrid,
    rng: &mut u32,
    owned: Option<&[bool]>,
) -> SolveStats {
    let passes = params.effective_passes();
    let scale = impulse_scale(passes);
    let dims = params.dims();
    let mut stats = SolveStats { passes, ..SolveStats::default() };

    if bodies.len() < 2 {
        return stats;
    }

    for pass in 0..passes {
        let mode = if pass + 1 == passes {
            ImpulseMode::Apply { scale }
        } else {
            ImpulseMode::PositionOnly
        };
        grid.rebuild(dims, bodies.len(), |i| bodies.pos(i));
        let mut tally = Tally { stats: &mut stats, owned };
        solve_cells(bodies, grid, &dims, mode, rng, &mut tally);
    }
    stats
}

struct Tally<'a> {
    stats: &'a mut SolveStats,
    owned: Option<&'a [bool]>,
}

impl Tally<'_> {
    #[inline]
    fn record(&mut self, a: usize, b: usize, outcome: PairOutcome) {
        let counts = match self.owned {
            Some(owned) => owned.get(a.min(b)).copied().unwrap_or(false),
            None => true,
        };
        if counts {
            self.stats.record(outcome);
        }
    }
}

fn solve_cells<B: BodyAccess + ?Sized>(
    bodies: &mut B,
    grid: &CellGrid,
    dims: &GridDims,
    mode: ImpulseMode,
    rng: &mut u32,
    tally: &mut Tally<'_>,
) {
    for row in 0..dims.rows {
        for col in 0..dims.cols {
            let here = grid.cell(row, col);
            if here.is_empty() {
                continue;
            }
            for &(d_row, d_col) in FORWARD_STENCIL.iter() {
                if d_row == 0 && d_col == 0 {
                    for (k, &a) in here.iter().enumerate() {
                        for &b in &here[k + 1..] {
                            let out = resolve_pair(bodies, a as usize, b as usize, mode, rng);
                            tally.record(a as usize, b as usize, out);
                        }
                    }
                    continue;
                }
                let Some((r, c)) = dims.offset(row, col, d_row, d_col) else {
                    continue;
                };
                let there = grid.cell(r, c);
                for &a in here {
                    for &b in there {
                        let out = resolve_pair(bodies, a as usize, b as usize, mode, rng);
                        tally.record(a as usize, b as usize, out);
                    }
                }
            }
        }
    }
}
