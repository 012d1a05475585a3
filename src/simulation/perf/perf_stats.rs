use wasm_bindgen::prelude::*;

use super::collide::{DispatchCounters, ExecutionMode};

#[wasm_bindgen]
#[derive(Clone, Debug, PartialEq)]
pub struct PerfStats {
    pub(super) step_ms: f64,
    pub(super) hooks_ms: f64,
    pub(super) integrate_ms: f64,
    pub(super) collide_ms: f64,
    pub(super) reconcile_ms: f64,
    pub(super) substeps: u32,
    pub(super) particle_count: u32,

    // Last solve, inline or reconciled from the pool.
    pub(super) passes: u32,
    pub(super) pairs_tested: u32,
    pub(super) contacts: u32,
    pub(super) impulses: u32,

    // Running totals from the orchestrator.
    pub(super) dispatches: u32,
    pub(super) dropped_busy: u32,
    pub(super) dropped_not_ready: u32,
    pub(super) stale_completions: u32,
    pub(super) reconciles: u32,
    pub(super) sanitized: u32,
    pub(super) skipped_deltas: u32,
    pub(super) buffer_reallocations: u32,

    pub(super) worker_count: u32,
    /// 0 inline, 1 copy, 2 shared.
    pub(super) execution_mode: u8,
}

impl PerfStats {
    pub(crate) fn reset(&mut self) {
        *self = PerfStats::default();
    }

    pub(super) fn record_counters(&mut self, counters: &DispatchCounters, reallocations: u64) {
        self.dispatches = saturate(counters.dispatched);
        self.dropped_busy = saturate(counters.dropped_busy);
        self.dropped_not_ready = saturate(counters.dropped_not_ready);
        self.stale_completions = saturate(counters.stale);
        self.reconciles = saturate(counters.completed);
        self.sanitized = saturate(counters.repaired);
        self.skipped_deltas = saturate(counters.skipped_deltas);
        self.buffer_reallocations = saturate(reallocations);
    }

    pub(super) fn record_mode(&mut self, mode: ExecutionMode, workers: usize) {
        self.execution_mode = match mode {
            ExecutionMode::Inline => 0,
            ExecutionMode::Copy => 1,
            ExecutionMode::Shared => 2,
        };
        self.worker_count = workers as u32;
    }
}

fn saturate(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

impl Default for PerfStats {
    fn default() -> Self {
        PerfStats {
            step_ms: 0.0,
            hooks_ms: 0.0,
            integrate_ms: 0.0,
            collide_ms: 0.0,
            reconcile_ms: 0.0,
            substeps: 0,
            particle_count: 0,
            passes: 0,
            pairs_tested: 0,
            contacts: 0,
            impulses: 0,
            dispatches: 0,
            dropped_busy: 0,
            dropped_not_ready: 0,
            stale_completions: 0,
            reconciles: 0,
            sanitized: 0,
            skipped_deltas: 0,
            buffer_reallocations: 0,
            worker_count: 0,
            execution_mode: 0,
        }
    }
}

#[wasm_bindgen]
impl PerfStats {
    #[wasm_bindgen(getter)]
    pub fn step_ms(&self) -> f64 { self.step_ms }
    #[wasm_bindgen(getter)]
    pub fn hooks_ms(&self) -> f64 { self.hooks_ms }
    #[wasm_bindgen(getter)]
    pub fn integrate_ms(&self) -> f64 { self.integrate_ms }
    #[wasm_bindgen(getter)]
    pub fn collide_ms(&self) -> f64 { self.collide_ms }
    #[wasm_bindgen(getter)]
    pub fn reconcile_ms(&self) -> f64 { self.reconcile_ms }
    #[wasm_bindgen(getter)]
    pub fn substeps(&self) -> u32 { self.substeps }
    #[wasm_bindgen(getter)]
    pub fn particle_count(&self) -> u32 { self.particle_count }
    #[wasm_bindgen(getter)]
    pub fn passes(&self) -> u32 { self.passes }
    #[wasm_bindgen(getter)]
    pub fn pairs_tested(&self) -> u32 { self.pairs_tested }
    #[wasm_bindgen(getter)]
    pub fn contacts(&self) -> u32 { self.contacts }
    #[wasm_bindgen(getter)]
    pub fn impulses(&self) -> u32 { self.impulses }
    #[wasm_bindgen(getter)]
    pub fn dispatches(&self) -> u32 { self.dispatches }
    #[wasm_bindgen(getter)]
    pub fn dropped_busy(&self) -> u32 { self.dropped_busy }
    #[wasm_bindgen(getter)]
    pub fn dropped_not_ready(&self) -> u32 { self.dropped_not_ready }
    #[wasm_bindgen(getter)]
    pub fn stale_completions(&self) -> u32 { self.stale_completions }
    #[wasm_bindgen(getter)]
    pub fn reconciles(&self) -> u32 { self.reconciles }
    #[wasm_bindgen(getter)]
    pub fn sanitized(&self) -> u32 { self.sanitized }
    #[wasm_bindgen(getter)]
    pub fn skipped_deltas(&self) -> u32 { self.skipped_deltas }
    #[wasm_bindgen(getter)]
    pub fn buffer_reallocations(&self) -> u32 { self.buffer_reallocations }
    #[wasm_bindgen(getter)]
    pub fn worker_count(&self) -> u32 { self.worker_count }
    #[wasm_bindgen(getter)]
    pub fn execution_mode(&self) -> u8 { self.execution_mode }
}
