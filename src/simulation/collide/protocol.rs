//! Messages between the control thread and the collision workers.

use std::sync::Arc;

use crate::spatial::Band;
use crate::systems::collision::{BandWrites, SolveParams, SolveStats};

use super::buffers::SharedRegion;

/// Control thread to worker.
#[derive(Debug)]
pub enum WorkerRequest {
    /// Copy-mode startup; the worker answers `Ready`.
    Init,
    /// Shared-mode startup: keep `region` for later range jobs.
    InitShared { region: Arc<SharedRegion> },
    /// Solve a private copy of the whole buffer.
    Collide {
        frame: u64,
        slots: Vec<f32>,
        elasticity: Vec<f32>,
        count: usize,
        params: SolveParams,
    },
    /// Solve one row band of the shared region.
    CollideRange {
        frame: u64,
        band: Band,
        count: usize,
        params: SolveParams,
    },
}

/// Worker to control thread.
#[derive(Debug)]
pub enum WorkerResponse {
    Ready { worker: usize },
    Collided {
        frame: u64,
        slots: Vec<f32>,
        stats: SolveStats,
    },
    RangeDone {
        frame: u64,
        band: Band,
        writes: BandWrites,
        stats: SolveStats,
    },
    Failed {
        worker: usize,
        frame: u64,
        reason: String,
    },
}

impl WorkerResponse {
    /// Frame id a job response belongs to; `None` for `Ready`.
    pub fn frame(&self) -> Option<u64> {
        match self {
            WorkerResponse::Ready { .. } => None,
            WorkerResponse::Collided { frame, .. }
            | WorkerResponse::RangeDone { frame, .. }
            | WorkerResponse::Failed { frame, .. } => Some(*frame),
        }
    }
}
