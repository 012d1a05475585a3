//! Decides where collisions are solved and gates dispatch to one job at a
//! time.
//!
//! Three modes, picked once at startup and downgraded on failure:
//!
//! * `Shared`: the pool reads one transport region; the grid rows are split
//!   into bands, one per worker, and the owned slots of every band are merged
//!   into a result buffer.
//! * `Copy`: a single worker gets an owned copy of the buffer and sends the
//!   solved copy back.
//! * `Inline`: the control thread solves in place every substep.
//!
//! In the two worker modes at most one frame is in flight. A dispatch while
//! busy, or before every worker has acknowledged init, is dropped. The result
//! is applied as a delta against the pre-dispatch snapshot when it lands.

use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::core::{Error, Result};
use crate::domain::config::ParallelSettings;
use crate::domain::particle::Particle;
use crate::spatial::partition_rows;
use crate::systems::collision::{SequentialSolver, SolveParams, SolveStats};

use super::buffers::{sanitize_particles, BufferMode, TransportBuffers};
use super::pool::{default_pool_size, shared_memory_supported, WorkerPool};
use super::protocol::{WorkerRequest, WorkerResponse};
use super::snapshot::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    Inline,
    Copy,
    Shared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Solved in place on the calling thread.
    Inline(SolveStats),
    /// Handed to the pool under this frame id.
    Dispatched { frame: u64 },
    /// A frame is still in flight; this one was dropped.
    Busy,
    /// Workers have not all acknowledged init; this one was dropped.
    NotReady,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchCounters {
    pub dispatched: u64,
    pub completed: u64,
    pub dropped_busy: u64,
    pub dropped_not_ready: u64,
    /// Responses for a frame that was no longer in flight.
    pub stale: u64,
    /// In-flight frames abandoned because the particle set changed.
    pub discarded: u64,
    pub failures: u64,
    /// Particles whose non-finite fields were repaired before solving.
    pub repaired: u64,
    /// Non-finite deltas skipped during reconcile.
    pub skipped_deltas: u64,
}

struct InFlight {
    frame: u64,
    pending: usize,
    result: Vec<f32>,
    stats: SolveStats,
}

pub struct CollisionOrchestrator {
    mode: ExecutionMode,
    pool: Option<WorkerPool>,
    ready: usize,
    buffers: TransportBuffers,
    snapshot: Snapshot,
    in_flight: Option<InFlight>,
    inline: SequentialSolver,
    next_frame: u64,
    counters: DispatchCounters,
    last_stats: Option<SolveStats>,
}

impl CollisionOrchestrator {
    /// Solve everything on the calling thread.
    pub fn inline(seed: u32) -> Self {
        Self {
            mode: ExecutionMode::Inline,
            pool: None,
            ready: 0,
            buffers: TransportBuffers::new(BufferMode::Private),
            snapshot: Snapshot::default(),
            in_flight: None,
            inline: SequentialSolver::new(seed),
            next_frame: 1,
            counters: DispatchCounters::default(),
            last_stats: None,
        }
    }

    /// Pick the best mode the runtime allows. Never fails: a pool that cannot
    /// be started leaves the orchestrator inline.
    pub fn new(settings: &ParallelSettings) -> Self {
        let mut this = Self::inline(settings.seed);
        if !settings.enabled {
            return this;
        }
        let shared = settings.prefer_shared && shared_memory_supported();
        let size = if shared {
            settings.worker_count.unwrap_or_else(default_pool_size)
        } else {
            1
        };
        match WorkerPool::spawn(size, settings.seed) {
            Ok(pool) => {
                if let Err(e) = this.start(pool, shared) {
                    warn!("collision workers did not accept init, solving inline: {e}");
                    this.fall_back_inline();
                }
            }
            Err(e) => warn!("collision workers unavailable, solving inline: {e}"),
        }
        this
    }

    fn start(&mut self, pool: WorkerPool, shared: bool) -> Result<()> {
        if shared {
            self.buffers.set_mode(BufferMode::Shared);
            let region = self.buffers.region();
            pool.broadcast(|_| WorkerRequest::InitShared { region: region.clone() })?;
            self.mode = ExecutionMode::Shared;
        } else {
            self.buffers.set_mode(BufferMode::Private);
            pool.broadcast(|_| WorkerRequest::Init)?;
            self.mode = ExecutionMode::Copy;
        }
        info!("collision mode {:?} with {} workers", self.mode, pool.len());
        self.ready = 0;
        self.pool = Some(pool);
        Ok(())
    }

    fn fall_back_inline(&mut self) {
        self.mode = ExecutionMode::Inline;
        self.pool = None;
        self.ready = 0;
        self.in_flight = None;
        self.snapshot.clear();
        self.buffers.set_mode(BufferMode::Private);
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::len)
    }

    /// Every worker has acknowledged init. Inline mode is always ready.
    pub fn is_ready(&self) -> bool {
        match self.mode {
            ExecutionMode::Inline => true,
            _ => self.ready >= self.worker_count(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending_frame(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|j| j.frame)
    }

    pub fn counters(&self) -> DispatchCounters {
        self.counters
    }

    pub fn last_stats(&self) -> Option<SolveStats> {
        self.last_stats
    }

    pub fn buffer_reallocations(&self) -> u64 {
        self.buffers.reallocations()
    }

    /// Solve inline, or hand the current state to the pool if it is idle and
    /// ready.
    pub fn dispatch(&mut self, particles: &mut [Particle], params: &SolveParams) -> DispatchOutcome {
        if self.mode == ExecutionMode::Inline {
            self.counters.repaired += sanitize_particles(particles) as u64;
            let stats = self.inline.solve(particles, params);
            self.last_stats = Some(stats);
            return DispatchOutcome::Inline(stats);
        }
        if self.in_flight.is_some() {
            self.counters.dropped_busy += 1;
            trace!("frame dropped, collision frame still in flight");
            return DispatchOutcome::Busy;
        }
        if !self.is_ready() {
            self.counters.dropped_not_ready += 1;
            trace!("frame dropped, {}/{} workers ready", self.ready, self.worker_count());
            return DispatchOutcome::NotReady;
        }
        match self.launch(particles, params) {
            Ok(frame) => DispatchOutcome::Dispatched { frame },
            Err(e) => {
                warn!("collision dispatch failed, solving inline from now on: {e}");
                self.fall_back_inline();
                self.dispatch(particles, params)
            }
        }
    }

    fn launch(&mut self, particles: &mut [Particle], params: &SolveParams) -> Result<u64> {
        let Some(pool) = self.pool.as_ref() else {
            return Err(Error::WorkerDisconnected);
        };
        self.counters.repaired += self.buffers.serialize(particles)? as u64;
        let snapshot = self.buffers.snapshot()?;
        let count = particles.len();
        let frame = self.next_frame;

        let (pending, result) = match self.mode {
            ExecutionMode::Copy => {
                let (slots, elasticity) = self.buffers.copy_out()?;
                pool.send(0, WorkerRequest::Collide { frame, slots, elasticity, count, params: *params })?;
                (1, Vec::new())
            }
            ExecutionMode::Shared => {
                let bands = partition_rows(params.dims().rows, pool.len());
                if bands.is_empty() {
                    return Err(Error::invalid("grid has no rows"));
                }
                for (worker, band) in bands.iter().enumerate() {
                    pool.send(worker, WorkerRequest::CollideRange { frame, band: *band, count, params: *params })?;
                }
                // Rows nobody reports back keep their snapshot values.
                (bands.len(), snapshot.clone())
            }
            ExecutionMode::Inline => return Err(Error::invalid("inline mode has no workers")),
        };

        self.next_frame += 1;
        self.snapshot.capture(snapshot);
        self.in_flight = Some(InFlight { frame, pending, result, stats: SolveStats::default() });
        self.counters.dispatched += 1;
        trace!("dispatched frame {frame} to {pending} workers");
        Ok(frame)
    }

    /// Drain whatever the workers have sent. Returns the stats of a frame
    /// that completed and was reconciled into `particles`.
    pub fn poll(&mut self, particles: &mut [Particle]) -> Option<SolveStats> {
        let mut completed = None;
        loop {
            let Some(pool) = self.pool.as_ref() else { break };
            match pool.try_recv() {
                Ok(Some(response)) => {
                    if let Some(stats) = self.on_response(response, particles) {
                        completed = Some(stats);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("collision workers lost, solving inline: {e}");
                    self.fall_back_inline();
                    break;
                }
            }
        }
        completed
    }

    /// Drop the in-flight frame; its responses will be ignored as stale.
    /// Call whenever particles are added, removed or reordered.
    pub fn invalidate(&mut self) {
        if let Some(job) = self.in_flight.take() {
            debug!("discarding collision frame {}", job.frame);
            self.counters.discarded += 1;
        }
        self.snapshot.clear();
    }

    /// Replace the execution setup. Any in-flight frame is lost.
    pub fn reconfigure(&mut self, settings: &ParallelSettings) {
        let counters = self.counters;
        *self = Self::new(settings);
        self.counters = counters;
    }

    fn on_response(&mut self, response: WorkerResponse, particles: &mut [Particle]) -> Option<SolveStats> {
        if let WorkerResponse::Ready { worker } = response {
            self.ready += 1;
            debug!("collision worker {worker} ready ({}/{})", self.ready, self.worker_count());
            return None;
        }

        let frame = response.frame();
        let Some(job) = self.in_flight.as_mut().filter(|j| Some(j.frame) == frame) else {
            self.counters.stale += 1;
            trace!("ignoring response for stale frame {frame:?}");
            return None;
        };
        match response {
            WorkerResponse::Collided { slots, stats, .. } => {
                job.result = slots;
                job.stats.merge(&stats);
            }
            WorkerResponse::RangeDone { writes, stats, .. } => {
                writes.scatter_into(&mut job.result);
                job.stats.merge(&stats);
            }
            WorkerResponse::Failed { worker, reason, .. } => {
                warn!("collision worker {worker} failed frame {}: {reason}", job.frame);
                self.counters.failures += 1;
            }
            WorkerResponse::Ready { .. } => {}
        }
        job.pending = job.pending.saturating_sub(1);
        if job.pending > 0 {
            return None;
        }

        let job = self.in_flight.take()?;
        let applied = self.snapshot.reconcile(particles, &job.result)?;
        self.counters.completed += 1;
        self.counters.skipped_deltas += applied.skipped as u64;
        self.last_stats = Some(job.stats);
        Some(job.stats)
    }
}

/// Blocking helpers for native hosts and tests. A browser main thread must
/// never block, so these do not exist on wasm.
#[cfg(not(target_arch = "wasm32"))]
impl CollisionOrchestrator {
    /// Block until every worker acknowledged init or `timeout` passed.
    pub fn wait_ready(&mut self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while !self.is_ready() {
            if !self.recv_one(deadline, &mut []) {
                break;
            }
        }
        self.is_ready()
    }

    /// Block until the in-flight frame (if any) is reconciled or `timeout`
    /// passed.
    pub fn drain(&mut self, particles: &mut [Particle], timeout: std::time::Duration) -> Option<SolveStats> {
        let deadline = std::time::Instant::now() + timeout;
        let mut completed = None;
        while self.in_flight.is_some() {
            let before = self.counters.completed;
            if !self.recv_one(deadline, particles) {
                break;
            }
            if self.counters.completed > before {
                completed = self.last_stats;
            }
        }
        completed
    }

    fn recv_one(&mut self, deadline: std::time::Instant, particles: &mut [Particle]) -> bool {
        let Some(pool) = self.pool.as_ref() else { return false };
        let left = deadline.saturating_duration_since(std::time::Instant::now());
        if left.is_zero() {
            return false;
        }
        match pool.recv_timeout(left) {
            Ok(Some(response)) => {
                self.on_response(response, particles);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("collision workers lost, solving inline: {e}");
                self.fall_back_inline();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SolveParams {
        SolveParams { cell_size: 10.0, width: 100.0, height: 100.0, passes: 1 }
    }

    fn colliding() -> Vec<Particle> {
        vec![
            Particle::new(50.0, 50.0, 1.0, 0.0, 5.0, 1.0),
            Particle::new(56.0, 50.0, -1.0, 0.0, 5.0, 1.0),
        ]
    }

    #[test]
    fn disabled_settings_solve_inline() {
        let settings = ParallelSettings { enabled: false, ..ParallelSettings::default() };
        let mut orch = CollisionOrchestrator::new(&settings);
        assert_eq!(orch.mode(), ExecutionMode::Inline);
        assert!(orch.is_ready());
        let mut ps = colliding();
        let DispatchOutcome::Inline(stats) = orch.dispatch(&mut ps, &params()) else {
            panic!("expected an inline solve");
        };
        assert_eq!(stats.impulses, 1);
        assert!((ps[0].vx + 1.0).abs() < 1e-6);
        assert!(!orch.is_busy());
        assert_eq!(orch.poll(&mut ps), None);
    }

    #[test]
    fn inline_solve_repairs_nan_particles() {
        let mut orch = CollisionOrchestrator::inline(1);
        let mut ps = colliding();
        ps[0].vx = f32::NAN;
        orch.dispatch(&mut ps, &params());
        assert_eq!(orch.counters().repaired, 1);
        assert!(ps.iter().all(|p| p.vx.is_finite()));
    }

    #[test]
    fn invalidate_without_job_is_a_no_op() {
        let mut orch = CollisionOrchestrator::inline(1);
        orch.invalidate();
        assert_eq!(orch.counters().discarded, 0);
        assert_eq!(orch.pending_frame(), None);
    }

    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    mod pooled {
        use std::time::Duration;

        use super::*;

        const WAIT: Duration = Duration::from_secs(10);

        fn copy_settings() -> ParallelSettings {
            ParallelSettings { prefer_shared: false, ..ParallelSettings::default() }
        }

        #[test]
        fn dispatch_before_acks_is_dropped() {
            let mut orch = CollisionOrchestrator::new(&copy_settings());
            assert_eq!(orch.mode(), ExecutionMode::Copy);
            let mut ps = colliding();
            // Acks may already be queued, but they are only counted by poll.
            assert_eq!(orch.dispatch(&mut ps, &params()), DispatchOutcome::NotReady);
            assert_eq!(orch.counters().dropped_not_ready, 1);
        }

        #[test]
        fn copy_mode_round_trip() {
            let mut orch = CollisionOrchestrator::new(&copy_settings());
            assert!(orch.wait_ready(WAIT));
            let mut ps = colliding();
            assert_eq!(orch.dispatch(&mut ps, &params()), DispatchOutcome::Dispatched { frame: 1 });
            assert_eq!(orch.dispatch(&mut ps, &params()), DispatchOutcome::Busy);
            let stats = orch.drain(&mut ps, WAIT).expect("frame completes");
            assert_eq!(stats.impulses, 1);
            assert!((ps[1].x - ps[0].x - 10.0).abs() < 1e-4);
            assert_eq!(orch.counters().dropped_busy, 1);
            assert_eq!(orch.counters().completed, 1);
        }

        #[test]
        fn shared_mode_round_trip() {
            let settings = ParallelSettings { worker_count: Some(3), ..ParallelSettings::default() };
            let mut orch = CollisionOrchestrator::new(&settings);
            assert_eq!(orch.mode(), ExecutionMode::Shared);
            assert_eq!(orch.worker_count(), 3);
            assert!(orch.wait_ready(WAIT));
            let mut ps = colliding();
            assert!(matches!(orch.dispatch(&mut ps, &params()), DispatchOutcome::Dispatched { .. }));
            let stats = orch.drain(&mut ps, WAIT).expect("frame completes");
            assert_eq!(stats.impulses, 1);
            assert!((ps[0].vx + 1.0).abs() < 1e-6);
            assert!((ps[1].vx - 1.0).abs() < 1e-6);
        }

        #[test]
        fn invalidated_frame_is_ignored_when_it_lands() {
            let mut orch = CollisionOrchestrator::new(&copy_settings());
            assert!(orch.wait_ready(WAIT));
            let mut ps = colliding();
            orch.dispatch(&mut ps, &params());
            orch.invalidate();
            assert!(!orch.is_busy());
            let before = ps.clone();

            // The next frame can go out immediately; the old reply is stale.
            assert_eq!(orch.dispatch(&mut ps, &params()), DispatchOutcome::Dispatched { frame: 2 });
            orch.drain(&mut ps, WAIT);
            assert_eq!(orch.counters().stale, 1);
            assert_eq!(orch.counters().discarded, 1);
            assert_eq!(orch.counters().completed, 1);
            assert_ne!(ps, before);
        }
    }
}
