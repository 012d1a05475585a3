//! Collision execution: transport buffers, worker pool, and the orchestrator
//! that picks between inline, copy and shared-region solving.

pub mod buffers;
pub mod orchestrator;
pub mod pool;
pub mod protocol;
pub mod snapshot;
pub mod worker;

pub use buffers::{sanitize_particles, BufferMode, SharedRegion, TransportBuffers};
pub use orchestrator::{CollisionOrchestrator, DispatchCounters, DispatchOutcome, ExecutionMode};
pub use pool::{default_pool_size, shared_memory_supported, WorkerPool};
pub use protocol::{WorkerRequest, WorkerResponse};
pub use snapshot::{apply_deltas, ReconcileStats, Snapshot};
pub use worker::Worker;
