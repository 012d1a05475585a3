//! Collision resolution: pair resolver, sequential grid solver, and the
//! band-local solve used by the worker pool.

pub mod access;
pub mod band;
pub mod pair;
pub mod solver;

pub use access::BodyAccess;
pub(crate) use access::TransportView;
pub use band::{BandSolver, BandWrites};
pub use pair::{resolve_pair, ImpulseMode, PairOutcome};
pub use solver::{impulse_scale, SequentialSolver, SolveParams, SolveStats, BASE_PASSES};
