//! Bouncebox Engine - circle-particle collisions in WASM
//!
//! Architecture:
//! - core/        - errors, RNG, logging, slot macros
//! - domain/      - particles, settings, types, presets
//! - spatial/     - uniform grid and row bands
//! - systems/     - integration, behaviour hook, collision solvers
//! - simulation/  - frame loop, worker orchestration, JS facade

// Slot macros must be visible before the solvers.
#[macro_use]
pub mod core;
pub mod domain;
pub mod spatial;
pub mod systems;
pub mod simulation;

use wasm_bindgen::prelude::*;

// Thread pool initialization for the shared-memory collision path
#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
pub use wasm_bindgen_rayon::init_thread_pool;

// Better error messages in debug mode
#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Initialize the engine
#[wasm_bindgen]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    set_panic_hook();

    crate::core::logging::install(log::LevelFilter::Info);
    log::info!("bouncebox engine {} initialized", env!("CARGO_PKG_VERSION"));
}

/// Get engine version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Whether this build can host the shared-region worker pool.
#[wasm_bindgen]
pub fn shared_memory_supported() -> bool {
    simulation::collide::shared_memory_supported()
}

// Re-export main types
pub use crate::core::{Error, Result};
pub use domain::{Particle, SimSettings, TypeId, TypeRegistry};
pub use simulation::collide::{CollisionOrchestrator, DispatchCounters, ExecutionMode};
pub use simulation::{PerfStats, SimulationCore, World};
pub use systems::collision::{resolve_pair, SequentialSolver, SolveParams, SolveStats};
