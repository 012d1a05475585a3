use crate::domain::config::{FRAME_DT, MAX_FRAME_DT};
use crate::systems::collision::SolveStats;
use crate::systems::hooks::{HookEnv, HookStage};
use crate::systems::integrate::{integrate, IntegrateParams};

use super::collide::{DispatchOutcome, ExecutionMode};
use super::perf_timer::{lap, PerfTimer};
use super::SimulationCore;

/// Shortest trailing substep worth running.
const MIN_PARTIAL_STEP: f32 = 1e-5;

fn timer(core: &SimulationCore) -> Option<PerfTimer> {
    core.perf_enabled.then(PerfTimer::start)
}

fn record_solve(core: &mut SimulationCore, stats: &SolveStats) {
    if !core.perf_enabled {
        return;
    }
    let perf = &mut core.perf_stats;
    perf.passes = stats.passes;
    perf.pairs_tested = perf.pairs_tested.saturating_add(stats.pairs_tested.min(u32::MAX as u64) as u32);
    perf.contacts = perf.contacts.saturating_add(stats.contacts.min(u32::MAX as u64) as u32);
    perf.impulses = perf.impulses.saturating_add(stats.impulses.min(u32::MAX as u64) as u32);
}

/// Fixed-timestep frame: land finished collision work, run the substeps, then
/// hand the new state to the pool (worker modes only).
pub(super) fn advance(core: &mut SimulationCore, frame_dt: f32) {
    if core.perf_enabled {
        core.perf_stats.reset();
    }
    let frame_timer = timer(core);

    poll_collisions(core);

    if !core.paused {
        let frame_dt = if frame_dt.is_finite() { frame_dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        let mut remaining = frame_dt * core.settings.time_scale;
        while remaining >= FRAME_DT {
            physics_step(core, FRAME_DT);
            remaining -= FRAME_DT;
        }
        if remaining > MIN_PARTIAL_STEP {
            physics_step(core, remaining);
        }

        if core.settings.collisions_enabled && core.collisions.mode() != ExecutionMode::Inline {
            let t = timer(core);
            let params = core.solve_params();
            // Busy and not-ready frames are dropped; the counters keep score.
            if let DispatchOutcome::Inline(stats) = core.collisions.dispatch(&mut core.particles, &params) {
                record_solve(core, &stats);
            }
            if core.perf_enabled {
                core.perf_stats.collide_ms += lap(t);
            }
        }
        core.frame += 1;
    }

    if core.perf_enabled {
        let counters = core.collisions.counters();
        let reallocations = core.collisions.buffer_reallocations();
        let mode = core.collisions.mode();
        let workers = core.collisions.worker_count();
        let perf = &mut core.perf_stats;
        perf.record_counters(&counters, reallocations);
        perf.record_mode(mode, workers);
        perf.particle_count = core.particles.len() as u32;
        perf.step_ms = lap(frame_timer);
    }
}

/// Apply a finished worker frame, if one has landed.
pub(super) fn poll_collisions(core: &mut SimulationCore) -> Option<SolveStats> {
    let t = timer(core);
    let landed = core.collisions.poll(&mut core.particles);
    if let Some(stats) = landed.as_ref() {
        record_solve(core, stats);
    }
    if core.perf_enabled {
        core.perf_stats.reconcile_ms += lap(t);
    }
    landed
}

/// One substep: type overrides, hook slots, integration and (inline mode
/// only) collisions.
pub(super) fn physics_step(core: &mut SimulationCore, dt: f32) {
    let env = HookEnv {
        dt,
        width: core.settings.width,
        height: core.settings.height,
        gravity: core.settings.gravity,
    };
    if core.perf_enabled {
        core.perf_stats.substeps += 1;
    }

    core.types.apply(&mut core.particles);

    let t = timer(core);
    core.hooks.run_stage(HookStage::Before, env, &mut core.particles, &core.types);
    let replaced = core.hooks.run_stage(HookStage::Replace, env, &mut core.particles, &core.types);
    if core.perf_enabled {
        core.perf_stats.hooks_ms += lap(t);
    }

    if !replaced {
        let t = timer(core);
        let params = IntegrateParams::from(&core.settings);
        integrate(&mut core.particles, &params, core.force.as_ref(), dt);
        if core.perf_enabled {
            core.perf_stats.integrate_ms += lap(t);
        }

        if core.settings.collisions_enabled && core.collisions.mode() == ExecutionMode::Inline {
            let t = timer(core);
            let params = core.solve_params();
            if let DispatchOutcome::Inline(stats) = core.collisions.dispatch(&mut core.particles, &params) {
                record_solve(core, &stats);
            }
            if core.perf_enabled {
                core.perf_stats.collide_ms += lap(t);
            }
        }
    }

    let t = timer(core);
    core.hooks.run_stage(HookStage::After, env, &mut core.particles, &core.types);
    core.hooks.run_per_particle(env, &mut core.particles);
    if core.perf_enabled {
        core.perf_stats.hooks_ms += lap(t);
    }
}
