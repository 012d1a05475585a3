use log::debug;

use crate::core::{Error, Result};
use crate::domain::config::{clamp_passes, compute_cell_size, SimSettings};
use crate::systems::integrate::{gravity_for_drop_time, gravity_step_down, gravity_step_up, ForceMode, ForceTool};

use super::perf_stats::PerfStats;
use super::SimulationCore;

pub(super) fn enable_perf_metrics(core: &mut SimulationCore, enabled: bool) {
    core.perf_enabled = enabled;
    if !enabled {
        core.perf_stats.reset();
    }
}

pub(super) fn get_perf_stats(core: &SimulationCore) -> PerfStats {
    core.perf_stats.clone()
}

/// Recompute the broad-phase cell size from the live particle count.
pub(super) fn refresh_cell_size(core: &mut SimulationCore) {
    let s = &core.settings;
    core.cell_size = compute_cell_size(
        &s.collision.grid,
        s.width,
        s.height,
        core.particles.len(),
        s.particle_size,
    );
}

/// Replace all settings. The pool is rebuilt only when its own settings
/// change.
pub(super) fn apply_settings(core: &mut SimulationCore, mut next: SimSettings) -> Result<()> {
    next.validate()?;
    let rebuild_pool = next.collision.parallel != core.settings.collision.parallel;
    let resized = next.width != core.settings.width || next.height != core.settings.height;
    core.settings = next;
    if rebuild_pool {
        core.collisions.reconfigure(&core.settings.collision.parallel);
    } else if resized {
        core.collisions.invalidate();
    }
    refresh_cell_size(core);
    Ok(())
}

pub(super) fn set_gravity(core: &mut SimulationCore, gravity: f32) {
    if gravity.is_finite() {
        core.settings.gravity = gravity;
    }
}

pub(super) fn gravity_up(core: &mut SimulationCore) -> f32 {
    core.settings.gravity = gravity_step_up(core.settings.gravity);
    core.settings.gravity
}

pub(super) fn gravity_down(core: &mut SimulationCore) -> f32 {
    core.settings.gravity = gravity_step_down(core.settings.gravity);
    core.settings.gravity
}

/// Choose gravity so a body at rest falls the full height in `seconds`.
pub(super) fn set_drop_time(core: &mut SimulationCore, seconds: f32) -> Result<f32> {
    let g = gravity_for_drop_time(core.settings.height, seconds)
        .ok_or_else(|| Error::invalid(format!("drop time must be positive, got {seconds}")))?;
    core.settings.gravity = g;
    Ok(g)
}

pub(super) fn set_passes(core: &mut SimulationCore, passes: u32) {
    core.settings.collision.passes = clamp_passes(passes);
}

pub(super) fn set_collisions_enabled(core: &mut SimulationCore, enabled: bool) {
    core.settings.collisions_enabled = enabled;
    if !enabled {
        core.collisions.invalidate();
    }
}

pub(super) fn set_time_scale(core: &mut SimulationCore, scale: f32) -> Result<()> {
    if !(scale.is_finite() && scale >= 0.0) {
        return Err(Error::invalid("timeScale must be a non-negative number"));
    }
    core.settings.time_scale = scale;
    Ok(())
}

/// New world bounds. Particles outside are pulled back in on the next step by
/// the wall bounce.
pub(super) fn resize(core: &mut SimulationCore, width: f32, height: f32) -> Result<()> {
    let mut next = core.settings.clone();
    next.width = width;
    next.height = height;
    apply_settings(core, next)
}

pub(super) fn set_parallel_enabled(core: &mut SimulationCore, enabled: bool) {
    if core.settings.collision.parallel.enabled == enabled {
        return;
    }
    core.settings.collision.parallel.enabled = enabled;
    debug!("parallel collisions {}", if enabled { "on" } else { "off" });
    core.collisions.reconfigure(&core.settings.collision.parallel);
}

pub(super) fn set_force(core: &mut SimulationCore, x: f32, y: f32, mode: ForceMode) {
    core.force = Some(ForceTool {
        x,
        y,
        strength: core.settings.force.strength,
        radius: core.settings.force.radius,
        mode,
    });
}

pub(super) fn clear_force(core: &mut SimulationCore) {
    core.force = None;
}
