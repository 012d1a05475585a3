use std::f32::consts::TAU;

use log::debug;

use crate::core::random::{range_f32, unit_f32};
use crate::core::{Error, Result};
use crate::domain::config::clamp_passes;
use crate::domain::particle::Particle;
use crate::domain::types::{TypePatch, TypeRegistry};

use super::settings::refresh_cell_size;
use super::SimulationCore;

/// Velocity jitter for particles spawned outside a preset.
const DEFAULT_JITTER: f32 = 2.0;

/// Uniform in `[size, extent - size]`, or the centre when the body does not fit.
fn random_coord(rng: &mut u32, extent: f32, size: f32) -> f32 {
    if extent > 2.0 * size {
        range_f32(rng, size, extent - size)
    } else {
        extent * 0.5
    }
}

fn jitter(rng: &mut u32, amount: f32) -> f32 {
    (unit_f32(rng) - 0.5) * amount
}

/// Any change to the particle set makes an in-flight collision frame
/// meaningless and changes the grid density.
fn particles_changed(core: &mut SimulationCore) {
    core.collisions.invalidate();
    refresh_cell_size(core);
}

fn push_random(core: &mut SimulationCore, count: usize, size: f32, elasticity: f32, velocity_jitter: f32) {
    let (w, h) = (core.settings.width, core.settings.height);
    core.particles.reserve(count);
    for _ in 0..count {
        let rng = &mut core.rng_state;
        let x = random_coord(rng, w, size);
        let y = random_coord(rng, h, size);
        let vx = jitter(rng, velocity_jitter);
        let vy = jitter(rng, velocity_jitter);
        let mut p = Particle::new(x, y, vx, vy, size, elasticity);
        core.types.adopt(&mut p);
        core.particles.push(p);
    }
}

pub(super) fn spawn_random(core: &mut SimulationCore, count: usize) {
    if count == 0 {
        return;
    }
    let size = core.settings.particle_size;
    let elasticity = core.settings.elasticity;
    push_random(core, count, size, elasticity, DEFAULT_JITTER);
    particles_changed(core);
}

/// One particle of the active type at a given spot. Returns its index.
pub(super) fn spawn_at(core: &mut SimulationCore, x: f32, y: f32, vx: f32, vy: f32) -> usize {
    let mut p = Particle::new(x, y, vx, vy, core.settings.particle_size, core.settings.elasticity);
    core.types.adopt(&mut p);
    core.particles.push(p);
    particles_changed(core);
    core.particles.len() - 1
}

pub(super) fn set_particle_count(core: &mut SimulationCore, count: usize) {
    core.settings.particle_count = count;
    let live = core.particles.len();
    if count > live {
        spawn_random(core, count - live);
    } else if count < live {
        core.particles.truncate(count);
        particles_changed(core);
    }
}

pub(super) fn set_particle_size(core: &mut SimulationCore, size: f32) -> Result<()> {
    if !(size.is_finite() && size > 0.0) {
        return Err(Error::invalid(format!("particle size must be positive, got {size}")));
    }
    core.settings.particle_size = size;
    for p in core.particles.iter_mut() {
        p.size = size;
    }
    refresh_cell_size(core);
    Ok(())
}

/// Types override particle elasticity every substep, so the new value goes
/// onto every type as well as every particle.
fn set_all_elasticity(particles: &mut [Particle], types: &mut TypeRegistry, elasticity: f32) -> Result<()> {
    let ids: Vec<_> = types.iter().map(|t| t.id).collect();
    for id in ids {
        types.update(id, TypePatch { elasticity: Some(elasticity), ..TypePatch::default() })?;
    }
    for p in particles.iter_mut() {
        p.elasticity = elasticity;
    }
    Ok(())
}

pub(super) fn set_elasticity(core: &mut SimulationCore, elasticity: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&elasticity) {
        return Err(Error::invalid(format!("elasticity must lie in [0, 1], got {elasticity}")));
    }
    set_all_elasticity(&mut core.particles, &mut core.types, elasticity)?;
    core.settings.elasticity = elasticity;
    Ok(())
}

pub(super) fn randomize_velocities(core: &mut SimulationCore) {
    let rng = &mut core.rng_state;
    for p in core.particles.iter_mut() {
        p.vx = jitter(rng, DEFAULT_JITTER);
        p.vy = jitter(rng, DEFAULT_JITTER);
    }
}

pub(super) fn reset(core: &mut SimulationCore) {
    core.particles.clear();
    let target = core.settings.particle_count;
    spawn_random(core, target);
    particles_changed(core);
}

pub(super) fn clear(core: &mut SimulationCore) {
    core.particles.clear();
    particles_changed(core);
}

pub(super) fn apply_preset(core: &mut SimulationCore, key: &str) -> Result<()> {
    let preset = core.presets.get(key)?.clone();
    debug!("applying preset {}", preset.key);

    let live = core.particles.len();
    if preset.particle_count > live {
        push_random(core, preset.particle_count - live, preset.size, preset.elasticity, preset.velocity_jitter);
    } else {
        core.particles.truncate(preset.particle_count);
    }
    for p in core.particles.iter_mut() {
        p.size = preset.size;
    }
    set_all_elasticity(&mut core.particles, &mut core.types, preset.elasticity)?;

    let s = &mut core.settings;
    s.gravity = preset.gravity;
    s.particle_count = preset.particle_count;
    s.particle_size = preset.size;
    s.elasticity = preset.elasticity;
    s.collision.passes = clamp_passes(preset.collision_passes);
    s.blobs = preset.blobs;
    s.blob_threshold = preset.blob_threshold;
    s.force.strength = preset.force_strength;
    s.force.radius = preset.force_radius;

    if let Some(color) = preset.color.clone() {
        let active = core.types.active().id;
        core.types.update(active, TypePatch { color: Some(color), ..TypePatch::default() })?;
    }

    if preset.radial_burst {
        let (cx, cy) = (core.settings.width * 0.5, core.settings.height * 0.5);
        let rng = &mut core.rng_state;
        for p in core.particles.iter_mut() {
            let angle = unit_f32(rng) * TAU;
            let speed = (unit_f32(rng) * 0.5 + 0.5) * preset.velocity_jitter;
            p.x = cx;
            p.y = cy;
            p.vx = angle.cos() * speed;
            p.vy = angle.sin() * speed;
        }
    } else if let Some(v) = preset.initial_velocity {
        for p in core.particles.iter_mut() {
            p.vx += v.x;
            p.vy += v.y;
        }
    }

    particles_changed(core);
    Ok(())
}

/// Replace the type registry. Particles pointing at types that no longer
/// exist fall back to Default on the next substep.
pub(super) fn load_types_json(core: &mut SimulationCore, json: &str) -> Result<()> {
    core.types = TypeRegistry::from_json(json)?;
    core.types.apply(&mut core.particles);
    Ok(())
}
