//! Per-particle integration: gravity, walls, damping, speed cap, force tool.

use serde::{Deserialize, Serialize};

use crate::domain::config::SimSettings;
use crate::domain::particle::Particle;

/// Gravity bounds for the step up / step down controls.
pub const MIN_GRAVITY_STEP: f32 = 10.0;
pub const MAX_GRAVITY_STEP: f32 = 5000.0;
const GRAVITY_STEP_FACTOR: f32 = 1.2;

/// Below this squared distance the force tool has no usable direction.
const FORCE_DEAD_ZONE_SQ: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForceMode {
    Pull,
    Push,
}

impl ForceMode {
    #[inline]
    fn sign(self) -> f32 {
        match self {
            ForceMode::Pull => -1.0,
            ForceMode::Push => 1.0,
        }
    }
}

/// Radial force around a point, falling off linearly to zero at `radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceTool {
    pub x: f32,
    pub y: f32,
    pub strength: f32,
    pub radius: f32,
    pub mode: ForceMode,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegrateParams {
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    pub damping: f32,
    pub max_speed: f32,
}

impl From<&SimSettings> for IntegrateParams {
    fn from(s: &SimSettings) -> Self {
        Self {
            width: s.width,
            height: s.height,
            gravity: s.gravity,
            damping: s.velocity_damping,
            max_speed: s.max_speed,
        }
    }
}

/// Semi-implicit Euler step plus wall bounce.
#[inline]
pub fn step_particle(p: &mut Particle, params: &IntegrateParams, dt: f32) {
    let g_scale = if p.gravity_scale.is_finite() { p.gravity_scale } else { 1.0 };
    p.vy += params.gravity * g_scale * dt;
    p.x += p.vx * dt;
    p.y += p.vy * dt;
    bounce_walls(p, params.width, params.height);
}

/// Clamp the body inside `[size, extent - size]` and reflect the velocity
/// component scaled by its elasticity.
#[inline]
pub fn bounce_walls(p: &mut Particle, width: f32, height: f32) {
    if p.x - p.size < 0.0 {
        p.x = p.size;
        p.vx *= -p.elasticity;
    } else if p.x + p.size > width {
        p.x = width - p.size;
        p.vx *= -p.elasticity;
    }
    if p.y - p.size < 0.0 {
        p.y = p.size;
        p.vy *= -p.elasticity;
    } else if p.y + p.size > height {
        p.y = height - p.size;
        p.vy *= -p.elasticity;
    }
}

/// Accelerate toward (pull) or away from (push) the tool centre.
/// Acceleration is `strength * falloff / size`.
#[inline]
pub fn apply_force(p: &mut Particle, tool: &ForceTool, dt: f32) {
    let dx = p.x - tool.x;
    let dy = p.y - tool.y;
    let dist_sq = dx * dx + dy * dy;
    let r = tool.radius;
    if !(dist_sq < r * r && dist_sq > FORCE_DEAD_ZONE_SQ) || p.size <= 0.0 {
        return;
    }
    let dist = dist_sq.sqrt();
    let falloff = 1.0 - dist / r;
    let accel = tool.strength * falloff / p.size * tool.mode.sign();
    p.vx += dx / dist * accel * dt;
    p.vy += dy / dist * accel * dt;
}

#[inline]
pub fn damp_and_cap(p: &mut Particle, damping: f32, max_speed: f32) {
    p.vx *= damping;
    p.vy *= damping;
    let speed = p.speed();
    if speed > max_speed {
        let s = max_speed / speed;
        p.vx *= s;
        p.vy *= s;
    }
}

/// Full integration sweep for one substep.
pub fn integrate(particles: &mut [Particle], params: &IntegrateParams, force: Option<&ForceTool>, dt: f32) {
    for p in particles.iter_mut() {
        step_particle(p, params, dt);
        if let Some(tool) = force {
            apply_force(p, tool, dt);
        }
        damp_and_cap(p, params.damping, params.max_speed);
    }
}

/// Gravity that brings a body from rest at the top to the floor in `seconds`
/// (`2h / t²`).
pub fn gravity_for_drop_time(height: f32, seconds: f32) -> Option<f32> {
    (seconds.is_finite() && seconds > 0.0).then(|| 2.0 * height / (seconds * seconds))
}

pub fn gravity_step_up(gravity: f32) -> f32 {
    (gravity * GRAVITY_STEP_FACTOR).min(MAX_GRAVITY_STEP)
}

pub fn gravity_step_down(gravity: f32) -> f32 {
    (gravity / GRAVITY_STEP_FACTOR).max(MIN_GRAVITY_STEP)
}
