//! Simulation context: particles, settings, type registry, behaviour hook and
//! the collision orchestrator, advanced by a fixed-timestep loop.
//!
//! `SimulationCore` is the native API; `World` wraps it for JavaScript. The
//! helpers live in sibling files and take the core explicitly.

pub mod collide;

#[path = "perf/perf_timer.rs"]
mod perf_timer;
#[path = "perf/perf_stats.rs"]
mod perf_stats;
#[path = "init/init.rs"]
mod init;
#[path = "init/settings.rs"]
mod settings;
#[path = "commands/commands.rs"]
mod commands;
#[path = "step/step.rs"]
mod step;
#[path = "render/render_extract.rs"]
mod render_extract;
mod facade;

pub use facade::World;
pub use perf_stats::PerfStats;

use crate::core::Result;
use crate::domain::config::SimSettings;
use crate::domain::particle::Particle;
use crate::domain::presets::PresetLibrary;
use crate::domain::types::{TypeId, TypePatch, TypeRegistry};
use crate::systems::collision::{SolveParams, SolveStats};
use crate::systems::hooks::{BehaviorHook, HookHost};
use crate::systems::integrate::{ForceMode, ForceTool};

use collide::{CollisionOrchestrator, DispatchCounters, ExecutionMode};

/// Floats per particle in the render buffer: x, y, size.
pub const RENDER_STRIDE: usize = 3;

pub struct SimulationCore {
    settings: SimSettings,
    particles: Vec<Particle>,
    types: TypeRegistry,
    presets: PresetLibrary,
    hooks: HookHost,
    collisions: CollisionOrchestrator,
    force: Option<ForceTool>,
    cell_size: f32,
    paused: bool,
    frame: u64,
    rng_state: u32,

    render: Vec<f32>,

    perf_enabled: bool,
    perf_stats: PerfStats,
}

impl SimulationCore {
    /// Build a world and spawn `settings.particle_count` random particles.
    pub fn new(settings: SimSettings) -> Result<Self> {
        init::create_core(settings)
    }

    /// Same as `new`, but collisions are always solved on the calling thread.
    pub fn new_inline(settings: SimSettings) -> Result<Self> {
        init::create_core_inline(settings)
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Direct access for scripted edits. Adding or removing particles through
    /// this slice is impossible; use the particle commands for that.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn presets(&self) -> &PresetLibrary {
        &self.presets
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn solve_params(&self) -> SolveParams {
        SolveParams {
            cell_size: self.cell_size,
            width: self.settings.width,
            height: self.settings.height,
            passes: self.settings.collision.passes,
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.collisions.mode()
    }

    pub fn worker_count(&self) -> usize {
        self.collisions.worker_count()
    }

    pub fn collision_counters(&self) -> DispatchCounters {
        self.collisions.counters()
    }

    pub fn last_solve_stats(&self) -> Option<SolveStats> {
        self.collisions.last_stats()
    }

    pub fn collisions_busy(&self) -> bool {
        self.collisions.is_busy()
    }

    // === LOOP ===

    /// Advance by one rendered frame of `frame_dt` seconds.
    pub fn advance(&mut self, frame_dt: f32) {
        step::advance(self, frame_dt);
    }

    /// One physics substep without touching the worker pool.
    pub fn physics_step(&mut self, dt: f32) {
        step::physics_step(self, dt);
    }

    /// Land any finished collision frame. `advance` does this itself.
    pub fn poll_collisions(&mut self) -> Option<SolveStats> {
        step::poll_collisions(self)
    }

    /// Block until workers are ready. Native hosts and tests only.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn wait_for_workers(&mut self, timeout: std::time::Duration) -> bool {
        self.collisions.wait_ready(timeout)
    }

    /// Block until the in-flight collision frame is reconciled.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn finish_collisions(&mut self, timeout: std::time::Duration) -> Option<SolveStats> {
        self.collisions.drain(&mut self.particles, timeout)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // === SETTINGS ===

    pub fn enable_perf_metrics(&mut self, enabled: bool) {
        settings::enable_perf_metrics(self, enabled);
    }

    pub fn get_perf_stats(&self) -> PerfStats {
        settings::get_perf_stats(self)
    }

    pub fn apply_settings(&mut self, next: SimSettings) -> Result<()> {
        settings::apply_settings(self, next)
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        settings::set_gravity(self, gravity);
    }

    pub fn gravity_up(&mut self) -> f32 {
        settings::gravity_up(self)
    }

    pub fn gravity_down(&mut self) -> f32 {
        settings::gravity_down(self)
    }

    pub fn set_drop_time(&mut self, seconds: f32) -> Result<f32> {
        settings::set_drop_time(self, seconds)
    }

    pub fn set_passes(&mut self, passes: u32) {
        settings::set_passes(self, passes);
    }

    pub fn set_collisions_enabled(&mut self, enabled: bool) {
        settings::set_collisions_enabled(self, enabled);
    }

    pub fn set_time_scale(&mut self, scale: f32) -> Result<()> {
        settings::set_time_scale(self, scale)
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Result<()> {
        settings::resize(self, width, height)
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        settings::set_parallel_enabled(self, enabled);
    }

    pub fn set_force(&mut self, x: f32, y: f32, mode: ForceMode) {
        settings::set_force(self, x, y, mode);
    }

    pub fn clear_force(&mut self) {
        settings::clear_force(self);
    }

    pub fn force(&self) -> Option<&ForceTool> {
        self.force.as_ref()
    }

    // === PARTICLES ===

    pub fn spawn(&mut self, count: usize) {
        commands::spawn_random(self, count);
    }

    pub fn spawn_at(&mut self, x: f32, y: f32, vx: f32, vy: f32) -> usize {
        commands::spawn_at(self, x, y, vx, vy)
    }

    pub fn set_particle_count(&mut self, count: usize) {
        commands::set_particle_count(self, count);
    }

    pub fn set_particle_size(&mut self, size: f32) -> Result<()> {
        commands::set_particle_size(self, size)
    }

    pub fn set_elasticity(&mut self, elasticity: f32) -> Result<()> {
        commands::set_elasticity(self, elasticity)
    }

    pub fn randomize_velocities(&mut self) {
        commands::randomize_velocities(self);
    }

    /// Replace every particle with a fresh random set of the target count.
    pub fn reset(&mut self) {
        commands::reset(self);
    }

    pub fn clear(&mut self) {
        commands::clear(self);
    }

    pub fn apply_preset(&mut self, key: &str) -> Result<()> {
        commands::apply_preset(self, key)
    }

    pub fn load_presets_json(&mut self, json: &str) -> Result<usize> {
        self.presets.load_json(json)
    }

    // === TYPES ===

    pub fn create_type(&mut self, name: &str, color: &str, elasticity: f32, gravity_scale: f32) -> Result<TypeId> {
        self.types.create(name, color, elasticity, gravity_scale)
    }

    pub fn update_type(&mut self, id: TypeId, patch: TypePatch) -> Result<()> {
        self.types.update(id, patch)
    }

    pub fn remove_type(&mut self, id: TypeId) -> Result<()> {
        self.types.remove(id, &mut self.particles)
    }

    pub fn set_active_type(&mut self, id: TypeId) -> Result<()> {
        self.types.set_active(id)
    }

    pub fn assign_type(&mut self, id: TypeId, indices: &[usize]) -> Result<usize> {
        self.types.assign(id, indices, &mut self.particles)
    }

    pub fn load_types_json(&mut self, json: &str) -> Result<()> {
        commands::load_types_json(self, json)
    }

    // === HOOK ===

    pub fn install_hook(&mut self, hook: Box<dyn BehaviorHook>) {
        self.hooks.install(hook);
    }

    pub fn clear_hook(&mut self) {
        self.hooks.clear();
    }

    pub fn set_hook_enabled(&mut self, enabled: bool) {
        self.hooks.set_enabled(enabled);
    }

    pub fn hook_error(&self) -> Option<&str> {
        self.hooks.last_error()
    }

    // === RENDER ===

    /// Refresh the `x, y, size` render buffer and return its length in floats.
    pub fn extract_render(&mut self) -> usize {
        render_extract::extract(self)
    }

    pub fn render_buffer(&self) -> &[f32] {
        &self.render
    }
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
