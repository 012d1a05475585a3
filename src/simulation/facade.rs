use wasm_bindgen::prelude::*;

use crate::core::Error;
use crate::domain::config::SimSettings;
use crate::domain::types::TypePatch;
use crate::systems::integrate::ForceMode;

use super::collide::ExecutionMode;
use super::perf_stats::PerfStats;
use super::SimulationCore;

fn js_err(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct World {
    core: SimulationCore,
}

#[wasm_bindgen]
impl World {
    /// Default settings at the given canvas size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32) -> Result<World, JsValue> {
        let settings = SimSettings { width, height, ..SimSettings::default() };
        let core = SimulationCore::new(settings).map_err(js_err)?;
        Ok(Self { core })
    }

    #[wasm_bindgen(js_name = fromSettings)]
    pub fn from_settings(json: String) -> Result<World, JsValue> {
        let settings = SimSettings::from_json(&json).map_err(js_err)?;
        let core = SimulationCore::new(settings).map_err(js_err)?;
        Ok(Self { core })
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> f32 { self.core.settings().width }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> f32 { self.core.settings().height }

    #[wasm_bindgen(getter)]
    pub fn particle_count(&self) -> u32 { self.core.particle_count() as u32 }

    #[wasm_bindgen(getter)]
    pub fn frame(&self) -> u64 { self.core.frame() }

    #[wasm_bindgen(getter)]
    pub fn cell_size(&self) -> f32 { self.core.cell_size() }

    #[wasm_bindgen(getter)]
    pub fn gravity(&self) -> f32 { self.core.settings().gravity }

    #[wasm_bindgen(getter)]
    pub fn paused(&self) -> bool { self.core.is_paused() }

    #[wasm_bindgen(getter)]
    pub fn worker_count(&self) -> u32 { self.core.worker_count() as u32 }

    /// "inline", "copy" or "shared".
    #[wasm_bindgen(getter)]
    pub fn execution_mode(&self) -> String {
        match self.core.execution_mode() {
            ExecutionMode::Inline => "inline",
            ExecutionMode::Copy => "copy",
            ExecutionMode::Shared => "shared",
        }
        .to_string()
    }

    /// Advance by one rendered frame (seconds).
    pub fn advance(&mut self, dt: f32) {
        self.core.advance(dt);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.core.set_paused(paused);
    }

    /// Enable or disable per-frame perf metrics (adds timing overhead when enabled)
    pub fn enable_perf_metrics(&mut self, enabled: bool) {
        self.core.enable_perf_metrics(enabled);
    }

    /// Last frame perf snapshot (zeros when perf disabled)
    pub fn get_perf_stats(&self) -> PerfStats {
        self.core.get_perf_stats()
    }

    pub fn collision_counters_json(&self) -> String {
        serde_json::to_string(&self.core.collision_counters()).unwrap_or_else(|_| "{}".to_string())
    }

    // === SETTINGS ===

    pub fn settings_json(&self) -> String {
        self.core.settings().to_json()
    }

    pub fn apply_settings_json(&mut self, json: String) -> Result<(), JsValue> {
        let settings = SimSettings::from_json(&json).map_err(js_err)?;
        self.core.apply_settings(settings).map_err(js_err)
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.core.set_gravity(gravity);
    }

    pub fn gravity_up(&mut self) -> f32 {
        self.core.gravity_up()
    }

    pub fn gravity_down(&mut self) -> f32 {
        self.core.gravity_down()
    }

    /// Pick gravity so a resting body falls the canvas height in `seconds`.
    pub fn set_drop_time(&mut self, seconds: f32) -> Result<f32, JsValue> {
        self.core.set_drop_time(seconds).map_err(js_err)
    }

    pub fn set_passes(&mut self, passes: u32) {
        self.core.set_passes(passes);
    }

    pub fn set_collisions_enabled(&mut self, enabled: bool) {
        self.core.set_collisions_enabled(enabled);
    }

    pub fn set_time_scale(&mut self, scale: f32) -> Result<(), JsValue> {
        self.core.set_time_scale(scale).map_err(js_err)
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), JsValue> {
        self.core.resize(width, height).map_err(js_err)
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.core.set_parallel_enabled(enabled);
    }

    /// Hold the force tool at (x, y); `push` repels, otherwise it attracts.
    pub fn set_force(&mut self, x: f32, y: f32, push: bool) {
        let mode = if push { ForceMode::Push } else { ForceMode::Pull };
        self.core.set_force(x, y, mode);
    }

    pub fn clear_force(&mut self) {
        self.core.clear_force();
    }

    // === PARTICLES ===

    pub fn spawn(&mut self, count: u32) {
        self.core.spawn(count as usize);
    }

    pub fn spawn_at(&mut self, x: f32, y: f32, vx: f32, vy: f32) -> u32 {
        self.core.spawn_at(x, y, vx, vy) as u32
    }

    pub fn set_particle_count(&mut self, count: u32) {
        self.core.set_particle_count(count as usize);
    }

    pub fn set_particle_size(&mut self, size: f32) -> Result<(), JsValue> {
        self.core.set_particle_size(size).map_err(js_err)
    }

    pub fn set_elasticity(&mut self, elasticity: f32) -> Result<(), JsValue> {
        self.core.set_elasticity(elasticity).map_err(js_err)
    }

    pub fn randomize_velocities(&mut self) {
        self.core.randomize_velocities();
    }

    pub fn reset(&mut self) {
        self.core.reset();
    }

    pub fn clear(&mut self) {
        self.core.clear();
    }

    // === PRESETS ===

    pub fn apply_preset(&mut self, key: String) -> Result<(), JsValue> {
        self.core.apply_preset(&key).map_err(js_err)
    }

    pub fn preset_keys(&self) -> Vec<String> {
        self.core.presets().keys().into_iter().map(str::to_string).collect()
    }

    pub fn presets_json(&self) -> String {
        self.core.presets().to_json()
    }

    /// Merge presets from JSON; returns how many were loaded.
    pub fn load_presets_json(&mut self, json: String) -> Result<u32, JsValue> {
        self.core.load_presets_json(&json).map(|n| n as u32).map_err(js_err)
    }

    // === TYPES ===

    pub fn create_type(&mut self, name: String, color: String, elasticity: f32, gravity_scale: f32) -> Result<u32, JsValue> {
        self.core.create_type(&name, &color, elasticity, gravity_scale).map_err(js_err)
    }

    /// `patch` is a JSON object with any of name, color, elasticity,
    /// gravityScale, blobEligible.
    pub fn update_type(&mut self, id: u32, patch: String) -> Result<(), JsValue> {
        let patch: TypePatch = serde_json::from_str(&patch).map_err(|e| js_err(e.into()))?;
        self.core.update_type(id, patch).map_err(js_err)
    }

    pub fn remove_type(&mut self, id: u32) -> Result<(), JsValue> {
        self.core.remove_type(id).map_err(js_err)
    }

    pub fn set_active_type(&mut self, id: u32) -> Result<(), JsValue> {
        self.core.set_active_type(id).map_err(js_err)
    }

    /// Move the given particles into type `id`; returns how many moved.
    pub fn assign_type(&mut self, id: u32, indices: Vec<u32>) -> Result<u32, JsValue> {
        let indices: Vec<usize> = indices.into_iter().map(|i| i as usize).collect();
        self.core.assign_type(id, &indices).map(|n| n as u32).map_err(js_err)
    }

    pub fn types_json(&self) -> String {
        self.core.types().to_json()
    }

    pub fn load_types_json(&mut self, json: String) -> Result<(), JsValue> {
        self.core.load_types_json(&json).map_err(js_err)
    }

    // === RENDER ===

    /// Refresh the `x, y, size` buffer; returns its length in floats.
    pub fn extract_render(&mut self) -> u32 {
        self.core.extract_render() as u32
    }

    /// Pointer to the render buffer (valid until the next `extract_render`).
    pub fn render_ptr(&self) -> *const f32 {
        self.core.render_buffer().as_ptr()
    }

    pub fn render_len(&self) -> u32 {
        self.core.render_buffer().len() as u32
    }
}
