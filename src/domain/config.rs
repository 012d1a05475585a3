//! Simulation settings.
//!
//! Settings arrive as camelCase JSON from the host page; every field has a
//! default so partial documents are fine. `validate` is the single gate for
//! values the engine cannot run with.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Fixed physics substep (seconds).
pub const FRAME_DT: f32 = 1.0 / 60.0;
/// Longest frame the loop will try to catch up on.
pub const MAX_FRAME_DT: f32 = 0.25;
/// Floor for the grid cell size in manual and startup sizing.
pub const MIN_CELL_SIZE: f32 = 32.0;
/// Collision quality dial bounds.
pub const MIN_PASSES: u32 = 1;
pub const MAX_PASSES: u32 = 10;
pub const DEFAULT_PASSES: u32 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimSettings {
    pub width: f32,
    pub height: f32,
    /// Downward acceleration in px/s².
    pub gravity: f32,
    pub time_scale: f32,
    pub velocity_damping: f32,
    pub max_speed: f32,
    pub particle_size: f32,
    pub particle_count: usize,
    pub elasticity: f32,
    pub collisions_enabled: bool,
    /// Visual merging of dense regions; read by the renderer only.
    pub blobs: bool,
    pub blob_threshold: u32,
    pub force: ForceSettings,
    pub collision: CollisionSettings,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            gravity: 300.0,
            time_scale: 1.0,
            velocity_damping: 0.999,
            max_speed: 1500.0,
            particle_size: 4.0,
            particle_count: 3000,
            elasticity: 0.9,
            collisions_enabled: true,
            blobs: false,
            blob_threshold: 999_999,
            force: ForceSettings::default(),
            collision: CollisionSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceSettings {
    pub strength: f32,
    pub radius: f32,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self { strength: 9001.0, radius: 500.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollisionSettings {
    pub passes: u32,
    pub grid: GridSizing,
    pub parallel: ParallelSettings,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            passes: DEFAULT_PASSES,
            grid: GridSizing::default(),
            parallel: ParallelSettings::default(),
        }
    }
}

/// How the broad-phase cell size is chosen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum GridSizing {
    /// Track particle spacing: `max(2·size, sqrt(area / count) · factor)`.
    Auto { factor: f32 },
    /// Fixed size, never smaller than one particle diameter.
    #[serde(rename_all = "camelCase")]
    Manual { cell_size: f32 },
}

impl Default for GridSizing {
    fn default() -> Self {
        GridSizing::Auto { factor: 1.1 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallelSettings {
    /// Run collision solving off the control thread.
    pub enabled: bool,
    /// Use the shared-region worker pool when the runtime supports it.
    pub prefer_shared: bool,
    /// Pool size override; `None` means hardware concurrency minus one, in `[1, 8]`.
    pub worker_count: Option<usize>,
    /// Base seed for the coincidence tie-break.
    pub seed: u32,
}

impl Default for ParallelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prefer_shared: true,
            worker_count: None,
            seed: crate::core::random::DEFAULT_SEED,
        }
    }
}

impl SimSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: SimSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Reject values the engine cannot run with and clamp the quality dial.
    pub fn validate(&mut self) -> Result<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(Error::invalid(format!("width must be positive, got {}", self.width)));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(Error::invalid(format!("height must be positive, got {}", self.height)));
        }
        if !(self.particle_size.is_finite() && self.particle_size > 0.0) {
            return Err(Error::invalid(format!(
                "particleSize must be positive, got {}",
                self.particle_size
            )));
        }
        if !(0.0..=1.0).contains(&self.elasticity) {
            return Err(Error::invalid(format!(
                "elasticity must lie in [0, 1], got {}",
                self.elasticity
            )));
        }
        if !self.gravity.is_finite() {
            return Err(Error::invalid("gravity must be finite"));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(Error::invalid("timeScale must be a non-negative number"));
        }
        match self.collision.grid {
            GridSizing::Auto { factor } if !(factor.is_finite() && factor > 0.0) => {
                return Err(Error::invalid("grid factor must be positive"));
            }
            GridSizing::Manual { cell_size } if !(cell_size.is_finite() && cell_size > 0.0) => {
                return Err(Error::invalid("cellSize must be positive"));
            }
            _ => {}
        }
        if self.collision.parallel.worker_count == Some(0) {
            return Err(Error::invalid("workerCount must be at least 1"));
        }
        self.collision.passes = clamp_passes(self.collision.passes);
        Ok(())
    }

    /// Cell size for the current world, particle size and target count.
    pub fn cell_size(&self) -> f32 {
        compute_cell_size(
            &self.collision.grid,
            self.width,
            self.height,
            self.particle_count,
            self.particle_size,
        )
    }
}

#[inline]
pub fn clamp_passes(passes: u32) -> u32 {
    passes.clamp(MIN_PASSES, MAX_PASSES)
}

/// Broad-phase cell size; never smaller than one particle diameter.
pub fn compute_cell_size(
    sizing: &GridSizing,
    width: f32,
    height: f32,
    particle_count: usize,
    particle_size: f32,
) -> f32 {
    let diameter = particle_size * 2.0;
    match *sizing {
        GridSizing::Manual { cell_size } => diameter.max(cell_size),
        GridSizing::Auto { factor } => {
            if particle_count == 0 {
                return diameter.max(MIN_CELL_SIZE);
            }
            let spacing = (width * height / particle_count as f32).sqrt();
            diameter.max(spacing * factor)
        }
    }
}
