//! Scene presets.
//!
//! A preset is a bundle of settings plus a few spawn tweaks (velocity jitter,
//! a constant initial velocity, or a radial burst from the centre). Applying
//! one is the simulation's job; this module only holds the data.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub key: String,
    pub label: String,
    pub gravity: f32,
    pub particle_count: usize,
    pub size: f32,
    pub elasticity: f32,
    pub collision_passes: u32,
    #[serde(default)]
    pub blobs: bool,
    #[serde(default = "no_blobs")]
    pub blob_threshold: u32,
    #[serde(default = "default_force_strength")]
    pub force_strength: f32,
    #[serde(default = "default_force_radius")]
    pub force_radius: f32,
    /// Full width of the uniform velocity spread for new particles (px/s).
    #[serde(default = "default_jitter")]
    pub velocity_jitter: f32,
    #[serde(default)]
    pub initial_velocity: Option<Velocity>,
    #[serde(default)]
    pub radial_burst: bool,
    /// Recolours the active type when set.
    #[serde(default)]
    pub color: Option<String>,
}

fn no_blobs() -> u32 {
    999_999
}

fn default_force_strength() -> f32 {
    9001.0
}

fn default_force_radius() -> f32 {
    500.0
}

fn default_jitter() -> f32 {
    2.0
}

impl Preset {
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(Error::invalid("preset key must not be empty"));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(Error::invalid(format!("preset '{}' has a non-positive size", self.key)));
        }
        if !(0.0..=1.0).contains(&self.elasticity) {
            return Err(Error::invalid(format!(
                "preset '{}' elasticity must lie in [0, 1]",
                self.key
            )));
        }
        if !self.gravity.is_finite() || !self.velocity_jitter.is_finite() {
            return Err(Error::invalid(format!("preset '{}' has non-finite values", self.key)));
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn preset(
    key: &str,
    label: &str,
    gravity: f32,
    particle_count: usize,
    size: f32,
    elasticity: f32,
    collision_passes: u32,
    blob_threshold: Option<u32>,
    velocity_jitter: f32,
) -> Preset {
    Preset {
        key: key.to_string(),
        label: label.to_string(),
        gravity,
        particle_count,
        size,
        elasticity,
        collision_passes,
        blobs: blob_threshold.is_some(),
        blob_threshold: blob_threshold.unwrap_or_else(no_blobs),
        force_strength: default_force_strength(),
        force_radius: default_force_radius(),
        velocity_jitter,
        initial_velocity: None,
        radial_burst: false,
        color: None,
    }
}

/// The six scenes shipped with the engine.
pub fn builtin() -> Vec<Preset> {
    let mut heavy_rain = preset("heavyRain", "Heavy Rain", 1400.0, 3500, 3.0, 0.3, 2, None, 500.0);
    heavy_rain.initial_velocity = Some(Velocity { x: 0.0, y: 600.0 });

    let mut lava_pool = preset("lavaPool", "Lava Pool", 90.0, 2800, 6.0, 0.2, 6, Some(6), 20.0);
    lava_pool.color = Some("#ff5a00".to_string());

    let mut explosion = preset("explosion", "Explosion Demo", 50.0, 2000, 4.0, 0.4, 3, None, 900.0);
    explosion.radial_burst = true;

    vec![
        preset("lightSpray", "Light Spray", 150.0, 1200, 4.0, 0.85, 2, None, 150.0),
        preset("denseFluid", "Dense Fluid", 200.0, 5000, 5.0, 0.5, 5, Some(10), 40.0),
        preset("gasCloud", "Gas Cloud", 20.0, 4000, 3.0, 0.95, 1, Some(25), 80.0),
        heavy_rain,
        lava_pool,
        explosion,
    ]
}

/// Named presets; starts with the built-ins, more can be merged from JSON.
#[derive(Clone, Debug)]
pub struct PresetLibrary {
    presets: Vec<Preset>,
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self { presets: builtin() }
    }
}

impl PresetLibrary {
    pub fn get(&self, key: &str) -> Result<&Preset> {
        self.presets
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| Error::UnknownPreset(key.to_string()))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.key.as_str()).collect()
    }

    /// Merge a JSON array of presets; entries replace presets with the same key.
    /// Nothing is merged if any entry is invalid.
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let incoming: Vec<Preset> = serde_json::from_str(json)?;
        for p in incoming.iter() {
            p.validate()?;
        }
        let n = incoming.len();
        for p in incoming {
            match self.presets.iter_mut().find(|q| q.key == p.key) {
                Some(slot) => *slot = p,
                None => self.presets.push(p),
            }
        }
        Ok(n)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.presets).unwrap_or_else(|_| "[]".to_string())
    }
}
