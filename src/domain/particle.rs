//! Particle record and the stride-5 transport layout.

use serde::{Deserialize, Serialize};

use super::types::TypeId;

/// Floats per particle slot in the transport buffer: x, y, vx, vy, size.
pub const STRIDE: usize = 5;

pub const FIELD_X: usize = 0;
pub const FIELD_Y: usize = 1;
pub const FIELD_VX: usize = 2;
pub const FIELD_VY: usize = 3;
pub const FIELD_SIZE: usize = 4;

fn default_gravity_scale() -> f32 {
    1.0
}

/// One circular body. Owned by the simulation loop; the collision engine only
/// ever sees it flattened into a transport slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Radius.
    pub size: f32,
    /// Restitution in `[0, 1]`.
    pub elasticity: f32,
    #[serde(default)]
    pub type_id: Option<TypeId>,
    #[serde(default = "default_gravity_scale")]
    pub gravity_scale: f32,
}

impl Particle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, size: f32, elasticity: f32) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            size,
            elasticity,
            type_id: None,
            gravity_scale: 1.0,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }

    /// Write position, velocity and radius into `slot` (exactly `STRIDE` floats).
    #[inline]
    pub fn write_slot(&self, slot: &mut [f32]) {
        slot[FIELD_X] = self.x;
        slot[FIELD_Y] = self.y;
        slot[FIELD_VX] = self.vx;
        slot[FIELD_VY] = self.vy;
        slot[FIELD_SIZE] = self.size;
    }
}

/// Number of whole particle slots held by a flat buffer.
#[inline]
pub fn slot_count(slots: &[f32]) -> usize {
    slots.len() / STRIDE
}
