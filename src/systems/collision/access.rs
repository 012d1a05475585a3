//! Index-addressed body access.
//!
//! The resolver and solvers only ever see bodies through `BodyAccess`, so the
//! same code runs on live particles and on a flat transport buffer (the full
//! one, or a band-local copy).
//!
//! The stride-slot view stays inside the crate; outside code reaches bodies
//! through particle slices only.
//!
//! ```compile_fail
//! use bouncebox_engine::systems::collision::TransportView;
//! ```

use crate::domain::particle::{Particle, FIELD_SIZE, FIELD_VX, FIELD_VY, FIELD_X, FIELD_Y, STRIDE};

/// Elasticity used when a body has no entry in the elasticity array.
pub const FALLBACK_ELASTICITY: f32 = 1.0;

pub trait BodyAccess {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pos(&self, i: usize) -> (f32, f32);
    fn vel(&self, i: usize) -> (f32, f32);
    fn radius(&self, i: usize) -> f32;
    fn elasticity(&self, i: usize) -> f32;

    fn set_pos(&mut self, i: usize, x: f32, y: f32);
    fn set_vel(&mut self, i: usize, vx: f32, vy: f32);
}

impl BodyAccess for [Particle] {
    #[inline]
    fn len(&self) -> usize {
        <[Particle]>::len(self)
    }

    #[inline]
    fn pos(&self, i: usize) -> (f32, f32) {
        (self[i].x, self[i].y)
    }

    #[inline]
    fn vel(&self, i: usize) -> (f32, f32) {
        (self[i].vx, self[i].vy)
    }

    #[inline]
    fn radius(&self, i: usize) -> f32 {
        self[i].size
    }

    #[inline]
    fn elasticity(&self, i: usize) -> f32 {
        self[i].elasticity
    }

    #[inline]
    fn set_pos(&mut self, i: usize, x: f32, y: f32) {
        self[i].x = x;
        self[i].y = y;
    }

    #[inline]
    fn set_vel(&mut self, i: usize, vx: f32, vy: f32) {
        self[i].vx = vx;
        self[i].vy = vy;
    }
}

/// Stride-5 transport buffer plus its elasticity array.
///
/// Slot reads and writes go through `slot!` and are unchecked in release
/// builds: every index passed to the `BodyAccess` methods must be below
/// `len()`. The solvers only use indices taken from a grid built over this
/// view, which holds by construction.
pub(crate) struct TransportView<'a> {
    slots: &'a mut [f32],
    elasticity: &'a [f32],
    len: usize,
}

impl<'a> TransportView<'a> {
    pub(crate) fn new(slots: &'a mut [f32], elasticity: &'a [f32]) -> Self {
        let len = slots.len() / STRIDE;
        Self { slots, elasticity, len }
    }
}

impl BodyAccess for TransportView<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn pos(&self, i: usize) -> (f32, f32) {
        (*slot!(self.slots, i, FIELD_X), *slot!(self.slots, i, FIELD_Y))
    }

    #[inline]
    fn vel(&self, i: usize) -> (f32, f32) {
        (*slot!(self.slots, i, FIELD_VX), *slot!(self.slots, i, FIELD_VY))
    }

    #[inline]
    fn radius(&self, i: usize) -> f32 {
        *slot!(self.slots, i, FIELD_SIZE)
    }

    #[inline]
    fn elasticity(&self, i: usize) -> f32 {
        self.elasticity.get(i).copied().unwrap_or(FALLBACK_ELASTICITY)
    }

    #[inline]
    fn set_pos(&mut self, i: usize, x: f32, y: f32) {
        slot!(self.slots, i, FIELD_X = x);
        slot!(self.slots, i, FIELD_Y = y);
    }

    #[inline]
    fn set_vel(&mut self, i: usize, vx: f32, vy: f32) {
        slot!(self.slots, i, FIELD_VX = vx);
        slot!(self.slots, i, FIELD_VY = vy);
    }
}
