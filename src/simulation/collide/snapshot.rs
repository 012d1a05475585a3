//! Pre-dispatch snapshot and delta reconciliation.
//!
//! While a job is out, the control thread keeps integrating. When the result
//! lands we add `result - snapshot` to each live particle, so the collision
//! correction is layered on top of whatever motion happened meanwhile.

use log::trace;

use crate::domain::particle::{Particle, FIELD_VX, FIELD_VY, FIELD_X, FIELD_Y, STRIDE};

/// Outcome of one reconcile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub particles: usize,
    /// Individual components skipped because their delta was NaN or infinite.
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct Snapshot {
    data: Vec<f32>,
    held: bool,
}

impl Snapshot {
    /// Hold `slots` as the pre-dispatch state, replacing any earlier one.
    pub fn capture(&mut self, slots: Vec<f32>) {
        self.data = slots;
        self.held = true;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.held = false;
        self.data.clear();
    }

    /// Apply `result - snapshot` to the particles and drop the snapshot.
    /// Does nothing when no snapshot is held.
    pub fn reconcile(&mut self, particles: &mut [Particle], result: &[f32]) -> Option<ReconcileStats> {
        if !self.held {
            return None;
        }
        let stats = apply_deltas(particles, result, &self.data);
        self.clear();
        Some(stats)
    }
}

/// Add the position and velocity deltas between `result` and `snapshot` to
/// the live particles. Radius is never reconciled. Only the common prefix of
/// the three inputs is touched.
pub fn apply_deltas(particles: &mut [Particle], result: &[f32], snapshot: &[f32]) -> ReconcileStats {
    let count = particles
        .len()
        .min(result.len() / STRIDE)
        .min(snapshot.len() / STRIDE);
    let mut stats = ReconcileStats { particles: count, skipped: 0 };

    for (i, p) in particles[..count].iter_mut().enumerate() {
        let at = i * STRIDE;
        let fields: [(&mut f32, usize); 4] = [
            (&mut p.x, FIELD_X),
            (&mut p.y, FIELD_Y),
            (&mut p.vx, FIELD_VX),
            (&mut p.vy, FIELD_VY),
        ];
        for (value, field) in fields {
            let delta = result[at + field] - snapshot[at + field];
            if delta.is_finite() {
                *value += delta;
            } else {
                stats.skipped += 1;
            }
        }
    }
    if stats.skipped > 0 {
        trace!("reconcile skipped {} non-finite deltas", stats.skipped);
    }
    stats
}
