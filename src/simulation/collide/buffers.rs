//! Transport buffer lifecycle.
//!
//! Particles are flattened into a stride-5 `f32` buffer plus an elasticity
//! array before every dispatch. In private mode both live in plain vectors
//! that get copied into worker messages; in shared mode they live in a
//! `SharedRegion` whose handle the workers keep. Either way the buffers are
//! resized lazily whenever the particle count or the mode changes, and never
//! used at the wrong size.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::core::{Error, Result};
use crate::domain::particle::{Particle, STRIDE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferMode {
    Private,
    Shared,
}

/// Transport buffer and elasticity array visible to every pool worker.
/// The control thread only writes while no job is reading.
#[derive(Debug, Default)]
pub struct SharedRegion {
    slots: RwLock<Vec<f32>>,
    elasticity: RwLock<Vec<f32>>,
}

impl SharedRegion {
    pub fn read_slots(&self) -> Result<RwLockReadGuard<'_, Vec<f32>>> {
        self.slots.read().map_err(|_| Error::Poisoned)
    }

    pub fn read_elasticity(&self) -> Result<RwLockReadGuard<'_, Vec<f32>>> {
        self.elasticity.read().map_err(|_| Error::Poisoned)
    }

    fn write_slots(&self) -> Result<RwLockWriteGuard<'_, Vec<f32>>> {
        self.slots.write().map_err(|_| Error::Poisoned)
    }

    fn write_elasticity(&self) -> Result<RwLockWriteGuard<'_, Vec<f32>>> {
        self.elasticity.write().map_err(|_| Error::Poisoned)
    }
}

/// Repair non-finite fields in place. Positions fall back to the radius
/// (just inside the top-left walls), velocities to zero, radius to zero.
/// Returns whether anything was touched.
pub fn sanitize_particle(p: &mut Particle) -> bool {
    let mut touched = false;
    if !(p.size.is_finite() && p.size >= 0.0) {
        p.size = 0.0;
        touched = true;
    }
    if !p.x.is_finite() {
        p.x = p.size;
        touched = true;
    }
    if !p.y.is_finite() {
        p.y = p.size;
        touched = true;
    }
    if !p.vx.is_finite() {
        p.vx = 0.0;
        touched = true;
    }
    if !p.vy.is_finite() {
        p.vy = 0.0;
        touched = true;
    }
    if !p.elasticity.is_finite() {
        p.elasticity = 0.0;
        touched = true;
    }
    touched
}

pub fn sanitize_particles(particles: &mut [Particle]) -> usize {
    particles.iter_mut().map(sanitize_particle).filter(|&touched| touched).count()
}

#[derive(Debug)]
pub struct TransportBuffers {
    mode: BufferMode,
    slots: Vec<f32>,
    elasticity: Vec<f32>,
    region: Arc<SharedRegion>,
    count: usize,
    sized: bool,
    reallocations: u64,
}

impl TransportBuffers {
    pub fn new(mode: BufferMode) -> Self {
        Self {
            mode,
            slots: Vec::new(),
            elasticity: Vec::new(),
            region: Arc::new(SharedRegion::default()),
            count: 0,
            sized: false,
            reallocations: 0,
        }
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    /// Switch storage; the next `ensure` reallocates.
    pub fn set_mode(&mut self, mode: BufferMode) {
        if self.mode != mode {
            self.mode = mode;
            self.sized = false;
        }
    }

    /// Handle to pass to pool workers.
    pub fn region(&self) -> Arc<SharedRegion> {
        Arc::clone(&self.region)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    /// Size the buffers for `count` particles. Returns whether they were
    /// reallocated.
    pub fn ensure(&mut self, count: usize) -> Result<bool> {
        if self.sized && self.count == count {
            return Ok(false);
        }
        let needed = count * STRIDE;
        match self.mode {
            BufferMode::Private => {
                self.slots = vec![0.0; needed];
                self.elasticity = vec![0.0; count];
                // A private buffer never keeps the shared copy alive.
                *self.region.write_slots()? = Vec::new();
                *self.region.write_elasticity()? = Vec::new();
            }
            BufferMode::Shared => {
                *self.region.write_slots()? = vec![0.0; needed];
                *self.region.write_elasticity()? = vec![0.0; count];
                self.slots = Vec::new();
                self.elasticity = Vec::new();
            }
        }
        debug!("transport buffers sized for {count} particles ({:?})", self.mode);
        self.count = count;
        self.sized = true;
        self.reallocations += 1;
        Ok(true)
    }

    /// Sanitize the particles and write them into the transport buffer.
    /// Returns how many particles needed repair.
    pub fn serialize(&mut self, particles: &mut [Particle]) -> Result<usize> {
        self.ensure(particles.len())?;
        let repaired = sanitize_particles(particles);
        if repaired > 0 {
            debug!("repaired {repaired} particles with non-finite fields");
        }
        match self.mode {
            BufferMode::Private => {
                write_all(particles, &mut self.slots, &mut self.elasticity);
            }
            BufferMode::Shared => {
                let mut slots = self.region.write_slots()?;
                let mut elasticity = self.region.write_elasticity()?;
                write_all(particles, &mut slots, &mut elasticity);
            }
        }
        Ok(repaired)
    }

    /// Copy of the current transport buffer.
    pub fn snapshot(&self) -> Result<Vec<f32>> {
        match self.mode {
            BufferMode::Private => Ok(self.slots.clone()),
            BufferMode::Shared => Ok(self.region.read_slots()?.clone()),
        }
    }

    /// Owned copies of both arrays, for a copy-mode job.
    pub fn copy_out(&self) -> Result<(Vec<f32>, Vec<f32>)> {
        match self.mode {
            BufferMode::Private => Ok((self.slots.clone(), self.elasticity.clone())),
            BufferMode::Shared => Ok((
                self.region.read_slots()?.clone(),
                self.region.read_elasticity()?.clone(),
            )),
        }
    }
}

fn write_all(particles: &[Particle], slots: &mut [f32], elasticity: &mut [f32]) {
    for ((p, slot), e) in particles
        .iter()
        .zip(slots.chunks_exact_mut(STRIDE))
        .zip(elasticity.iter_mut())
    {
        p.write_slot(slot);
        *e = p.elasticity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particles(n: usize) -> Vec<Particle> {
        (0..n).map(|i| Particle::new(i as f32, 1.0, 2.0, 3.0, 4.0, 0.5)).collect()
    }

    #[test]
    fn buffers_follow_particle_count() {
        let mut buffers = TransportBuffers::new(BufferMode::Private);
        let mut ps = particles(3);
        buffers.serialize(&mut ps).unwrap();
        assert_eq!(buffers.snapshot().unwrap().len(), 3 * STRIDE);
        assert!(!buffers.ensure(3).unwrap());

        ps.truncate(2);
        buffers.serialize(&mut ps).unwrap();
        assert_eq!(buffers.snapshot().unwrap().len(), 2 * STRIDE);
        assert_eq!(buffers.reallocations(), 2);
    }

    #[test]
    fn mode_switch_reallocates_into_the_region() {
        let mut buffers = TransportBuffers::new(BufferMode::Private);
        let mut ps = particles(2);
        buffers.serialize(&mut ps).unwrap();
        buffers.set_mode(BufferMode::Shared);
        buffers.serialize(&mut ps).unwrap();
        assert_eq!(buffers.reallocations(), 2);
        let region = buffers.region();
        let slots = region.read_slots().unwrap();
        assert_eq!(slots.len(), 2 * STRIDE);
        assert_eq!(&slots[STRIDE..], &[1.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(*region.read_elasticity().unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn serialize_repairs_non_finite_fields() {
        let mut buffers = TransportBuffers::new(BufferMode::Private);
        let mut ps = particles(2);
        ps[1].x = f32::NAN;
        ps[1].vy = f32::INFINITY;
        assert_eq!(buffers.serialize(&mut ps).unwrap(), 1);
        assert_eq!(ps[1].x, 4.0);
        assert_eq!(ps[1].vy, 0.0);
        assert!(buffers.snapshot().unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn sanitize_counts_each_repaired_particle_once() {
        let mut ps = particles(4);
        ps[0].vx = f32::NAN;
        ps[0].elasticity = f32::NEG_INFINITY;
        ps[2].y = f32::INFINITY;
        assert_eq!(sanitize_particles(&mut ps), 2);
        assert_eq!(ps[0].vx, 0.0);
        assert_eq!(ps[2].y, 4.0);
        assert_eq!(sanitize_particles(&mut ps), 0);
    }

    #[test]
    fn copy_out_is_independent() {
        let mut buffers = TransportBuffers::new(BufferMode::Private);
        let mut ps = particles(1);
        buffers.serialize(&mut ps).unwrap();
        let (mut slots, elasticity) = buffers.copy_out().unwrap();
        slots[0] = 99.0;
        assert_eq!(buffers.snapshot().unwrap()[0], 0.0);
        assert_eq!(elasticity, vec![0.5]);
    }
}
