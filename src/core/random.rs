//! Seeded xorshift32 generator.
//!
//! Every consumer carries its own `u32` state so runs are reproducible and
//! workers never share a generator.

/// Seed used when callers do not provide one.
pub const DEFAULT_SEED: u32 = 12345;

/// Advance the state and return the next value. A zero state is remapped,
/// xorshift would otherwise stay at zero forever.
#[inline]
pub fn xorshift32(state: &mut u32) -> u32 {
    let mut x = if *state == 0 { DEFAULT_SEED } else { *state };
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Uniform float in `[0, 1)`.
#[inline]
pub fn unit_f32(state: &mut u32) -> f32 {
    (xorshift32(state) >> 8) as f32 / (1u32 << 24) as f32
}

/// Uniform float in `[lo, hi)`.
#[inline]
pub fn range_f32(state: &mut u32, lo: f32, hi: f32) -> f32 {
    lo + unit_f32(state) * (hi - lo)
}

/// Derive an independent stream for worker `index` from a base seed.
#[inline]
pub fn derive_seed(base: u32, index: u32) -> u32 {
    let mixed = base ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9);
    if mixed == 0 { DEFAULT_SEED } else { mixed }
}
