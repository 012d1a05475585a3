use super::{SimulationCore, RENDER_STRIDE};

/// Pack `x, y, size` per particle into the render buffer and return its
/// length in floats. Capacity is kept across shrinks, so the pointer handed
/// to JS usually stays put.
pub(super) fn extract(core: &mut SimulationCore) -> usize {
    let needed = core.particles.len() * RENDER_STRIDE;
    core.render.resize(needed, 0.0);
    for (p, out) in core.particles.iter().zip(core.render.chunks_exact_mut(RENDER_STRIDE)) {
        out[0] = p.x;
        out[1] = p.y;
        out[2] = p.size;
    }
    needed
}
