//! Narrow phase: one candidate pair.

use crate::core::random::unit_f32;

use super::access::BodyAccess;

/// Per-axis jitter bound for exactly coincident centres.
const COINCIDENT_JITTER: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImpulseMode {
    /// De-overlap only.
    PositionOnly,
    /// De-overlap, then exchange normal velocity scaled by `scale`.
    Apply { scale: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairOutcome {
    /// Not overlapping (or not comparable); nothing written.
    Apart,
    /// Pushed apart, velocities untouched.
    Separated,
    /// Pushed apart and an impulse was exchanged.
    Bounced,
}

/// Resolve the pair `(a, b)` in place.
///
/// Both bodies move half the overlap along the contact normal (equal mass).
/// When `mode` applies an impulse and the pair is approaching, each velocity
/// changes by `-(1 + e) * v_n / 2 * scale` along the normal, with `e` the
/// lower of the two elasticities. `rng` only feeds the coincident-centre
/// tie-break.
#[inline]
pub fn resolve_pair<B: BodyAccess + ?Sized>(
    bodies: &mut B,
    a: usize,
    b: usize,
    mode: ImpulseMode,
    rng: &mut u32,
) -> PairOutcome {
    let (ax, ay) = bodies.pos(a);
    let (bx, by) = bodies.pos(b);
    let mut dx = bx - ax;
    let mut dy = by - ay;
    let mut dist_sq = dx * dx + dy * dy;

    if dist_sq == 0.0 {
        dx = (unit_f32(rng) - 0.5) * COINCIDENT_JITTER;
        dy = (unit_f32(rng) - 0.5) * COINCIDENT_JITTER;
        if dx == 0.0 && dy == 0.0 {
            dx = COINCIDENT_JITTER * 0.5;
        }
        dist_sq = dx * dx + dy * dy;
    }

    let min_dist = bodies.radius(a) + bodies.radius(b);
    // NaN compares false and falls through here.
    if !(dist_sq < min_dist * min_dist) {
        return PairOutcome::Apart;
    }

    let dist = dist_sq.sqrt();
    let nx = dx / dist;
    let ny = dy / dist;
    let push = (min_dist - dist) * 0.5;

    bodies.set_pos(a, ax - nx * push, ay - ny * push);
    bodies.set_pos(b, bx + nx * push, by + ny * push);

    let ImpulseMode::Apply { scale } = mode else {
        return PairOutcome::Separated;
    };

    let (avx, avy) = bodies.vel(a);
    let (bvx, bvy) = bodies.vel(b);
    let vn = (bvx - avx) * nx + (bvy - avy) * ny;
    if vn >= 0.0 {
        return PairOutcome::Separated;
    }

    let e = bodies.elasticity(a).min(bodies.elasticity(b));
    let j = -(1.0 + e) * vn * 0.5 * scale;
    bodies.set_vel(a, avx - j * nx, avy - j * ny);
    bodies.set_vel(b, bvx + j * nx, bvy + j * ny);
    PairOutcome::Bounced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::DEFAULT_SEED;
    use crate::domain::particle::Particle;

    fn pair(a: Particle, b: Particle) -> Vec<Particle> {
        vec![a, b]
    }

    #[test]
    fn head_on_elastic_swap() {
        let mut ps = pair(
            Particle::new(100.0, 100.0, 1.0, 0.0, 5.0, 1.0),
            Particle::new(106.0, 100.0, -1.0, 0.0, 5.0, 1.0),
        );
        let mut rng = DEFAULT_SEED;
        let out = resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::Apply { scale: 1.0 }, &mut rng);
        assert_eq!(out, PairOutcome::Bounced);
        assert!((ps[1].x - ps[0].x - 10.0).abs() < 1e-5);
        assert!((ps[0].vx + 1.0).abs() < 1e-6);
        assert!((ps[1].vx - 1.0).abs() < 1e-6);
        assert_eq!(ps[0].vy, 0.0);
    }

    #[test]
    fn separating_pair_keeps_velocity() {
        let mut ps = pair(
            Particle::new(0.0, 0.0, -3.0, 1.0, 5.0, 1.0),
            Particle::new(4.0, 0.0, 3.0, 1.0, 5.0, 1.0),
        );
        let mut rng = DEFAULT_SEED;
        let out = resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::Apply { scale: 1.0 }, &mut rng);
        assert_eq!(out, PairOutcome::Separated);
        assert_eq!((ps[0].vx, ps[0].vy), (-3.0, 1.0));
        assert_eq!((ps[1].vx, ps[1].vy), (3.0, 1.0));
        assert!((ps[1].x - ps[0].x - 10.0).abs() < 1e-5);
    }

    #[test]
    fn non_overlapping_pair_is_untouched() {
        let before = pair(
            Particle::new(0.0, 0.0, 5.0, 0.0, 2.0, 1.0),
            Particle::new(4.0, 0.0, -5.0, 0.0, 2.0, 1.0),
        );
        let mut ps = before.clone();
        let mut rng = DEFAULT_SEED;
        let out = resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::Apply { scale: 1.0 }, &mut rng);
        assert_eq!(out, PairOutcome::Apart);
        assert_eq!(ps, before);
    }

    #[test]
    fn coincident_centres_stay_finite() {
        let mut ps = pair(
            Particle::new(50.0, 50.0, 0.0, 0.0, 4.0, 0.9),
            Particle::new(50.0, 50.0, 0.0, 0.0, 4.0, 0.9),
        );
        let mut rng = DEFAULT_SEED;
        resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::Apply { scale: 1.0 }, &mut rng);
        for p in ps.iter() {
            assert!(p.x.is_finite() && p.y.is_finite() && p.vx.is_finite() && p.vy.is_finite());
        }
        // The jitter only picks the normal; centres end short of contact by at
        // most its length.
        let d = (ps[1].x - ps[0].x).hypot(ps[1].y - ps[0].y);
        assert!(d >= 8.0 - COINCIDENT_JITTER, "distance {d}");
        assert!(d <= 8.0 + 1e-3, "distance {d}");
    }

    #[test]
    fn nan_position_is_treated_as_apart() {
        let mut ps = pair(
            Particle::new(f32::NAN, 0.0, 0.0, 0.0, 4.0, 0.9),
            Particle::new(1.0, 0.0, 0.0, 0.0, 4.0, 0.9),
        );
        let mut rng = DEFAULT_SEED;
        let out = resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::PositionOnly, &mut rng);
        assert_eq!(out, PairOutcome::Apart);
        assert_eq!(ps[1].x, 1.0);
    }

    #[test]
    fn lower_elasticity_wins_and_scale_applies() {
        let mut ps = pair(
            Particle::new(0.0, 0.0, 2.0, 0.0, 5.0, 1.0),
            Particle::new(8.0, 0.0, 0.0, 0.0, 5.0, 0.0),
        );
        let mut rng = DEFAULT_SEED;
        resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::Apply { scale: 0.5 }, &mut rng);
        // vn = -2, e = 0, j = 0.5
        assert!((ps[0].vx - 1.5).abs() < 1e-6);
        assert!((ps[1].vx - 0.5).abs() < 1e-6);
    }

    #[test]
    fn position_only_leaves_velocity() {
        let mut ps = pair(
            Particle::new(0.0, 0.0, 2.0, 0.0, 5.0, 1.0),
            Particle::new(8.0, 0.0, -2.0, 0.0, 5.0, 1.0),
        );
        let mut rng = DEFAULT_SEED;
        let out = resolve_pair(ps.as_mut_slice(), 0, 1, ImpulseMode::PositionOnly, &mut rng);
        assert_eq!(out, PairOutcome::Separated);
        assert_eq!(ps[0].vx, 2.0);
        assert_eq!(ps[0].x, -1.0);
        assert_eq!(ps[1].x, 9.0);
    }
}
