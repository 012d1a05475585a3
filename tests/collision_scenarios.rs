use bouncebox_engine::{Particle, SequentialSolver, SolveParams};

fn params(passes: u32) -> SolveParams {
    SolveParams { cell_size: 12.0, width: 120.0, height: 120.0, passes }
}

fn total_overlap(ps: &[Particle]) -> f32 {
    let mut sum = 0.0;
    for i in 0..ps.len() {
        for j in i + 1..ps.len() {
            let d = (ps[j].x - ps[i].x).hypot(ps[j].y - ps[i].y);
            sum += (ps[i].size + ps[j].size - d).max(0.0);
        }
    }
    sum
}

fn kinetic(ps: &[Particle]) -> f32 {
    ps.iter().map(|p| p.vx * p.vx + p.vy * p.vy).sum::<f32>() * 0.5
}

/// 10x10 lattice at spacing 9 with radius 5: every neighbour overlaps by 1.
fn packed_lattice() -> Vec<Particle> {
    (0..100)
        .map(|i| {
            let (col, row) = ((i % 10) as f32, (i / 10) as f32);
            let vx = if i % 2 == 0 { 3.0 } else { -3.0 };
            Particle::new(15.0 + col * 9.0, 15.0 + row * 9.0, vx, 1.0, 5.0, 0.9)
        })
        .collect()
}

#[test]
fn head_on_equal_bodies_swap_velocities() {
    let mut ps = vec![
        Particle::new(50.0, 60.0, 2.0, 0.0, 5.0, 1.0),
        Particle::new(58.0, 60.0, -2.0, 0.0, 5.0, 1.0),
    ];
    let stats = SequentialSolver::default().solve(ps.as_mut_slice(), &params(1));

    assert_eq!(stats.impulses, 1);
    assert!((ps[0].vx + 2.0).abs() < 1e-6);
    assert!((ps[1].vx - 2.0).abs() < 1e-6);
    assert!((ps[1].x - ps[0].x - 10.0).abs() < 1e-4);
}

#[test]
fn lower_elasticity_wins() {
    let mut ps = vec![
        Particle::new(50.0, 60.0, 2.0, 0.0, 5.0, 1.0),
        Particle::new(58.0, 60.0, -2.0, 0.0, 5.0, 0.0),
    ];
    SequentialSolver::default().solve(ps.as_mut_slice(), &params(1));
    // Perfectly inelastic: both end with zero relative normal velocity.
    assert!(ps[0].vx.abs() < 1e-6);
    assert!(ps[1].vx.abs() < 1e-6);
}

#[test]
fn separating_pair_only_moves_apart() {
    let mut ps = vec![
        Particle::new(50.0, 60.0, -4.0, 0.0, 5.0, 1.0),
        Particle::new(56.0, 60.0, 4.0, 0.0, 5.0, 1.0),
    ];
    let stats = SequentialSolver::default().solve(ps.as_mut_slice(), &params(1));
    assert_eq!(stats.impulses, 0);
    assert_eq!(stats.contacts, 1);
    assert_eq!((ps[0].vx, ps[1].vx), (-4.0, 4.0));
    assert!((ps[1].x - ps[0].x - 10.0).abs() < 1e-4);
}

#[test]
fn coincident_centres_are_pulled_apart() {
    let mut ps = vec![
        Particle::new(60.0, 60.0, 0.0, 0.0, 5.0, 1.0),
        Particle::new(60.0, 60.0, 0.0, 0.0, 5.0, 1.0),
    ];
    SequentialSolver::new(7).solve(ps.as_mut_slice(), &params(3));
    let d = (ps[1].x - ps[0].x).hypot(ps[1].y - ps[0].y);
    assert!(d >= 10.0 - 1e-3, "still overlapping at distance {d}");
    assert!(ps.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
}

#[test]
fn more_passes_untangle_more() {
    let before = total_overlap(&packed_lattice());

    let mut one = packed_lattice();
    SequentialSolver::default().solve(one.as_mut_slice(), &params(1));
    let mut many = packed_lattice();
    SequentialSolver::default().solve(many.as_mut_slice(), &params(8));

    let after_one = total_overlap(&one);
    let after_many = total_overlap(&many);
    assert!(after_one < before);
    assert!(after_many < after_one, "{after_many} !< {after_one}");
}

#[test]
fn impulses_never_add_energy() {
    let mut ps = packed_lattice();
    let before = kinetic(&ps);
    SequentialSolver::default().solve(ps.as_mut_slice(), &params(3));
    assert!(kinetic(&ps) <= before + 1e-3);
}

#[test]
fn same_seed_same_result() {
    let mut a = packed_lattice();
    a[10].x = a[11].x;
    a[10].y = a[11].y;
    let mut b = a.clone();

    SequentialSolver::new(99).solve(a.as_mut_slice(), &params(4));
    SequentialSolver::new(99).solve(b.as_mut_slice(), &params(4));
    assert_eq!(a, b);
}

#[test]
fn non_finite_body_does_not_poison_neighbours() {
    let mut ps = vec![
        Particle::new(f32::NAN, 60.0, 0.0, 0.0, 5.0, 1.0),
        Particle::new(60.0, 60.0, 1.0, 0.0, 5.0, 1.0),
        Particle::new(66.0, 60.0, -1.0, 0.0, 5.0, 1.0),
    ];
    SequentialSolver::default().solve(ps.as_mut_slice(), &params(2));
    for p in &ps[1..] {
        assert!(p.x.is_finite() && p.vx.is_finite());
    }
}
