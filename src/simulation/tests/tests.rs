use super::*;
use crate::core::Error;
use crate::systems::hooks::{HookContext, HookPhase, HookResult};

fn settings(count: usize) -> SimSettings {
    SimSettings {
        width: 200.0,
        height: 200.0,
        particle_count: count,
        ..SimSettings::default()
    }
}

fn inline_core(count: usize) -> SimulationCore {
    SimulationCore::new_inline(settings(count)).unwrap()
}

/// Two overlapping bodies on a horizontal line, no gravity, one pass.
fn head_on(vx: f32) -> SimulationCore {
    let mut core = inline_core(0);
    core.set_gravity(0.0);
    core.set_passes(1);
    core.spawn_at(97.0, 100.0, vx, 0.0);
    core.spawn_at(103.0, 100.0, -vx, 0.0);
    core
}

fn gap(core: &SimulationCore) -> f32 {
    let ps = core.particles();
    (ps[1].x - ps[0].x).hypot(ps[1].y - ps[0].y)
}

#[test]
fn new_spawns_target_count_inside_bounds() {
    let core = inline_core(300);
    assert_eq!(core.particle_count(), 300);
    assert_eq!(core.execution_mode(), ExecutionMode::Inline);
    for p in core.particles() {
        assert!(p.x >= p.size && p.x <= 200.0 - p.size);
        assert!(p.y >= p.size && p.y <= 200.0 - p.size);
        assert_eq!(p.type_id, Some(crate::domain::DEFAULT_TYPE));
    }
}

#[test]
fn invalid_settings_are_rejected() {
    let bad = SimSettings { width: -1.0, ..settings(10) };
    assert!(matches!(SimulationCore::new_inline(bad), Err(Error::InvalidParam(_))));

    let mut core = inline_core(0);
    assert!(core.set_time_scale(-1.0).is_err());
    assert!(core.resize(0.0, 100.0).is_err());
    assert_eq!(core.settings().width, 200.0);
}

#[test]
fn advance_runs_fixed_substeps() {
    let mut core = inline_core(50);
    core.enable_perf_metrics(true);

    core.advance(0.05);
    assert_eq!(core.get_perf_stats().substeps(), 3);
    assert_eq!(core.frame(), 1);

    // Long frames are clamped to a quarter second.
    core.advance(10.0);
    assert_eq!(core.get_perf_stats().substeps(), 15);
    assert_eq!(core.get_perf_stats().particle_count(), 50);
    assert_eq!(core.frame(), 2);
}

#[test]
fn zero_time_scale_still_counts_frames() {
    let mut core = inline_core(10);
    core.enable_perf_metrics(true);
    core.set_time_scale(0.0).unwrap();
    let before = core.particles().to_vec();

    core.advance(1.0 / 60.0);
    assert_eq!(core.get_perf_stats().substeps(), 0);
    assert_eq!(core.frame(), 1);
    assert_eq!(core.particles(), before.as_slice());
}

#[test]
fn paused_world_does_not_move() {
    let mut core = inline_core(20);
    core.set_paused(true);
    let before = core.particles().to_vec();
    core.advance(0.1);
    assert_eq!(core.frame(), 0);
    assert_eq!(core.particles(), before.as_slice());

    core.set_paused(false);
    core.advance(0.1);
    assert_eq!(core.frame(), 1);
}

#[test]
fn inline_step_bounces_overlapping_pair() {
    let mut core = head_on(50.0);
    core.physics_step(1.0 / 60.0);

    let ps = core.particles();
    assert!(ps[0].vx < 0.0, "left body should move left, vx = {}", ps[0].vx);
    assert!(ps[1].vx > 0.0, "right body should move right, vx = {}", ps[1].vx);
    assert!(gap(&core) >= 8.0 - 1e-3);

    let stats = core.last_solve_stats().unwrap();
    assert_eq!(stats.impulses, 1);
}

#[test]
fn disabled_collisions_leave_overlap() {
    let mut core = head_on(0.0);
    core.set_collisions_enabled(false);
    core.physics_step(1.0 / 60.0);
    assert!((gap(&core) - 6.0).abs() < 1e-4);
    assert!(core.last_solve_stats().is_none());
}

#[test]
fn set_particle_count_grows_and_truncates() {
    let mut core = inline_core(100);
    let dense = core.cell_size();

    core.set_particle_count(40);
    assert_eq!(core.particle_count(), 40);
    assert_eq!(core.settings().particle_count, 40);
    assert!(core.cell_size() > dense);

    core.set_particle_count(120);
    assert_eq!(core.particle_count(), 120);

    core.clear();
    assert_eq!(core.particle_count(), 0);
    core.reset();
    assert_eq!(core.particle_count(), 120);
}

#[test]
fn set_elasticity_reaches_types_and_survives_a_step() {
    let mut core = inline_core(30);
    let extra = core.create_type("Bouncy", "#00ff00", 1.0, 1.0).unwrap();
    core.assign_type(extra, &[0, 1, 2]).unwrap();

    core.set_elasticity(0.5).unwrap();
    core.physics_step(1.0 / 60.0);

    assert!(core.types().iter().all(|t| t.elasticity == 0.5));
    assert!(core.particles().iter().all(|p| p.elasticity == 0.5));
    assert!(core.set_elasticity(1.5).is_err());
    assert_eq!(core.settings().elasticity, 0.5);
}

#[test]
fn set_particle_size_resizes_everyone() {
    let mut core = inline_core(10);
    core.set_particle_size(7.0).unwrap();
    assert!(core.particles().iter().all(|p| p.size == 7.0));
    assert!(core.cell_size() >= 14.0);
    assert!(core.set_particle_size(0.0).is_err());
}

#[test]
fn preset_sets_count_and_settings() {
    let mut core = inline_core(10);
    core.apply_preset("lightSpray").unwrap();

    assert_eq!(core.particle_count(), 1200);
    let s = core.settings();
    assert_eq!(s.gravity, 150.0);
    assert_eq!(s.collision.passes, 2);
    assert_eq!(s.elasticity, 0.85);
    assert!(core.particles().iter().all(|p| p.size == 4.0 && p.elasticity == 0.85));
    assert_eq!(core.types().active().elasticity, 0.85);
}

#[test]
fn radial_burst_starts_at_the_centre() {
    let mut core = inline_core(10);
    core.apply_preset("explosion").unwrap();

    assert_eq!(core.particle_count(), 2000);
    for p in core.particles() {
        assert_eq!((p.x, p.y), (100.0, 100.0));
        let speed = p.speed();
        assert!((449.0..=901.0).contains(&speed), "speed {speed}");
    }
}

#[test]
fn initial_velocity_is_added_to_every_particle() {
    let mut core = inline_core(10);
    core.apply_preset("heavyRain").unwrap();
    assert!(core.particles().iter().all(|p| p.vy > 340.0));
}

#[test]
fn preset_colour_recolours_active_type() {
    let mut core = inline_core(0);
    core.apply_preset("lavaPool").unwrap();
    assert_eq!(core.types().active().color, "#ff5a00");
    assert!(core.settings().blobs);
}

#[test]
fn unknown_preset_is_an_error() {
    let mut core = inline_core(5);
    assert!(matches!(core.apply_preset("nope"), Err(Error::UnknownPreset(_))));
    assert_eq!(core.particle_count(), 5);
}

#[test]
fn drop_time_picks_gravity() {
    let mut core = inline_core(0);
    let g = core.set_drop_time(2.0).unwrap();
    assert!((g - 100.0).abs() < 1e-4);
    assert!(core.set_drop_time(0.0).is_err());
    assert_eq!(core.settings().gravity, g);

    let up = core.gravity_up();
    assert!(up > g);
    assert!(core.gravity_down() < up);
}

#[test]
fn force_tool_uses_configured_strength() {
    let mut core = inline_core(0);
    core.set_force(10.0, 20.0, ForceMode::Push);
    let f = core.force().unwrap();
    assert_eq!((f.x, f.y), (10.0, 20.0));
    assert_eq!(f.strength, core.settings().force.strength);
    core.clear_force();
    assert!(core.force().is_none());
}

struct Shift {
    phase: HookPhase,
}

impl BehaviorHook for Shift {
    fn phase(&self) -> HookPhase {
        self.phase
    }

    fn run(&mut self, ctx: &mut HookContext<'_>) -> HookResult {
        ctx.each(|_, p| p.x += 1.0);
        Ok(())
    }
}

struct Broken;

impl BehaviorHook for Broken {
    fn run(&mut self, _ctx: &mut HookContext<'_>) -> HookResult {
        Err("boom".to_string())
    }
}

#[test]
fn replace_hook_skips_integration() {
    let mut core = inline_core(0);
    core.spawn_at(50.0, 50.0, 0.0, 0.0);
    core.install_hook(Box::new(Shift { phase: HookPhase::Replace }));

    core.physics_step(1.0 / 60.0);
    let p = &core.particles()[0];
    assert_eq!((p.x, p.y), (51.0, 50.0));
    assert_eq!(p.vy, 0.0);

    core.set_hook_enabled(false);
    core.physics_step(1.0 / 60.0);
    assert!(core.particles()[0].vy > 0.0);
}

#[test]
fn hook_errors_are_kept_not_raised() {
    let mut core = inline_core(3);
    core.install_hook(Box::new(Broken));
    core.advance(1.0 / 60.0);
    assert_eq!(core.hook_error(), Some("boom"));
    assert_eq!(core.frame(), 1);

    core.clear_hook();
    assert!(core.hook_error().is_none());
}

#[test]
fn render_extract_packs_position_and_size() {
    let mut core = inline_core(0);
    core.spawn_at(10.0, 20.0, 0.0, 0.0);
    core.spawn_at(30.0, 40.0, 0.0, 0.0);

    assert_eq!(core.extract_render(), 2 * RENDER_STRIDE);
    assert_eq!(core.render_buffer(), &[10.0, 20.0, 4.0, 30.0, 40.0, 4.0]);

    core.set_particle_count(1);
    assert_eq!(core.extract_render(), RENDER_STRIDE);
    assert_eq!(core.render_buffer().len(), RENDER_STRIDE);
}

#[test]
fn removed_type_members_fall_back_to_default() {
    let mut core = inline_core(4);
    let id = core.create_type("Heavy", "#0000ff", 0.2, 3.0).unwrap();
    core.assign_type(id, &[0, 1]).unwrap();
    core.physics_step(1.0 / 60.0);
    assert_eq!(core.particles()[0].gravity_scale, 3.0);

    core.remove_type(id).unwrap();
    core.physics_step(1.0 / 60.0);
    assert_eq!(core.particles()[0].type_id, Some(crate::domain::DEFAULT_TYPE));
    assert_eq!(core.particles()[0].gravity_scale, 1.0);
}

#[test]
fn types_round_trip_through_json() {
    let mut core = inline_core(2);
    core.create_type("Slow", "#123456", 0.1, 0.5).unwrap();
    let json = core.types().to_json();

    let mut other = inline_core(2);
    other.load_types_json(&json).unwrap();
    assert_eq!(other.types().len(), 2);
    assert!(other.load_types_json("{\"formatVersion\":1,\"active\":1,\"types\":[]}").is_err());
}
