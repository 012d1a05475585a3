use bouncebox_engine::domain::config::GridSizing;
use bouncebox_engine::{Error, SimSettings, SimulationCore};

#[test]
fn partial_settings_fill_in_defaults() {
    let json = r#"{
        "width": 640,
        "height": 480,
        "particleCount": 25,
        "collision": { "passes": 40, "grid": { "mode": "manual", "cellSize": 24 } }
    }"#;
    let settings = SimSettings::from_json(json).expect("settings should parse");

    assert_eq!(settings.width, 640.0);
    assert_eq!(settings.particle_count, 25);
    assert_eq!(settings.gravity, SimSettings::default().gravity);
    // Passes are clamped, not rejected.
    assert_eq!(settings.collision.passes, 10);
    assert_eq!(settings.collision.grid, GridSizing::Manual { cell_size: 24.0 });
    assert!(settings.collision.parallel.enabled);

    let again = SimSettings::from_json(&settings.to_json()).unwrap();
    assert_eq!(again, settings);
}

#[test]
fn bad_settings_are_reported() {
    assert!(matches!(SimSettings::from_json(r#"{"elasticity": 2}"#), Err(Error::InvalidParam(_))));
    assert!(matches!(SimSettings::from_json("not json"), Err(Error::Json(_))));
    assert!(SimSettings::from_json(r#"{"collision": {"parallel": {"workerCount": 0}}}"#).is_err());
}

#[test]
fn custom_presets_merge_and_apply() {
    let mut settings = SimSettings::from_json(r#"{"width": 300, "height": 300, "particleCount": 10}"#).unwrap();
    settings.collision.parallel.enabled = false;
    let mut core = SimulationCore::new(settings).unwrap();

    let presets = r##"[
        { "key": "drizzle", "label": "Drizzle", "gravity": 80, "particleCount": 40,
          "size": 2.5, "elasticity": 0.6, "collisionPasses": 2,
          "initialVelocity": { "x": 0, "y": 30 }, "color": "#3366ff" },
        { "key": "lightSpray", "label": "Light Spray (tuned)", "gravity": 120, "particleCount": 20,
          "size": 4, "elasticity": 0.9, "collisionPasses": 2 }
    ]"##;
    assert_eq!(core.load_presets_json(presets).unwrap(), 2);
    assert_eq!(core.presets().keys().len(), 7);

    core.apply_preset("drizzle").unwrap();
    assert_eq!(core.particle_count(), 40);
    assert_eq!(core.settings().gravity, 80.0);
    assert_eq!(core.types().active().color, "#3366ff");
    assert!(core.particles().iter().all(|p| p.size == 2.5));

    core.apply_preset("lightSpray").unwrap();
    assert_eq!(core.particle_count(), 20);
    assert_eq!(core.settings().gravity, 120.0);
}

#[test]
fn invalid_preset_batch_is_rejected_whole() {
    let mut core = SimulationCore::new_inline(SimSettings { particle_count: 0, ..SimSettings::default() }).unwrap();
    let presets = r#"[
        { "key": "ok", "label": "Ok", "gravity": 10, "particleCount": 5, "size": 3, "elasticity": 0.5, "collisionPasses": 1 },
        { "key": "bad", "label": "Bad", "gravity": 10, "particleCount": 5, "size": 3, "elasticity": 3, "collisionPasses": 1 }
    ]"#;
    assert!(core.load_presets_json(presets).is_err());
    assert!(core.apply_preset("ok").is_err());
}

#[test]
fn type_bundle_survives_a_round_trip() {
    let mut core = SimulationCore::new_inline(SimSettings { particle_count: 8, ..SimSettings::default() }).unwrap();
    let floaty = core.create_type("Floaty", "#aaaaaa", 0.95, -0.2).unwrap();
    core.set_active_type(floaty).unwrap();
    core.assign_type(floaty, &[0, 3, 99]).unwrap();

    let json = core.types().to_json();
    let mut other = SimulationCore::new_inline(SimSettings { particle_count: 8, ..SimSettings::default() }).unwrap();
    other.load_types_json(&json).unwrap();

    assert_eq!(other.types().len(), 2);
    assert_eq!(other.types().active().id, floaty);
    assert_eq!(other.types().get(floaty).unwrap().gravity_scale, -0.2);
}

#[test]
fn hairline_manual_cells_still_step() {
    let json = r#"{
        "width": 1280, "height": 720, "particleCount": 50, "particleSize": 0.0001,
        "collision": { "grid": { "mode": "manual", "cellSize": 0.001 } }
    }"#;
    let mut settings = SimSettings::from_json(json).unwrap();
    settings.collision.parallel.enabled = false;
    let mut core = SimulationCore::new(settings).unwrap();

    core.advance(1.0 / 60.0);
    assert!(core.last_solve_stats().is_some());
    assert!(core.particles().iter().all(|p| p.x.is_finite() && p.y.is_finite()));
}
