use log::info;

use crate::core::Result;
use crate::domain::config::SimSettings;
use crate::domain::presets::PresetLibrary;
use crate::domain::types::TypeRegistry;
use crate::systems::hooks::HookHost;

use super::collide::CollisionOrchestrator;
use super::commands;
use super::perf_stats::PerfStats;
use super::SimulationCore;

pub(super) fn create_core(mut settings: SimSettings) -> Result<SimulationCore> {
    settings.validate()?;
    let collisions = CollisionOrchestrator::new(&settings.collision.parallel);
    Ok(build(settings, collisions))
}

pub(super) fn create_core_inline(mut settings: SimSettings) -> Result<SimulationCore> {
    settings.validate()?;
    let collisions = CollisionOrchestrator::inline(settings.collision.parallel.seed);
    Ok(build(settings, collisions))
}

fn build(settings: SimSettings, collisions: CollisionOrchestrator) -> SimulationCore {
    let target = settings.particle_count;
    let mut core = SimulationCore {
        types: TypeRegistry::new("#ff0000", settings.elasticity),
        presets: PresetLibrary::default(),
        hooks: HookHost::default(),
        force: None,
        cell_size: settings.cell_size(),
        paused: false,
        frame: 0,
        rng_state: settings.collision.parallel.seed,
        particles: Vec::with_capacity(target),
        render: Vec::new(),
        perf_enabled: false,
        perf_stats: PerfStats::default(),
        collisions,
        settings,
    };
    commands::spawn_random(&mut core, target);
    info!(
        "simulation ready: {} particles, {}x{}, {:?} collisions",
        core.particles.len(),
        core.settings.width,
        core.settings.height,
        core.collisions.mode()
    );
    core
}
