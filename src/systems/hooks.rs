//! User behaviour hook.
//!
//! A hook is a plain Rust object the simulation loop calls around each
//! substep. It sees the targeted particles through `HookContext` and never
//! runs inside the collision solver.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::particle::Particle;
use crate::domain::types::{TypeId, TypeRegistry};

pub type HookResult = std::result::Result<(), String>;

/// When the hook runs relative to the base substep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPhase {
    Before,
    #[default]
    After,
    Both,
    /// Runs instead of the base substep (integration and inline collisions).
    Replace,
}

/// Which particles the hook iterates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookTarget {
    #[default]
    All,
    Type(TypeId),
}

impl HookTarget {
    #[inline]
    pub fn matches(&self, p: &Particle) -> bool {
        match *self {
            HookTarget::All => true,
            HookTarget::Type(id) => p.type_id == Some(id),
        }
    }
}

/// The slot currently being run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookStage {
    Before,
    Replace,
    After,
}

impl HookPhase {
    fn runs_at(self, stage: HookStage) -> bool {
        matches!(
            (self, stage),
            (HookPhase::Before | HookPhase::Both, HookStage::Before)
                | (HookPhase::Replace, HookStage::Replace)
                | (HookPhase::After | HookPhase::Both, HookStage::After)
        )
    }
}

/// Read-only world values handed to the hook.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HookEnv {
    pub dt: f32,
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
}

pub struct HookContext<'a> {
    particles: &'a mut [Particle],
    types: &'a TypeRegistry,
    target: HookTarget,
    pub env: HookEnv,
    pub stage: HookStage,
}

impl<'a> HookContext<'a> {
    pub fn new(
        particles: &'a mut [Particle],
        types: &'a TypeRegistry,
        target: HookTarget,
        env: HookEnv,
        stage: HookStage,
    ) -> Self {
        Self { particles, types, target, env, stage }
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        self.env.dt
    }

    /// Number of targeted particles.
    pub fn count(&self) -> usize {
        self.particles.iter().filter(|p| self.target.matches(p)).count()
    }

    /// Visit every targeted particle with its global index.
    pub fn each(&mut self, mut f: impl FnMut(usize, &mut Particle)) {
        let target = self.target;
        for (i, p) in self.particles.iter_mut().enumerate() {
            if target.matches(p) {
                f(i, p);
            }
        }
    }

    /// Global indices of targeted particles matching `pred`.
    pub fn filter(&self, pred: impl Fn(&Particle) -> bool) -> Vec<usize> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, p)| self.target.matches(p) && pred(p))
            .map(|(i, _)| i)
            .collect()
    }

    /// Members of `id`, regardless of the hook's own target.
    pub fn by_type(&mut self, id: TypeId) -> impl Iterator<Item = &mut Particle> {
        self.particles.iter_mut().filter(move |p| p.type_id == Some(id))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles
    }

    pub fn types(&self) -> &TypeRegistry {
        self.types
    }
}

pub trait BehaviorHook {
    fn phase(&self) -> HookPhase {
        HookPhase::After
    }

    fn target(&self) -> HookTarget {
        HookTarget::All
    }

    fn run(&mut self, ctx: &mut HookContext<'_>) -> HookResult;

    /// Called on each targeted particle after every other slot. The sweep
    /// stops at the first error.
    fn per_particle(&mut self, _p: &mut Particle, _env: &HookEnv) -> HookResult {
        Ok(())
    }
}

/// Owns the installed hook and its last error.
#[derive(Default)]
pub struct HookHost {
    hook: Option<Box<dyn BehaviorHook>>,
    enabled: bool,
    last_error: Option<String>,
}

impl HookHost {
    pub fn install(&mut self, hook: Box<dyn BehaviorHook>) {
        self.hook = Some(hook);
        self.enabled = true;
        self.last_error = None;
    }

    pub fn clear(&mut self) {
        self.hook = None;
        self.last_error = None;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.hook.is_some()
    }

    pub fn phase(&self) -> Option<HookPhase> {
        self.hook.as_ref().filter(|_| self.enabled).map(|h| h.phase())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Run the hook if its phase covers `stage`. Returns whether it ran.
    pub fn run_stage(
        &mut self,
        stage: HookStage,
        env: HookEnv,
        particles: &mut [Particle],
        types: &TypeRegistry,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(hook) = self.hook.as_mut() else { return false };
        if !hook.phase().runs_at(stage) {
            return false;
        }
        let mut ctx = HookContext::new(particles, types, hook.target(), env, stage);
        if let Err(e) = hook.run(&mut ctx) {
            debug!("behavior hook failed at {stage:?}: {e}");
            self.last_error = Some(e);
        }
        true
    }

    pub fn run_per_particle(&mut self, env: HookEnv, particles: &mut [Particle]) {
        if !self.enabled {
            return;
        }
        let Some(hook) = self.hook.as_mut() else { return };
        let target = hook.target();
        for p in particles.iter_mut().filter(|p| target.matches(p)) {
            if let Err(e) = hook.per_particle(p, &env) {
                debug!("per-particle hook failed: {e}");
                self.last_error = Some(e);
                break;
            }
        }
    }
}
