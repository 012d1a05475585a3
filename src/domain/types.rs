//! Particle type registry.
//!
//! A type groups particles and overrides their elasticity and gravity
//! multiplier every tick. The collision core never looks at types; it only
//! sees the per-particle fields the registry writes.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use super::particle::Particle;

pub type TypeId = u32;

/// The Default type. Always present, cannot be deleted.
pub const DEFAULT_TYPE: TypeId = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleType {
    pub id: TypeId,
    pub name: String,
    pub color: String,
    pub elasticity: f32,
    #[serde(default = "one")]
    pub gravity_scale: f32,
    /// Whether members may be drawn merged into density blobs.
    #[serde(default = "yes")]
    pub blob_eligible: bool,
}

fn one() -> f32 {
    1.0
}

fn yes() -> bool {
    true
}

/// Editable fields of a type; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypePatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub elasticity: Option<f32>,
    pub gravity_scale: Option<f32>,
    pub blob_eligible: Option<bool>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeBundle {
    format_version: u32,
    active: TypeId,
    types: Vec<ParticleType>,
}

#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: Vec<ParticleType>,
    active: TypeId,
    next_id: TypeId,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new("#ff0000", 0.9)
    }
}

impl TypeRegistry {
    /// Registry holding only the Default type.
    pub fn new(color: &str, elasticity: f32) -> Self {
        Self {
            types: vec![ParticleType {
                id: DEFAULT_TYPE,
                name: "Default".to_string(),
                color: color.to_string(),
                elasticity: elasticity.clamp(0.0, 1.0),
                gravity_scale: 1.0,
                blob_eligible: true,
            }],
            active: DEFAULT_TYPE,
            next_id: DEFAULT_TYPE + 1,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: TypeBundle = serde_json::from_str(json)?;
        if !bundle.types.iter().any(|t| t.id == DEFAULT_TYPE) {
            return Err(Error::invalid("type bundle is missing the Default type (id 1)"));
        }
        for t in bundle.types.iter() {
            check_elasticity(t.elasticity)?;
            check_gravity_scale(t.gravity_scale)?;
        }
        let next_id = bundle
            .types
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap_or(DEFAULT_TYPE)
            .checked_add(1)
            .ok_or_else(|| Error::invalid(format!("type id {} leaves no room for new types", TypeId::MAX)))?;
        let active = if bundle.types.iter().any(|t| t.id == bundle.active) {
            bundle.active
        } else {
            DEFAULT_TYPE
        };
        Ok(Self { types: bundle.types, active, next_id })
    }

    pub fn to_json(&self) -> String {
        let bundle = TypeBundle {
            format_version: 1,
            active: self.active,
            types: self.types.clone(),
        };
        serde_json::to_string(&bundle).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleType> {
        self.types.iter()
    }

    pub fn get(&self, id: TypeId) -> Option<&ParticleType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn active(&self) -> &ParticleType {
        self.get(self.active)
            .or_else(|| self.get(DEFAULT_TYPE))
            .unwrap_or(&self.types[0])
    }

    pub fn set_active(&mut self, id: TypeId) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::UnknownType(id));
        }
        self.active = id;
        Ok(())
    }

    pub fn create(&mut self, name: &str, color: &str, elasticity: f32, gravity_scale: f32) -> Result<TypeId> {
        check_elasticity(elasticity)?;
        check_gravity_scale(gravity_scale)?;
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| Error::invalid("type ids are exhausted"))?;
        let name = if name.trim().is_empty() { format!("Type{id}") } else { name.trim().to_string() };
        self.types.push(ParticleType {
            id,
            name,
            color: color.to_string(),
            elasticity,
            gravity_scale,
            blob_eligible: true,
        });
        Ok(id)
    }

    pub fn update(&mut self, id: TypeId, patch: TypePatch) -> Result<()> {
        if let Some(e) = patch.elasticity {
            check_elasticity(e)?;
        }
        if let Some(g) = patch.gravity_scale {
            check_gravity_scale(g)?;
        }
        let t = self
            .types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::UnknownType(id))?;
        if let Some(name) = patch.name {
            if !name.trim().is_empty() {
                t.name = name.trim().to_string();
            }
        }
        if let Some(color) = patch.color {
            t.color = color;
        }
        if let Some(e) = patch.elasticity {
            t.elasticity = e;
        }
        if let Some(g) = patch.gravity_scale {
            t.gravity_scale = g;
        }
        if let Some(b) = patch.blob_eligible {
            t.blob_eligible = b;
        }
        Ok(())
    }

    /// Delete a type; its members fall back to Default.
    pub fn remove(&mut self, id: TypeId, particles: &mut [Particle]) -> Result<()> {
        if id == DEFAULT_TYPE {
            return Err(Error::DefaultTypeLocked("deleted"));
        }
        let before = self.types.len();
        self.types.retain(|t| t.id != id);
        if self.types.len() == before {
            return Err(Error::UnknownType(id));
        }
        for p in particles.iter_mut().filter(|p| p.type_id == Some(id)) {
            p.type_id = Some(DEFAULT_TYPE);
        }
        if self.active == id {
            self.active = DEFAULT_TYPE;
        }
        self.apply(particles);
        Ok(())
    }

    /// Move the particles at `indices` into type `id`. Out-of-range indices are skipped.
    pub fn assign(&self, id: TypeId, indices: &[usize], particles: &mut [Particle]) -> Result<usize> {
        let t = self.get(id).ok_or(Error::UnknownType(id))?;
        let mut assigned = 0;
        for &i in indices {
            if let Some(p) = particles.get_mut(i) {
                p.type_id = Some(t.id);
                p.elasticity = t.elasticity;
                p.gravity_scale = t.gravity_scale;
                assigned += 1;
            }
        }
        Ok(assigned)
    }

    /// Stamp the active type onto a freshly spawned particle.
    pub fn adopt(&self, p: &mut Particle) {
        let t = self.active();
        p.type_id = Some(t.id);
        p.gravity_scale = t.gravity_scale;
    }

    /// Per-tick override: members take their type's elasticity and gravity
    /// multiplier. Untyped particles join the active type. Members of a type
    /// that no longer exists fall back to Default.
    pub fn apply(&self, particles: &mut [Particle]) {
        for p in particles.iter_mut() {
            let t = match p.type_id.and_then(|id| self.get(id)) {
                Some(t) => t,
                None => {
                    let t = if p.type_id.is_none() { self.active() } else { self.default_type() };
                    p.type_id = Some(t.id);
                    t
                }
            };
            p.elasticity = t.elasticity;
            p.gravity_scale = t.gravity_scale;
        }
    }

    pub fn is_blob_eligible(&self, p: &Particle) -> bool {
        p.type_id
            .and_then(|id| self.get(id))
            .map(|t| t.blob_eligible)
            .unwrap_or(true)
    }

    pub fn member_count(&self, id: TypeId, particles: &[Particle]) -> usize {
        particles.iter().filter(|p| p.type_id == Some(id)).count()
    }

    fn default_type(&self) -> &ParticleType {
        self.get(DEFAULT_TYPE).unwrap_or(&self.types[0])
    }
}

fn check_elasticity(e: f32) -> Result<()> {
    if (0.0..=1.0).contains(&e) {
        Ok(())
    } else {
        Err(Error::invalid(format!("type elasticity must lie in [0, 1], got {e}")))
    }
}

fn check_gravity_scale(g: f32) -> Result<()> {
    if g.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid("type gravityScale must be finite"))
    }
}
