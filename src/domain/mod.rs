pub mod config;
pub mod particle;
pub mod presets;
pub mod types;

pub use config::SimSettings;
pub use particle::{Particle, STRIDE};
pub use types::{TypeId, TypeRegistry, DEFAULT_TYPE};
