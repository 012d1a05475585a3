//! Shared plumbing: errors, RNG, logging and slot access macros.

#[macro_use]
pub mod utils {
    #[macro_use]
    pub mod safety;
}

pub mod error;
pub mod logging;
pub mod random;

pub use error::{Error, Result};
