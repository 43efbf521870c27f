//! Domain models for the visit logger.

mod catalog;
mod draft;
mod visit;

pub use catalog::*;
pub use draft::*;
pub use visit::*;
