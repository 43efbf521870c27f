//! Day exports and full backups.

mod backup;
mod day;
mod projection;

pub use backup::*;
pub use day::*;
pub use projection::*;
