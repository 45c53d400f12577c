//! Domain models for the MedTrack system.

mod medicine;
mod patient;
mod record;

pub use medicine::*;
pub use patient::*;
pub use record::*;
