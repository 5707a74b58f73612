//! Domain models for the clinic visit accounting system.

mod patient;
mod visit;

pub use patient::*;
pub use visit::*;
