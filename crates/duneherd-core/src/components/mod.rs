//! Components - pure data attached to entities

pub mod common;
pub mod animals;
pub mod predators;

pub use common::*;
pub use animals::*;
pub use predators::*;
