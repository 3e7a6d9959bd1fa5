//! Systems - logic that queries and updates components

pub mod grazing;
pub mod harvest;
pub mod predation;

pub use grazing::{grazing_system, spawn_animal};
pub use harvest::{
    begin_harvest, cancel_harvest, harvest_system, HarvestKind, HarvestSession, HarvestTick,
};
pub use predation::{predation_system, spawn_wolf, PredationAction};
