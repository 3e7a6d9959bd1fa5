//! Event types reported by systems and aggregated by the engine.
//!
//! Domain conditions (deaths, kills, expiry) are modeled as enums for
//! exhaustive handling by the caller - no error types, no panics.

use serde::{Deserialize, Serialize};

use crate::components::SpeciesKind;

/// Why a herd animal died of need exhaustion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    Thirst,
    Hunger,
}

impl std::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeathCause::Thirst => write!(f, "thirst"),
            DeathCause::Hunger => write!(f, "hunger"),
        }
    }
}

/// Product yielded by a completed harvest session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarvestProduct {
    Wool,
    Milk,
}

/// Per-animal tick outcome, reported at most once per animal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimalEvent {
    /// Need exhaustion; the caller removes the entity
    Died { cause: DeathCause },
}

/// Aggregated simulation events, returned from `Simulation::update`
/// for the presentation layer to turn into notifications
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    NewDay { day: u32 },
    AnimalDied { species: SpeciesKind, cause: DeathCause },
    WolfHitAnimal { species: SpeciesKind },
    WolfKilledAnimal { species: SpeciesKind },
    /// A sheep carcass finished decaying and was removed
    CarcassConsumed,
    WolfSlain,
    WolfRespawned,
    GrassRespawned,
    TroughExpired,
    FireBurnedOut,
    HarvestComplete { product: HarvestProduct },
    HarvestCancelled,
}

impl std::fmt::Display for SimEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimEvent::NewDay { day } => write!(f, "day {day} begins"),
            SimEvent::AnimalDied { species, cause } => {
                write!(f, "{species:?} died of {cause}")
            }
            SimEvent::WolfHitAnimal { species } => write!(f, "a wolf bit a {species:?}"),
            SimEvent::WolfKilledAnimal { species } => {
                write!(f, "a wolf brought down a {species:?}")
            }
            SimEvent::CarcassConsumed => write!(f, "a carcass was picked clean"),
            SimEvent::WolfSlain => write!(f, "a wolf was slain"),
            SimEvent::WolfRespawned => write!(f, "a wolf returned to the desert"),
            SimEvent::GrassRespawned => write!(f, "grass regrew in a new spot"),
            SimEvent::TroughExpired => write!(f, "the trough ran dry"),
            SimEvent::FireBurnedOut => write!(f, "a fire burned out"),
            SimEvent::HarvestComplete { product } => {
                write!(f, "harvest complete: {product:?}")
            }
            SimEvent::HarvestCancelled => write!(f, "harvest cancelled"),
        }
    }
}
