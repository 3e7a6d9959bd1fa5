//! Herd animal components: Needs, LifeState, species records (Sheep, Cow)

use serde::{Deserialize, Serialize};

use crate::events::DeathCause;

/// Needs saturate here even if the animal keeps starving
pub const NEEDS_MAX: f32 = 120.0;
/// Crossing this on either meter kills the animal
pub const DEATH_THRESHOLD: f32 = 100.0;
/// Thirst accumulation per second
pub const THIRST_RATE: f32 = 0.5;
/// Hunger accumulation per second
pub const HUNGER_RATE: f32 = 0.5;
/// Growth meter accumulation per second (wool and milk)
pub const GROWTH_RATE: f32 = 5.0;
/// Growth meter cap; the animal is harvestable at this value
pub const GROWTH_MAX: f32 = 100.0;
/// Wolf bites required to down an animal
pub const WOLF_HIT_THRESHOLD: u8 = 5;
/// A carcass at this stage is fully consumed
pub const CARCASS_TERMINAL_STAGE: f32 = 4.0;

/// Thirst and hunger meters - 0.0 (satisfied) to 120.0 (saturated)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Needs {
    pub thirst: f32,
    pub hunger: f32,
}

impl Needs {
    /// Apply decay over time (needs increase), clamped to [0, 120]
    pub fn decay(&mut self, dt: f32) {
        self.thirst = (self.thirst + THIRST_RATE * dt).clamp(0.0, NEEDS_MAX);
        self.hunger = (self.hunger + HUNGER_RATE * dt).clamp(0.0, NEEDS_MAX);
    }

    /// Death check. Thirst is checked before hunger when both are over
    /// the threshold in the same tick; callers rely on that ordering.
    pub fn death_cause(&self) -> Option<DeathCause> {
        if self.thirst > DEATH_THRESHOLD {
            Some(DeathCause::Thirst)
        } else if self.hunger > DEATH_THRESHOLD {
            Some(DeathCause::Hunger)
        } else {
            None
        }
    }

    /// Reduce thirst, floored at zero
    pub fn drink(&mut self, amount: f32) {
        self.thirst = (self.thirst - amount).max(0.0);
    }

    /// Reduce hunger, floored at zero
    pub fn eat(&mut self, amount: f32) {
        self.hunger = (self.hunger - amount).max(0.0);
    }

    pub fn satisfied(&self) -> bool {
        self.thirst == 0.0 && self.hunger == 0.0
    }
}

/// Terminal sub-state machine for herd animals.
///
/// `Dying` is reached only through predation: the animal stops behaving
/// and becomes a carcass that wolves consume over time. Need-based death
/// removes the entity outright and never passes through `Dying`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifeState {
    Alive,
    Dying { stage: f32 },
}

impl Default for LifeState {
    fn default() -> Self {
        LifeState::Alive
    }
}

impl LifeState {
    pub fn is_dying(&self) -> bool {
        matches!(self, LifeState::Dying { .. })
    }

    /// A carcass is consumable until its decay stage reaches terminal
    pub fn is_carcass(&self) -> bool {
        matches!(self, LifeState::Dying { stage } if *stage < CARCASS_TERMINAL_STAGE)
    }
}

/// Bite counter incremented by wolf attacks
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WolfHits(pub u8);

impl WolfHits {
    pub fn is_lethal(&self) -> bool {
        self.0 >= WOLF_HIT_THRESHOLD
    }
}

/// Shared per-frame behavior flags for herd animals
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnimalState {
    pub is_moving: bool,
    pub is_eating: bool,
    /// Holds a trough reservation slot
    pub uses_trough: bool,
    /// Frozen while the player shears or milks this animal
    pub harvested: bool,
}

/// Species hook methods, dispatched statically by the grazing system
pub trait Species: Send + Sync + 'static {
    const KIND: SpeciesKind;

    /// Advance the species growth meter (wool or milk)
    fn grow(&mut self, dt: f32);

    fn growth(&self) -> f32;

    /// Claim the growth meter at harvest start
    fn reset_growth(&mut self);

    /// Whether predation leaves a consumable carcass instead of
    /// removing the animal outright
    fn leaves_carcass() -> bool;
}

/// Species discriminant used in events and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesKind {
    Sheep,
    Cow,
}

/// Sheep species record - wool regrows over time and is shearable at 100
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sheep {
    pub wool_growth: f32,
}

impl Species for Sheep {
    const KIND: SpeciesKind = SpeciesKind::Sheep;

    fn grow(&mut self, dt: f32) {
        if self.wool_growth < GROWTH_MAX {
            self.wool_growth = (self.wool_growth + GROWTH_RATE * dt).min(GROWTH_MAX);
        }
    }

    fn growth(&self) -> f32 {
        self.wool_growth
    }

    fn reset_growth(&mut self) {
        self.wool_growth = 0.0;
    }

    fn leaves_carcass() -> bool {
        true
    }
}

/// Cow species record - milk builds up and is collectable at 100
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Cow {
    pub milk_production: f32,
}

impl Species for Cow {
    const KIND: SpeciesKind = SpeciesKind::Cow;

    fn grow(&mut self, dt: f32) {
        if self.milk_production < GROWTH_MAX {
            self.milk_production = (self.milk_production + GROWTH_RATE * dt).min(GROWTH_MAX);
        }
    }

    fn growth(&self) -> f32 {
        self.milk_production
    }

    fn reset_growth(&mut self) {
        self.milk_production = 0.0;
    }

    fn leaves_carcass() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_decay_clamps_at_max() {
        let mut needs = Needs::default();
        needs.decay(1000.0);
        assert_eq!(needs.thirst, NEEDS_MAX);
        assert_eq!(needs.hunger, NEEDS_MAX);
    }

    #[test]
    fn test_death_cause_thirst_wins_ties() {
        let needs = Needs {
            thirst: 101.0,
            hunger: 101.0,
        };
        assert_eq!(needs.death_cause(), Some(DeathCause::Thirst));

        let needs = Needs {
            thirst: 50.0,
            hunger: 100.5,
        };
        assert_eq!(needs.death_cause(), Some(DeathCause::Hunger));

        let needs = Needs {
            thirst: 100.0,
            hunger: 100.0,
        };
        // Exactly 100 is still alive; death requires strictly above
        assert_eq!(needs.death_cause(), None);
    }

    #[test]
    fn test_drink_floors_at_zero() {
        let mut needs = Needs {
            thirst: 5.0,
            hunger: 0.0,
        };
        needs.drink(30.0);
        assert_eq!(needs.thirst, 0.0);
    }

    #[test]
    fn test_wool_growth_caps() {
        let mut sheep = Sheep { wool_growth: 99.0 };
        sheep.grow(10.0);
        assert_eq!(sheep.wool_growth, GROWTH_MAX);
    }

    #[test]
    fn test_carcass_stage_validity() {
        assert!(LifeState::Dying { stage: 0.0 }.is_carcass());
        assert!(LifeState::Dying { stage: 3.9 }.is_carcass());
        assert!(!LifeState::Dying { stage: 4.0 }.is_carcass());
        assert!(!LifeState::Alive.is_carcass());
    }

    #[test]
    fn test_wolf_hits_threshold() {
        assert!(!WolfHits(4).is_lethal());
        assert!(WolfHits(5).is_lethal());
    }
}
