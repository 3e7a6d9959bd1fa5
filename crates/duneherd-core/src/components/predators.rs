//! Predator components: the Wolf and its behavior state machine

use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::common::Vec2;

/// Wolf hit points; each player strike removes one
pub const WOLF_HEALTH: i32 = 2;

/// Behavior states for the wolf state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WolfState {
    /// Shadow the herd at a comfortable distance
    Follow,
    /// Close on an isolated target (or any target when in a pack)
    Attack,
    /// Run from a fire or the player for a fixed duration
    Flee,
    /// Consume a downed sheep carcass
    Eating,
}

impl Default for WolfState {
    fn default() -> Self {
        WolfState::Follow
    }
}

/// Wolf agent component.
///
/// `target` is a weak reference: the entity may be removed by unrelated
/// logic (player action, need-death) in the same tick, so it is
/// re-resolved and validated every update and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wolf {
    pub health: i32,
    pub state: WolfState,
    pub flee_timer: f32,
    pub flee_from: Vec2,
    pub attack_cooldown: f32,
    #[serde(skip)]
    pub target: Option<Entity>,
    pub wander_angle: f32,
}

impl Default for Wolf {
    fn default() -> Self {
        Self {
            health: WOLF_HEALTH,
            state: WolfState::Follow,
            flee_timer: 0.0,
            flee_from: Vec2::ZERO,
            attack_cooldown: 0.0,
            target: None,
            wander_angle: 0.0,
        }
    }
}

impl Wolf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the flee state, running directly away from `from`
    pub fn flee(&mut self, from: Vec2, duration: f32) {
        self.state = WolfState::Flee;
        self.flee_timer = duration;
        self.flee_from = from;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wolf_defaults() {
        let wolf = Wolf::new();
        assert_eq!(wolf.health, WOLF_HEALTH);
        assert_eq!(wolf.state, WolfState::Follow);
        assert!(wolf.target.is_none());
    }

    #[test]
    fn test_flee_sets_state_and_clears_target() {
        let mut wolf = Wolf::new();
        wolf.state = WolfState::Attack;
        wolf.flee(Vec2::new(10.0, 0.0), 2.0);
        assert_eq!(wolf.state, WolfState::Flee);
        assert_eq!(wolf.flee_timer, 2.0);
        assert!(wolf.target.is_none());
    }
}
