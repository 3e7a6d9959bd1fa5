//! Player collaborator - read-mostly state the agents react to.
//!
//! Input handling and player movement live outside the core; agents
//! only observe position, motion, and speed. The harvest system is the
//! one place the core writes back (it freezes the session target, not
//! the player).

use serde::{Deserialize, Serialize};

use crate::components::Vec2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub is_moving: bool,
    pub speed: f32,
    /// Reach for combat and harvest interactions
    pub action_range: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            is_moving: false,
            speed: 150.0,
            action_range: 120.0,
        }
    }
}

impl Player {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}
