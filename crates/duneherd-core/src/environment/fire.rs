//! Fire - a placeable, burning-down predator deterrent

use serde::{Deserialize, Serialize};

/// Burn duration in seconds
pub const FIRE_LIFETIME: f32 = 120.0;
/// Intensity floor while still burning
const FIRE_MIN_INTENSITY: f32 = 0.3;

/// A lit fire. Wolves treat any live fire as a repulsor (the repel
/// radii are predator-side constants). Burns out after two minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fire {
    pub x: f32,
    pub y: f32,
    pub lifetime: f32,
    pub intensity: f32,
}

impl Fire {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            lifetime: FIRE_LIFETIME,
            intensity: 1.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.lifetime -= dt;
        self.intensity = (self.lifetime / FIRE_LIFETIME).max(FIRE_MIN_INTENSITY);
    }

    pub fn is_burned_out(&self) -> bool {
        self.lifetime <= 0.0
    }
}
