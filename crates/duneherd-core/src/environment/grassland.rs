//! Grassland resource patch - finite, depletable, relocating on respawn

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Starting and refill quantity of a patch
pub const PATCH_MAX_AMOUNT: f32 = 500.0;
/// Full-patch visual radius; shrinks with the remaining ratio
pub const PATCH_BASE_RADIUS: f32 = 80.0;
/// Radius of a nearly-empty patch
pub const PATCH_MIN_RADIUS: f32 = 20.0;
/// Seconds between expiry and relocation
pub const PATCH_RESPAWN_DELAY: f32 = 3.0;
/// Multiplier decay per respawn; diminishing returns on re-farming
pub const PATCH_MULTIPLIER_DECAY: f32 = 0.9;
/// Floor of the consumption multiplier
pub const PATCH_MULTIPLIER_FLOOR: f32 = 0.3;

/// A depletable grass patch. Consumption shrinks it; once empty it
/// expires, waits out a delay, then relocates at a day-scaled distance
/// from the player and refills with a reduced consumption multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grassland {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub amount: f32,
    pub max_amount: f32,
    pub is_expired: bool,
    pub respawn_timer: f32,
    pub range_multiplier: f32,
    pub consumption_multiplier: f32,
}

impl Grassland {
    pub fn new(x: f32, y: f32, range_multiplier: f32) -> Self {
        Self {
            x,
            y,
            radius: PATCH_BASE_RADIUS,
            amount: PATCH_MAX_AMOUNT,
            max_amount: PATCH_MAX_AMOUNT,
            is_expired: false,
            respawn_timer: 0.0,
            range_multiplier,
            consumption_multiplier: 1.0,
        }
    }

    /// Consume up to `request` (scaled by the consumption multiplier),
    /// returning the amount actually granted. Never over-grants; sets
    /// the expiry flag when the patch runs out.
    pub fn consume(&mut self, request: f32) -> f32 {
        if self.amount <= 0.0 {
            return 0.0;
        }
        let actual = (request * self.consumption_multiplier).min(self.amount);
        self.amount -= actual;

        let ratio = self.amount / self.max_amount;
        self.radius = PATCH_MIN_RADIUS + (PATCH_BASE_RADIUS - PATCH_MIN_RADIUS) * ratio;

        if self.amount <= 0.0 {
            self.is_expired = true;
        }
        actual
    }

    /// Advance the respawn timer while expired. Returns true on the
    /// tick the patch relocates and refills.
    pub fn update(
        &mut self,
        dt: f32,
        player_x: f32,
        player_y: f32,
        day: u32,
        rng: &mut impl Rng,
    ) -> bool {
        if !self.is_expired {
            return false;
        }
        self.respawn_timer += dt;
        if self.respawn_timer > PATCH_RESPAWN_DELAY {
            self.respawn(player_x, player_y, day, rng);
            return true;
        }
        false
    }

    fn respawn(&mut self, player_x: f32, player_y: f32, day: u32, rng: &mut impl Rng) {
        // The band widens each day, pushing the herd farther out
        let days_past = day.saturating_sub(1) as f32;
        let min_distance = 500.0 + days_past * 200.0;
        let max_distance = 1000.0 + days_past * 300.0;

        let angle = rng.gen::<f32>() * std::f32::consts::TAU;
        let distance = min_distance + rng.gen::<f32>() * (max_distance - min_distance);

        self.x = player_x + angle.cos() * distance;
        self.y = player_y + angle.sin() * distance;

        self.amount = self.max_amount;
        self.radius = PATCH_BASE_RADIUS;
        self.is_expired = false;
        self.respawn_timer = 0.0;

        self.consumption_multiplier =
            (self.consumption_multiplier * PATCH_MULTIPLIER_DECAY).max(PATCH_MULTIPLIER_FLOOR);
    }

    /// Whether a world position is inside the (non-expired) patch
    pub fn check_bounds(&self, qx: f32, qy: f32) -> bool {
        if self.is_expired {
            return false;
        }
        let dx = self.x - qx;
        let dy = self.y - qy;
        dx * dx + dy * dy < self.radius * self.radius
    }
}
