//! Trough - a purchasable, capacity-limited feeding/watering station

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Active lifetime in seconds once purchased (at the base drain rate)
pub const TROUGH_LIFETIME: f32 = 30.0;
/// Reservation slots
pub const TROUGH_MAX_USERS: u32 = 5;
/// Animals interact with the trough inside this radius
pub const TROUGH_USE_RADIUS: f32 = 50.0;
/// Placement spread around the player, scaled by the range multiplier
const TROUGH_SPAWN_SPREAD: f32 = 400.0;
/// Click-target box for the purchase interaction
const TROUGH_BOX: f32 = 100.0;

/// Flat persisted state of a trough
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroughState {
    pub x: f32,
    pub y: f32,
    pub is_transformed: bool,
    pub timer: f32,
    pub current_users: u32,
    pub is_expired: bool,
    pub range_multiplier: f32,
}

/// Shared water/food station. Starts inactive; a purchase transforms
/// it, after which its timer drains faster the more animals feed from
/// it. Expiry force-clears every reservation.
#[derive(Debug, Clone)]
pub struct Trough {
    pub x: f32,
    pub y: f32,
    pub is_transformed: bool,
    pub timer: f32,
    pub max_users: u32,
    pub current_users: u32,
    pub is_expired: bool,
    pub range_multiplier: f32,
}

impl Trough {
    pub fn new(range_multiplier: f32, rng: &mut impl Rng) -> Self {
        let spread = TROUGH_SPAWN_SPREAD * range_multiplier;
        Self {
            x: (rng.gen::<f32>() - 0.5) * spread,
            y: (rng.gen::<f32>() - 0.5) * spread,
            is_transformed: false,
            timer: TROUGH_LIFETIME,
            max_users: TROUGH_MAX_USERS,
            current_users: 0,
            is_expired: false,
            range_multiplier,
        }
    }

    /// Fixed-position constructor for tests and deterministic setups
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            is_transformed: false,
            timer: TROUGH_LIFETIME,
            max_users: TROUGH_MAX_USERS,
            current_users: 0,
            is_expired: false,
            range_multiplier: 1.0,
        }
    }

    /// Drain the lifetime while active. The drain accelerates with the
    /// number of feeding animals: rate = 1 + users/15.
    pub fn update(&mut self, dt: f32) {
        if self.is_transformed && !self.is_expired {
            let drain_rate = 1.0 + self.current_users as f32 / 15.0;
            self.timer -= dt * drain_rate;
            if self.timer <= 0.0 {
                self.is_expired = true;
                self.current_users = 0;
            }
        }
    }

    /// Claim a reservation slot. Fails when inactive, expired, or full;
    /// callers must check the result and fall back to other water.
    pub fn reserve_slot(&mut self) -> bool {
        if self.is_transformed && !self.is_expired && self.current_users < self.max_users {
            self.current_users += 1;
            true
        } else {
            false
        }
    }

    /// Return a reservation slot. Releasing with zero users is a no-op,
    /// so a double release never under-flows the counter.
    pub fn release_slot(&mut self) {
        if self.current_users > 0 {
            self.current_users -= 1;
        }
    }

    /// Whether the station is active and has a free slot
    pub fn is_usable(&self) -> bool {
        self.is_transformed && !self.is_expired
    }

    /// Purchase click test; only meaningful before transformation
    pub fn check_bounds(&self, x: f32, y: f32) -> bool {
        if self.is_transformed {
            return false;
        }
        x > self.x - TROUGH_BOX / 2.0
            && x < self.x + TROUGH_BOX / 2.0
            && y > self.y - TROUGH_BOX / 2.0
            && y < self.y + TROUGH_BOX / 2.0
    }

    pub fn state(&self) -> TroughState {
        TroughState {
            x: self.x,
            y: self.y,
            is_transformed: self.is_transformed,
            timer: self.timer,
            current_users: self.current_users,
            is_expired: self.is_expired,
            range_multiplier: self.range_multiplier,
        }
    }

    pub fn from_state(state: TroughState) -> Self {
        Self {
            x: state.x,
            y: state.y,
            is_transformed: state.is_transformed,
            timer: state.timer,
            max_users: TROUGH_MAX_USERS,
            current_users: state.current_users,
            is_expired: state.is_expired,
            range_multiplier: state.range_multiplier,
        }
    }
}
