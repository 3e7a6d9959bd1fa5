//! Common components used across multiple entity types.

use serde::{Deserialize, Serialize};

/// 2D position vector in world coordinates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` radians
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Angle of the vector from this point toward `other`, in radians
    pub fn angle_to(&self, other: &Self) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Rotate the vector by `angle` radians
    pub fn rotated(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

/// Spatial position component - where an entity is located
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position(pub Vec2);

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

/// Cardinal facing for sprite selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Default for Facing {
    fn default() -> Self {
        Facing::Down
    }
}

/// Minimum simulation time between facing changes, in seconds.
/// Prevents visual jitter when a movement vector flips sign rapidly.
pub const FACING_HYSTERESIS: f32 = 0.5;

/// Facing plus the hysteresis accumulator that gates direction changes.
///
/// The accumulator counts simulation time since the last change, so the
/// behavior is deterministic under a fixed tick schedule (no wall clock).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FacingState {
    pub facing: Facing,
    since_change: f32,
}

impl Default for FacingState {
    fn default() -> Self {
        Self {
            facing: Facing::Down,
            // Start past the window so the first real movement sets facing
            since_change: FACING_HYSTERESIS,
        }
    }
}

impl FacingState {
    pub fn with_facing(facing: Facing) -> Self {
        Self {
            facing,
            since_change: FACING_HYSTERESIS,
        }
    }

    /// Advance the accumulator and switch facing toward the dominant
    /// movement axis, if the hysteresis window has elapsed.
    pub fn update(&mut self, move_x: f32, move_y: f32, dt: f32) {
        self.since_change += dt;
        if self.since_change < FACING_HYSTERESIS {
            return;
        }

        let candidate = if move_x.abs() > move_y.abs() {
            if move_x > 0.0 {
                Some(Facing::Right)
            } else if move_x < 0.0 {
                Some(Facing::Left)
            } else {
                None
            }
        } else if move_y > 0.0 {
            Some(Facing::Down)
        } else if move_y < 0.0 {
            Some(Facing::Up)
        } else {
            None
        };

        if let Some(facing) = candidate {
            if facing != self.facing {
                self.facing = facing;
                self.since_change = 0.0;
            }
        }
    }
}

/// Current wander heading for idle drift
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Wander {
    pub angle: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);

        let sum = a + b;
        assert_eq!(sum.x, 5.0);
        assert_eq!(sum.y, 8.0);

        let diff = b - a;
        assert_eq!(diff.x, 3.0);

        let scaled = a * 2.0;
        assert_eq!(scaled.x, 2.0);
        assert_eq!(scaled.y, 4.0);

        assert!((a.distance(&b) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2::new(3.0, 4.0);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < 0.001);
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_vec2_rotated() {
        let v = Vec2::new(1.0, 0.0);
        let r = v.rotated(std::f32::consts::FRAC_PI_2);
        assert!(r.x.abs() < 0.001);
        assert!((r.y - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_facing_hysteresis_blocks_rapid_flips() {
        let mut f = FacingState::default();

        // First movement sets facing immediately (window pre-elapsed)
        f.update(1.0, 0.0, 0.016);
        assert_eq!(f.facing, Facing::Right);

        // Immediate reversal is suppressed
        f.update(-1.0, 0.0, 0.016);
        assert_eq!(f.facing, Facing::Right);

        // After the window elapses the reversal is honored
        f.update(-1.0, 0.0, 0.6);
        assert_eq!(f.facing, Facing::Left);
    }

    #[test]
    fn test_facing_prefers_dominant_axis() {
        let mut f = FacingState::default();
        f.update(0.3, -0.9, 0.016);
        assert_eq!(f.facing, Facing::Up);
    }

    #[test]
    fn test_facing_zero_movement_keeps_current() {
        let mut f = FacingState::with_facing(Facing::Left);
        f.update(0.0, 0.0, 1.0);
        assert_eq!(f.facing, Facing::Left);
    }
}
