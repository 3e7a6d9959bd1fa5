//! Environment - the terrain and resource layer the agents live on

pub mod fire;
pub mod grassland;
pub mod tilemap;
pub mod trough;

pub use fire::Fire;
pub use grassland::Grassland;
pub use tilemap::{MapDef, TileMap, TileMapState};
pub use trough::{Trough, TroughState};

use serde::{Deserialize, Serialize};

use crate::components::Vec2;

/// Permanent water feature; animals drink anywhere inside its circle
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Oasis {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Default for Oasis {
    fn default() -> Self {
        Self {
            x: 400.0,
            y: 300.0,
            radius: 100.0,
        }
    }
}

impl Oasis {
    pub fn contains(&self, pos: Vec2) -> bool {
        pos.distance(&Vec2::new(self.x, self.y)) < self.radius
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Result of one environment tick
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldTick {
    /// At least one grassland patch relocated and refilled this tick
    pub respawned: bool,
}

/// The world the agents query: oasis, tile grid, and grassland patches
#[derive(Debug)]
pub struct Environment {
    pub oasis: Oasis,
    pub tile_map: TileMap,
    pub grasslands: Vec<Grassland>,
}

impl Environment {
    pub fn new(oasis: Oasis, tile_map: TileMap) -> Self {
        Self {
            oasis,
            tile_map,
            grasslands: Vec::new(),
        }
    }

    /// Advance tile consumption countdowns and grassland respawn timers.
    /// Expired patches relocate at a distance band that widens with the
    /// in-game day count.
    pub fn update(
        &mut self,
        dt: f32,
        player_x: f32,
        player_y: f32,
        day: u32,
        rng: &mut impl rand::Rng,
    ) -> WorldTick {
        self.tile_map.update(dt);

        let mut tick = WorldTick::default();
        for patch in &mut self.grasslands {
            if patch.update(dt, player_x, player_y, day, rng) {
                tick.respawned = true;
            }
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oasis_contains() {
        let oasis = Oasis::default();
        assert!(oasis.contains(Vec2::new(400.0, 300.0)));
        assert!(oasis.contains(Vec2::new(450.0, 300.0)));
        assert!(!oasis.contains(Vec2::new(501.0, 300.0)));
    }

    #[test]
    fn test_environment_reports_respawn() {
        let mut rng = rand::thread_rng();
        let mut env = Environment::new(Oasis::default(), TileMap::new(64.0, 10, 10, "rock"));
        let mut patch = Grassland::new(0.0, 0.0, 1.0);
        // Deplete the patch so only the respawn delay remains
        patch.consume(10_000.0);
        env.grasslands.push(patch);

        let tick = env.update(3.5, 0.0, 0.0, 1, &mut rng);
        assert!(tick.respawned);
    }
}
