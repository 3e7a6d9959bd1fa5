//! Tile world index - spatial queries over named sparse tile layers.
//!
//! Layers hold sparse tile records on a fixed grid centered on a world
//! point. Per-tile consumption bookkeeping lets grass tiles be eaten
//! down: a consumed tile counts down for a duration and is then hidden
//! from all queries until explicitly re-added.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::Vec2;

/// One sparse tile record within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default)]
struct Layer {
    tiles: Vec<Tile>,
}

/// Flat snapshot of the dynamic tile state (consumed/hidden key sets)
/// for the save system; the static layer geometry is map data and is
/// not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileMapState {
    pub consumed: Vec<(String, f32)>,
    pub hidden: Vec<String>,
}

/// JSON map definition: grid dimensions plus named layers of sparse
/// tile coordinates. Maps are authored as data, not code.
#[derive(Debug, Clone, Deserialize)]
pub struct MapDef {
    pub tile_size: f32,
    pub width: u32,
    pub height: u32,
    pub collision_layer: String,
    pub layers: HashMap<String, Vec<(i32, i32)>>,
}

/// Spatial index over a tile grid: membership, collision, nearest-tile
/// and consumption queries.
#[derive(Debug)]
pub struct TileMap {
    /// World-space size of one tile (base size times draw scale)
    tile_size: f32,
    map_width: u32,
    map_height: u32,
    center: Vec2,
    collision_layer: String,
    layers: HashMap<String, Layer>,
    /// Key: "layer:x,y" -> remaining seconds until the tile hides
    consumed: HashMap<String, f32>,
    hidden: HashSet<String>,
}

fn tile_key(layer: &str, tx: i32, ty: i32) -> String {
    format!("{layer}:{tx},{ty}")
}

impl TileMap {
    pub fn new(tile_size: f32, map_width: u32, map_height: u32, collision_layer: &str) -> Self {
        Self {
            tile_size,
            map_width,
            map_height,
            center: Vec2::ZERO,
            collision_layer: collision_layer.to_string(),
            layers: HashMap::new(),
            consumed: HashMap::new(),
            hidden: HashSet::new(),
        }
    }

    /// Build a map from a JSON definition
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let def: MapDef = serde_json::from_str(json)?;
        let mut map = Self::new(def.tile_size, def.width, def.height, &def.collision_layer);
        for (layer, tiles) in def.layers {
            for (tx, ty) in tiles {
                map.add_tile(&layer, tx, ty);
            }
        }
        Ok(map)
    }

    /// World point the grid is centered on
    pub fn set_center(&mut self, x: f32, y: f32) {
        self.center = Vec2::new(x, y);
    }

    pub fn collision_layer(&self) -> &str {
        &self.collision_layer
    }

    fn origin(&self) -> Vec2 {
        Vec2::new(
            self.center.x - self.map_width as f32 * self.tile_size / 2.0,
            self.center.y - self.map_height as f32 * self.tile_size / 2.0,
        )
    }

    /// Grid coordinate for a world position, or None when off-map
    fn world_to_tile(&self, world: Vec2) -> Option<(i32, i32)> {
        let origin = self.origin();
        let tx = ((world.x - origin.x) / self.tile_size).floor() as i32;
        let ty = ((world.y - origin.y) / self.tile_size).floor() as i32;
        if tx < 0 || tx >= self.map_width as i32 || ty < 0 || ty >= self.map_height as i32 {
            return None;
        }
        Some((tx, ty))
    }

    /// World-space center of a tile coordinate
    pub fn tile_center(&self, tx: i32, ty: i32) -> Vec2 {
        let origin = self.origin();
        Vec2::new(
            origin.x + tx as f32 * self.tile_size + self.tile_size / 2.0,
            origin.y + ty as f32 * self.tile_size + self.tile_size / 2.0,
        )
    }

    /// Add (or restore) a tile to a layer, clearing any consumption or
    /// hidden bookkeeping for that coordinate. Creates the layer when
    /// it does not exist yet.
    pub fn add_tile(&mut self, layer_name: &str, tx: i32, ty: i32) {
        let key = tile_key(layer_name, tx, ty);
        self.hidden.remove(&key);
        self.consumed.remove(&key);

        let layer = self.layers.entry(layer_name.to_string()).or_default();
        let tile = Tile { x: tx, y: ty };
        if !layer.tiles.contains(&tile) {
            layer.tiles.push(tile);
        }
    }

    /// Membership test for a world position, respecting hidden tiles
    pub fn is_position_in_layer(&self, world: Vec2, layer_name: &str) -> bool {
        let Some((tx, ty)) = self.world_to_tile(world) else {
            return false;
        };
        let Some(layer) = self.layers.get(layer_name) else {
            return false;
        };
        if self.hidden.contains(&tile_key(layer_name, tx, ty)) {
            return false;
        }
        layer.tiles.iter().any(|t| t.x == tx && t.y == ty)
    }

    /// Collision test over the designated collision layer
    pub fn is_collision(&self, world: Vec2) -> bool {
        self.is_position_in_layer(world, &self.collision_layer)
    }

    /// Visible tile at a world position, or None
    pub fn tile_at(&self, world: Vec2, layer_name: &str) -> Option<Tile> {
        let (tx, ty) = self.world_to_tile(world)?;
        let layer = self.layers.get(layer_name)?;
        if self.hidden.contains(&tile_key(layer_name, tx, ty)) {
            return None;
        }
        layer
            .tiles
            .iter()
            .find(|t| t.x == tx && t.y == ty)
            .copied()
    }

    /// Nearest visible tile center in a layer (linear scan)
    pub fn nearest_tile_in_layer(&self, world: Vec2, layer_name: &str) -> Option<Vec2> {
        let layer = self.layers.get(layer_name)?;

        let mut nearest = None;
        let mut min_dist_sq = f32::INFINITY;
        for tile in &layer.tiles {
            if self.hidden.contains(&tile_key(layer_name, tile.x, tile.y)) {
                continue;
            }
            let center = self.tile_center(tile.x, tile.y);
            let dist_sq = world.distance_squared(&center);
            if dist_sq < min_dist_sq {
                min_dist_sq = dist_sq;
                nearest = Some(center);
            }
        }
        nearest
    }

    /// Begin the timed consumption countdown for a tile. Already-hidden
    /// tiles and tiles already being consumed are left alone.
    pub fn start_consuming(&mut self, layer_name: &str, tx: i32, ty: i32, duration: f32) {
        let key = tile_key(layer_name, tx, ty);
        if self.hidden.contains(&key) {
            return;
        }
        self.consumed.entry(key).or_insert(duration);
    }

    /// Tick down consumption countdowns, hiding tiles that expire
    pub fn update(&mut self, dt: f32) {
        let mut finished = Vec::new();
        for (key, remaining) in self.consumed.iter_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                finished.push(key.clone());
            }
        }
        for key in finished {
            self.consumed.remove(&key);
            self.hidden.insert(key);
        }
    }

    /// Uniform pick among a layer's tiles, excluding any coordinate
    /// shared with the collision layer. Used for predator spawn
    /// placement.
    pub fn random_safe_position_in_layer(
        &self,
        target_layer: &str,
        collision_layer: &str,
        rng: &mut impl Rng,
    ) -> Option<Vec2> {
        let layer = self.layers.get(target_layer)?;
        if layer.tiles.is_empty() {
            return None;
        }

        let blocked: HashSet<(i32, i32)> = self
            .layers
            .get(collision_layer)
            .map(|l| l.tiles.iter().map(|t| (t.x, t.y)).collect())
            .unwrap_or_default();

        let safe: Vec<&Tile> = layer
            .tiles
            .iter()
            .filter(|t| !blocked.contains(&(t.x, t.y)))
            .collect();
        if safe.is_empty() {
            return None;
        }

        let tile = safe[rng.gen_range(0..safe.len())];
        Some(self.tile_center(tile.x, tile.y))
    }

    /// Clear all consumption bookkeeping (everything regrows)
    pub fn reset_consumed(&mut self) {
        self.consumed.clear();
        self.hidden.clear();
    }

    /// Snapshot the dynamic state for persistence
    pub fn state(&self) -> TileMapState {
        TileMapState {
            consumed: self
                .consumed
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            hidden: self.hidden.iter().cloned().collect(),
        }
    }

    /// Restore dynamic state from a snapshot
    pub fn apply_state(&mut self, state: TileMapState) {
        self.consumed = state.consumed.into_iter().collect();
        self.hidden = state.hidden.into_iter().collect();
    }
}
