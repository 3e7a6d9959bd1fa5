//! Save/Load functionality for persisting simulation state.
//!
//! Uses bincode for binary serialization. Entity components are
//! serialized individually as optionals and reconstructed on load, so
//! any component combination round-trips. Tile layer geometry is map
//! data and is not persisted; only the dynamic consumed/hidden state
//! travels with the save.

use hecs::World;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::components::*;
use crate::engine::{Inventory, Simulation};
use crate::environment::{Fire, Grassland, TileMapState, Trough, TroughState};
use crate::player::Player;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Simulation time in seconds
    pub sim_time: f64,
    /// Current in-game day
    pub day: u32,
    /// Progress toward the next day rollover
    pub day_progress: f32,
    /// Player state
    pub player: Player,
    /// Collected goods
    pub inventory: Inventory,
    /// The trough
    pub trough: TroughState,
    /// Burning fires
    pub fires: Vec<Fire>,
    /// Dynamic tile state (consumed/hidden)
    pub tile_state: TileMapState,
    /// Grassland patches
    pub grasslands: Vec<Grassland>,
    /// Pending wolf respawn timers
    pub wolf_respawn_queue: Vec<f32>,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
}

/// All possible components for an entity, serialized as optionals.
///
/// A wolf's target is a weak entity handle that would dangle across a
/// reload; the `Wolf` component skips it in serde and the wolf simply
/// re-acquires a target on its first tick.
#[derive(Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    // Species
    pub sheep: Option<Sheep>,
    pub cow: Option<Cow>,
    pub wolf: Option<Wolf>,

    // Shared
    pub position: Option<Position>,
    pub needs: Option<Needs>,
    pub animal_state: Option<AnimalState>,
    pub facing_state: Option<FacingState>,
    pub wander: Option<Wander>,
    pub life_state: Option<LifeState>,
    pub wolf_hits: Option<WolfHits>,
    pub facing: Option<Facing>,
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &World) -> Vec<SerializableEntity> {
    let mut entities = Vec::new();

    for entity in world.iter() {
        let mut se = SerializableEntity::default();
        let entity_ref = match world.entity(entity.entity()) {
            Ok(r) => r,
            Err(_) => continue,
        };

        if let Some(c) = entity_ref.get::<&Sheep>() {
            se.sheep = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Cow>() {
            se.cow = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Wolf>() {
            se.wolf = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Position>() {
            se.position = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Needs>() {
            se.needs = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&AnimalState>() {
            se.animal_state = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&FacingState>() {
            se.facing_state = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Wander>() {
            se.wander = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&LifeState>() {
            se.life_state = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&WolfHits>() {
            se.wolf_hits = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Facing>() {
            se.facing = Some(*c);
        }

        entities.push(se);
    }

    entities
}

/// Spawn an entity with all its serialized components
fn spawn_entity(world: &mut World, se: SerializableEntity) {
    let entity = world.spawn(());

    if let Some(c) = se.sheep {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.cow {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.wolf {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.position {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.needs {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.animal_state {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.facing_state {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.wander {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.life_state {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.wolf_hits {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.facing {
        let _ = world.insert_one(entity, c);
    }
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(writer: W, sim: &Simulation) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        sim_time: sim.sim_time,
        day: sim.day,
        day_progress: sim.day_progress,
        player: sim.player.clone(),
        inventory: sim.inventory,
        trough: sim.trough.state(),
        fires: sim.fires.clone(),
        tile_state: sim.env.tile_map.state(),
        grasslands: sim.env.grasslands.clone(),
        wolf_respawn_queue: sim.wolf_respawn_queue.clone(),
        entities: serialize_entities(&sim.world),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a simulation snapshot into `sim`, replacing its dynamic state.
/// Any in-flight harvest session is dropped; its entity handle would
/// not survive the world rebuild.
pub fn load_simulation<R: Read>(reader: R, sim: &mut Simulation) -> Result<(), SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    sim.world = World::new();
    for se in save_data.entities {
        spawn_entity(&mut sim.world, se);
    }

    sim.sim_time = save_data.sim_time;
    sim.day = save_data.day;
    sim.day_progress = save_data.day_progress;
    sim.player = save_data.player;
    sim.inventory = save_data.inventory;
    sim.trough = Trough::from_state(save_data.trough);
    sim.fires = save_data.fires;
    sim.env.tile_map.apply_state(save_data.tile_state);
    sim.env.grasslands = save_data.grasslands;
    sim.wolf_respawn_queue = save_data.wolf_respawn_queue;
    sim.harvest = None;

    Ok(())
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SaveError {}
