//! DuneHerd Core - Desert Herding Simulation Engine
//!
//! An ECS-based simulation of a desert herd: sheep and cows with thirst
//! and hunger, wolves that stalk the flock, and a world of oases, grass,
//! troughs, and deterrent fires.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Sheep, cows, wolves
//! - **Components**: Pure data attached to entities (Position, Needs, Wolf, etc.)
//! - **Systems**: Logic that queries and updates components
//!
//! Singletons that are not worth an entity - the player, the trough, the
//! terrain - live directly on the [`engine::Simulation`].
//!
//! # Example
//!
//! ```rust,no_run
//! use duneherd_core::prelude::*;
//! use duneherd_core::environment::{Environment, Oasis, TileMap};
//!
//! let env = Environment::new(Oasis::default(), TileMap::new(64.0, 100, 100, "rock"));
//! let mut sim = Simulation::new(env);
//!
//! sim.spawn_sheep();
//! sim.spawn_cow();
//! sim.spawn_wolf();
//!
//! // Run simulation
//! loop {
//!     for event in sim.update(1.0 / 60.0) {
//!         println!("{event}");
//!     }
//! }
//! ```

pub mod components;
pub mod engine;
pub mod environment;
pub mod events;
pub mod persistence;
pub mod player;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{Inventory, Simulation};
    pub use crate::events::SimEvent;
    pub use crate::player::Player;
}
