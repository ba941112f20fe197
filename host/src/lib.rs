//! # Simulation Host
//!
//! In-process model of the live simulation that match sessions run on. It
//! provides the capabilities the session server consumes and nothing more:
//!
//! - **Worlds** with a serialized execution context each. Work is scheduled
//!   with [`World::exec`] and runs on the world's own task with a [`Tx`]
//!   granting exclusive access to the world's entities.
//! - **Entity handles** that stay valid across worlds. A player entity is
//!   moved by detaching it in one world and attaching it in another; in
//!   between, its handle reports [`Location::InTransit`].
//! - **Player entities** with inventories, game modes, visibility, chat
//!   messages, scoreboards and pending menus.
//! - **Events**: cancellable player and world events delivered to
//!   [`PlayerHandler`] and [`WorldHandler`] implementations.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use host::{World, WorldConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let lobby = World::new(WorldConfig {
//!         name: "lobby".to_string(),
//!         ..WorldConfig::default()
//!     });
//!
//!     // Runs on the lobby's task, serialized with every other lobby job.
//!     let done = lobby.exec(|tx| {
//!         let handle = tx.spawn_player("Steve", "2535400000000001");
//!         tx.player_mut(&handle).unwrap().message("welcome");
//!     });
//!     done.await.expect("job completed");
//! }
//! ```

pub mod entity;
pub mod event;
pub mod form;
pub mod item;
pub mod world;

pub use entity::{Effect, EntityHandle, EntityId, GameMode, Location, Player, Vec3};
pub use event::{BlockPos, EventContext, NopHandler, PlayerEvent, PlayerHandler, WorldEvent, WorldHandler};
pub use form::Menu;
pub use item::{Inventory, InventoryError, ItemKind, ItemStack};
pub use world::{Completion, Difficulty, Generator, Tx, World, WorldConfig, WorldError, WorldId, WorldSettings};
