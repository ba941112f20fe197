//! # Match Session Server Library
//!
//! This library runs short-lived multiplayer matches on top of a shared live
//! simulation. Players gather in a lobby, vote on a map, play a match in a
//! world of its own and are sent back to the lobby when it is over. Many
//! matches run at the same time; each player belongs to at most one.
//!
//! ## Core Responsibilities
//!
//! ### Match Lifecycle
//! Every [`Game`] walks through `Waiting -> Playing -> Finished` and then
//! closes itself. A 20 Hz tick clock counts the lobby down, selects the map
//! four seconds before the start and closes the game three seconds after
//! the match ended.
//!
//! ### Membership
//! Joining, leaving and spectating keep three things consistent: the
//! player's [`Session`], the game's [`Participant`] record and the player's
//! entity, which moves between the lobby and the match world.
//!
//! ### Matchmaking
//! The [`Factory`] places an incoming player into the first game that
//! accepts them and creates a new game when none does.
//!
//! ## Architecture Design
//!
//! ### Serialized World Jobs
//! Nothing in this crate mutates players directly. All player access happens
//! inside jobs scheduled on a world, which serializes them. A game's
//! operations take the job's [`Tx`](host::Tx) and refuse to act when it
//! belongs to another world than the one the game expects.
//!
//! ### Two-Phase World Changes
//! A player changes worlds by being detached in one job and attached by a
//! later job in the other world. Jobs never wait on another world, so worlds
//! cannot deadlock on each other.
//!
//! ### Injected Rules
//! Game-specific behaviour (player limits, scoring, scoreboards) comes from a
//! [`Rules`] implementation. Optional capabilities such as admission checks
//! are discovered through the rules rather than by downcasting.
//!
//! ## Module Organization
//!
//! - `game`: the state machine, tick driver and membership operations
//! - `factory`: registry of running games and matchmaking
//! - `session`: per-player sessions and their registry
//! - `participant`: one player's membership record inside a game
//! - `map`, `voting`: map templates and selection by vote
//! - `loadout`, `forms`: game items and the menus they open
//! - `handler`: event filtering between the host and running games
//! - `rules`, `config`, `error`, `state`: the supporting types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use host::{World, WorldConfig};
//! use server::{Factory, FactoryConfig, GameConfig, Rules, SessionRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Duel;
//!
//! impl Rules for Duel {
//!     fn max_players(&self) -> usize { 2 }
//!     fn min_players(&self) -> usize { 2 }
//!     fn waiting_duration(&self) -> Duration { Duration::from_secs(10) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let lobby = World::new(WorldConfig::default());
//!     let sessions = Arc::new(SessionRegistry::new());
//!     let config = GameConfig {
//!         id: None,
//!         rules: Arc::new(Duel),
//!         maps_dir: "maps".into(),
//!         worlds_dir: "game_worlds".into(),
//!         waiting_world: lobby.clone(),
//!         sessions: Arc::clone(&sessions),
//!         player_handler: None,
//!         world_handler: None,
//!         play_again: None,
//!     };
//!     let factory = Arc::new(Factory::new(FactoryConfig::new(move || {
//!         config.clone().new_game()
//!     })));
//!
//!     let _ = lobby.exec(move |tx| {
//!         let handle = tx.spawn_player("Steve", "2535400000000001");
//!         let player = tx.player(&handle).unwrap();
//!         sessions.connect(player, handle.clone());
//!         if let Err(err) = factory.join(tx, &handle) {
//!             eprintln!("matchmaking failed: {}", err);
//!         }
//!     });
//! }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod forms;
pub mod game;
pub mod handler;
pub mod loadout;
pub mod map;
pub mod participant;
pub mod rules;
pub mod session;
pub mod state;
pub mod voting;

mod utils;

#[cfg(test)]
mod test_support;

pub use config::{FactoryConfig, GameConfig, PlayAgainHook};
pub use error::{FactoryError, GameError, JoinError, LeaveError, MapError, VoteError};
pub use factory::Factory;
pub use game::{Game, LeaveOutcome};
pub use handler::{GameEventHandler, GamePlayerHandler, GameWorldHandler, MatchWorldHandler, NopGameHandler};
pub use map::Map;
pub use participant::Participant;
pub use rules::{Admission, BindGame, ParticipantExt, Rules};
pub use session::{Session, SessionRegistry};
pub use state::{ParticipantState, State};
