//! Matchmaking across concurrently running games.

use crate::config::{CreateGame, FactoryConfig};
use crate::error::{FactoryError, GameError};
use crate::game::Game;
use dashmap::DashMap;
use host::{EntityHandle, Tx};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Registry of running games. Games remove themselves when they close.
pub struct Factory {
    games: Arc<DashMap<Uuid, Arc<Game>>>,
    create: CreateGame,
}

impl Factory {
    pub fn new(config: FactoryConfig) -> Self {
        Self {
            games: Arc::new(DashMap::new()),
            create: config.create,
        }
    }

    /// Puts the player into the first game that accepts them, creating a
    /// new game if none does.
    pub fn join(&self, tx: &mut Tx<'_>, handle: &EntityHandle) -> Result<Arc<Game>, FactoryError> {
        for game in self.games() {
            match game.join(tx, handle) {
                Ok(()) => return Ok(game),
                Err(err) => debug!("Game {} refused entity {}: {}", game.id(), handle.id(), err),
            }
        }

        let game = self.new_game().map_err(|err| {
            warn!("Failed to create game: {}", err);
            FactoryError::Create(err)
        })?;
        game.join(tx, handle).map_err(|err| {
            warn!("New game {} refused entity {}: {}", game.id(), handle.id(), err);
            FactoryError::Rejected(err)
        })?;
        Ok(game)
    }

    /// Creates and registers a game. It deregisters itself on close.
    pub fn new_game(&self) -> Result<Arc<Game>, GameError> {
        let game = (self.create)()?;
        let id = game.id();
        let games = Arc::clone(&self.games);
        game.set_close_hook(move || {
            games.remove(&id);
        });
        self.games.insert(id, Arc::clone(&game));
        info!("Game {} registered ({} running)", id, self.games.len());
        Ok(game)
    }

    /// Snapshot of the running games.
    pub fn games(&self) -> Vec<Arc<Game>> {
        self.games
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn game(&self, id: Uuid) -> Option<Arc<Game>> {
        self.games.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("games", &self.games.len())
            .finish_non_exhaustive()
    }
}
