use crate::error::GameError;
use crate::game::Game;
use crate::handler::{GamePlayerHandler, GameWorldHandler};
use crate::rules::Rules;
use crate::session::SessionRegistry;
use host::{EntityHandle, Tx, World};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Called for a player who asked to play again, after they left their game.
/// Runs inside the waiting world.
pub type PlayAgainHook = Arc<dyn Fn(&mut Tx<'_>, &EntityHandle) + Send + Sync>;

/// Builds a fresh game for the factory.
pub type CreateGame = Box<dyn Fn() -> Result<Arc<Game>, GameError> + Send + Sync>;

/// Everything a game needs to load.
#[derive(Clone)]
pub struct GameConfig {
    /// Fixed game ID. A random one is generated when `None`.
    pub id: Option<Uuid>,
    pub rules: Arc<dyn Rules>,
    /// Directory holding one sub-directory per map template.
    pub maps_dir: PathBuf,
    /// Parent of the per-game working directories.
    pub worlds_dir: PathBuf,
    /// The shared lobby world players wait in.
    pub waiting_world: World,
    pub sessions: Arc<SessionRegistry>,
    pub player_handler: Option<Arc<dyn GamePlayerHandler>>,
    pub world_handler: Option<Arc<dyn GameWorldHandler>>,
    pub play_again: Option<PlayAgainHook>,
}

impl GameConfig {
    /// Loads a game from this configuration and starts its tick driver.
    pub fn new_game(self) -> Result<Arc<Game>, GameError> {
        Game::load(self)
    }
}

impl fmt::Debug for GameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameConfig")
            .field("id", &self.id)
            .field("maps_dir", &self.maps_dir)
            .field("worlds_dir", &self.worlds_dir)
            .field("waiting_world", &self.waiting_world)
            .finish_non_exhaustive()
    }
}

pub struct FactoryConfig {
    pub create: CreateGame,
}

impl FactoryConfig {
    pub fn new(create: impl Fn() -> Result<Arc<Game>, GameError> + Send + Sync + 'static) -> Self {
        Self {
            create: Box::new(create),
        }
    }
}
