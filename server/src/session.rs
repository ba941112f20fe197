//! Per-player sessions and the registry that tracks them.
//!
//! A session exists from the moment a player connects until they
//! disconnect and binds the player's XUID to at most one running game.

use crate::game::Game;
use crate::utils::lock;
use dashmap::DashMap;
use host::{EntityHandle, Player, Tx};
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, Mutex};

pub struct Session {
    xuid: String,
    name: String,
    handle: EntityHandle,
    game: Mutex<Option<Arc<Game>>>,
}

impl Session {
    pub fn new(xuid: impl Into<String>, name: impl Into<String>, handle: EntityHandle) -> Self {
        Self {
            xuid: xuid.into(),
            name: name.into(),
            handle,
            game: Mutex::new(None),
        }
    }

    pub fn xuid(&self) -> &str {
        &self.xuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &EntityHandle {
        &self.handle
    }

    /// The game this session is bound to. A game that has closed since it
    /// was bound counts as no game.
    pub fn game(&self) -> Option<Arc<Game>> {
        lock(&self.game)
            .as_ref()
            .filter(|game| !game.is_closed())
            .cloned()
    }

    /// Binds the session to `game`, or unbinds it with `None`.
    ///
    /// # Panics
    ///
    /// Panics when binding a game while another live game is still bound.
    pub fn set_game(&self, game: Option<Arc<Game>>) {
        let mut current = lock(&self.game);
        if let (Some(new), Some(old)) = (&game, current.as_ref()) {
            if !old.is_closed() {
                panic!(
                    "session {} is already bound to game {} (binding {})",
                    self.name,
                    old.id(),
                    new.id()
                );
            }
        }
        *current = game;
    }

    /// The session's player, if it is inside `tx`'s world.
    pub fn player<'t>(&self, tx: &'t Tx<'_>) -> Option<&'t Player> {
        tx.player(&self.handle)
    }

    pub(crate) fn close(&self) {
        *lock(&self.game) = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("xuid", &self.xuid)
            .field("name", &self.name)
            .field("game", &self.game().map(|g| g.id()))
            .finish()
    }
}

/// Process-wide map from XUID to session. Constructed once and shared by
/// `Arc` between the factory, the games and the event handlers.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the session for a freshly connected player, replacing any
    /// stale session under the same XUID.
    pub fn connect(&self, player: &Player, handle: EntityHandle) -> Arc<Session> {
        let session = Arc::new(Session::new(player.xuid(), player.name(), handle));
        if let Some(stale) = self
            .sessions
            .insert(player.xuid().to_string(), Arc::clone(&session))
        {
            debug!("Replaced stale session of {}", stale.name());
            stale.close();
        }
        info!("Session opened for {}", player.name());
        session
    }

    pub fn get(&self, xuid: &str) -> Option<Arc<Session>> {
        self.sessions.get(xuid).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes and closes the session of `xuid`.
    pub fn disconnect(&self, xuid: &str) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(xuid)?;
        session.close();
        info!("Session closed for {}", session.name());
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
