//! Error types returned by games, the factory and map loading.

use crate::state::State;
use host::WorldError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a player cannot join a game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("game is closed")]
    Closed,
    #[error("game is not in waiting state")]
    NotWaiting,
    #[error("invalid tx: expected player to be in the waiting world")]
    InvalidContext,
    #[error("game is full")]
    Full,
    #[error("player session not found")]
    NoSession,
    #[error("player is already in a game")]
    AlreadyInGame,
    #[error("player not allowed to join: {0}")]
    NotAllowed(String),
}

/// Reasons a player cannot leave a game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaveError {
    #[error("game is closed")]
    Closed,
    #[error("expected player to be in the world of the game")]
    InvalidContext,
    #[error("player session not found")]
    NoSession,
    #[error("player is not in a game")]
    NotInGame,
    #[error("player is in another game")]
    OtherGame,
    #[error("player has no participant record in this game")]
    NoParticipant,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("game is closed")]
    Closed,
    #[error("player is not in the game")]
    NotInGame,
    #[error("map index {index} out of range ({len} maps)")]
    OutOfRange { index: usize, len: usize },
    #[error("the map has already been selected")]
    SelectionDone,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read maps directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read map config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("expected transaction to be valid")]
    InvalidContext,
    #[error("map already loaded")]
    AlreadyLoaded,
    #[error("an earlier map load failed")]
    LoadFailed,
    #[error("no maps available")]
    NoMaps,
    #[error("failed to copy map world: {0}")]
    Copy(#[source] io::Error),
    #[error("failed to open world: {0}")]
    Open(#[from] WorldError),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("game is closed")]
    Closed,
    #[error("expected transaction to be valid for the game")]
    InvalidContext,
    #[error("game is {actual}, expected {expected}")]
    UnexpectedState { expected: State, actual: State },
    #[error("player has no participant record in this game")]
    NoParticipant,
    #[error("failed to load maps: {0}")]
    Maps(#[source] MapError),
    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("failed to create game: {0}")]
    Create(#[source] GameError),
    #[error("new game rejected player: {0}")]
    Rejected(#[source] JoinError),
}
