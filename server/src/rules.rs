//! The rule strategy a game delegates all game-specific behaviour to.
//!
//! A [`Game`] only drives the lifecycle: lobby countdown, map selection,
//! moving players between worlds and tearing down. Scoring, win conditions
//! and scoreboards come from the [`Rules`] implementation injected through
//! [`GameConfig`](crate::config::GameConfig).

use crate::game::Game;
use crate::map::Map;
use crate::participant::Participant;
use host::{Player, Tx};
use std::any::Any;
use std::error::Error;
use std::sync::Weak;
use std::time::Duration;

pub type ExtensionError = Box<dyn Error + Send + Sync>;

pub trait Rules: Send + Sync + 'static {
    /// Maximum amount of players that can be in the game at once.
    fn max_players(&self) -> usize;

    /// Minimum amount of players required before the countdown runs.
    fn min_players(&self) -> usize;

    /// How long the lobby counts down once enough players are present.
    fn waiting_duration(&self) -> Duration;

    /// Called once while the game is being created.
    fn load(&self) {}

    /// Called inside the match world right after every player arrived.
    fn handle_start(&self, _game: &Game, _tx: &mut Tx<'_>) {}

    fn handle_quit(&self, _game: &Game, _tx: &mut Tx<'_>, _participant: &Participant) {}

    fn handle_join(&self, _game: &Game, _tx: &mut Tx<'_>, _participant: &Participant) {}

    fn handle_close(&self, _game: &Game, _tx: &mut Tx<'_>) {}

    /// Called every tick while the game is playing.
    fn handle_playing_tick(&self, _game: &Game, _tx: &mut Tx<'_>, _current_tick: u64) {}

    /// `starting_in` is `None` while there are not enough players.
    fn render_waiting_scoreboard(&self, player: &mut Player, starting_in: Option<i64>, participants: usize) {
        let status = match starting_in {
            Some(seconds) => format!("Starting in {seconds}s"),
            None => "Waiting for players".to_string(),
        };
        player.set_scoreboard(vec![status, format!("Players: {participants}")]);
    }

    fn render_finished_scoreboard(&self, player: &mut Player, closing_in: i64) {
        player.set_scoreboard(vec![format!("Closing in {closing_in}s")]);
    }

    fn handle_map_ready(&self, _game: &Game, _tx: &mut Tx<'_>, _map: &Map) {}

    /// Creates the rules' per-participant state.
    fn handle_participant_create(&self, _participant: &Participant) -> Box<dyn ParticipantExt> {
        Box::new(NopParticipant)
    }

    /// Admission check consulted on join, if the rules have one.
    fn admission(&self) -> Option<&dyn Admission> {
        None
    }

    /// Receiver of the game reference once the map is ready, if wanted.
    fn game_binding(&self) -> Option<&dyn BindGame> {
        None
    }
}

pub trait Admission: Send + Sync {
    /// Returns the reason for refusing `player`, if any.
    fn allow(&self, player: &Player) -> Result<(), String>;
}

pub trait BindGame: Send + Sync {
    fn bind_game(&self, game: Weak<Game>);
}

/// Rules-owned state attached to one participant.
pub trait ParticipantExt: Send + 'static {
    /// Releases whatever the extension holds. Called once, when the
    /// participant leaves or the game closes.
    fn close(&mut self) -> Result<(), ExtensionError>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NopParticipant;

impl ParticipantExt for NopParticipant {
    fn close(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
