//! The match state machine.
//!
//! A [`Game`] moves its players through `Waiting -> Playing -> Finished`
//! and closes itself afterwards. Everything that touches players runs in a
//! world job: the shared waiting world while the game waits, the game's own
//! match world from the start on. A tick task drives the clock at 20 ticks
//! per second by scheduling [`Game::on_tick`] into whichever of the two
//! worlds the game currently expects.

use crate::config::{GameConfig, PlayAgainHook};
use crate::error::{GameError, JoinError, LeaveError, MapError, VoteError};
use crate::handler::{GamePlayerHandler, GameWorldHandler, MatchWorldHandler, NopGameHandler};
use crate::loadout::{give_finished_items, give_lobby_items, give_spectator_items, reset_player};
use crate::map::{load_maps, Map};
use crate::participant::Participant;
use crate::rules::Rules;
use crate::session::SessionRegistry;
use crate::state::{ParticipantState, State};
use crate::utils::lock;
use crate::voting::{select_map, tally};
use dashmap::DashMap;
use host::{Difficulty, EntityHandle, Generator, Player, Tx, World, WorldConfig};
use log::{debug, error, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

pub const TICKS_PER_SECOND: u64 = 20;
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / TICKS_PER_SECOND);
/// Seconds left on the lobby countdown when the map gets selected.
pub const MAP_LOAD_THRESHOLD: i64 = 4;
/// Seconds between the end of a match and the game closing.
pub const CLOSING_COUNTDOWN: i64 = 3;

const MATCH_WORLD_TIME: i64 = 3000;
const MATCH_SAVE_INTERVAL: Duration = Duration::from_secs(60 * 60);

type CloseHook = Box<dyn FnOnce() + Send>;

/// Whether leaving moved the player into another world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The player is still in the world it left from.
    SameWorld,
    /// The player was detached and will reappear in the waiting world once
    /// the scheduled move has run there.
    WorldChanged,
}

struct Arena {
    map: Arc<Map>,
    world: World,
}

pub struct Game {
    me: Weak<Game>,
    id: Uuid,
    rules: Arc<dyn Rules>,
    waiting_world: World,
    sessions: Arc<SessionRegistry>,
    player_handler: Arc<dyn GamePlayerHandler>,
    world_handler: Arc<dyn GameWorldHandler>,
    play_again_hook: Option<PlayAgainHook>,
    available_maps: Vec<Arc<Map>>,
    work_dir: PathBuf,

    state: Mutex<State>,
    participants: DashMap<String, Arc<Participant>>,
    arena: OnceLock<Arena>,
    map_failed: AtomicBool,
    closed: AtomicBool,
    current_tick: AtomicU64,
    starting_in: AtomicI64,
    closing_in: AtomicI64,
    close_hook: Mutex<Option<CloseHook>>,
}

impl Game {
    /// Loads the available maps, sets the game up for waiting and starts
    /// its tick driver. Must be called from within a tokio runtime.
    pub fn load(config: GameConfig) -> Result<Arc<Game>, GameError> {
        let maps = load_maps(&config.maps_dir).map_err(GameError::Maps)?;
        if maps.is_empty() {
            return Err(GameError::Maps(MapError::NoMaps));
        }

        let id = config.id.unwrap_or_else(Uuid::new_v4);
        let rules = config.rules;
        let starting_in = rules.waiting_duration().as_secs() as i64;
        rules.load();

        let player_handler = config
            .player_handler
            .unwrap_or_else(|| Arc::new(NopGameHandler) as Arc<dyn GamePlayerHandler>);
        let world_handler = config
            .world_handler
            .unwrap_or_else(|| Arc::new(NopGameHandler) as Arc<dyn GameWorldHandler>);

        let game = Arc::new_cyclic(|me| Game {
            me: me.clone(),
            id,
            rules,
            waiting_world: config.waiting_world,
            sessions: config.sessions,
            player_handler,
            world_handler,
            play_again_hook: config.play_again,
            available_maps: maps,
            work_dir: config.worlds_dir.join(id.to_string()),
            state: Mutex::new(State::Waiting),
            participants: DashMap::new(),
            arena: OnceLock::new(),
            map_failed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            current_tick: AtomicU64::new(0),
            starting_in: AtomicI64::new(starting_in),
            closing_in: AtomicI64::new(0),
            close_hook: Mutex::new(None),
        });

        info!(
            "Game {} loaded with {} maps",
            game.id,
            game.available_maps.len()
        );
        tokio::spawn(run_ticker(Arc::downgrade(&game)));
        Ok(game)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rules(&self) -> &Arc<dyn Rules> {
        &self.rules
    }

    pub fn state(&self) -> State {
        *lock(&self.state)
    }

    fn set_state(&self, next: State) {
        let mut state = lock(&self.state);
        if !state.can_advance_to(next) {
            warn!("Game {}: unexpected transition {} -> {}", self.id, state, next);
        }
        debug!("Game {}: {} -> {}", self.id, state, next);
        *state = next;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Acquire)
    }

    pub fn starting_in(&self) -> i64 {
        self.starting_in.load(Ordering::Acquire)
    }

    pub fn closing_in(&self) -> i64 {
        self.closing_in.load(Ordering::Acquire)
    }

    pub fn map_loaded(&self) -> bool {
        self.arena.get().is_some()
    }

    /// True once selecting or opening the map has failed. The game then
    /// never leaves the waiting state on its own.
    pub fn map_failed(&self) -> bool {
        self.map_failed.load(Ordering::Acquire)
    }

    pub fn map(&self) -> Option<Arc<Map>> {
        self.arena.get().map(|arena| Arc::clone(&arena.map))
    }

    pub fn available_maps(&self) -> &[Arc<Map>] {
        &self.available_maps
    }

    /// Directory the selected map is copied to.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn waiting_world(&self) -> &World {
        &self.waiting_world
    }

    pub fn match_world(&self) -> Option<World> {
        self.arena.get().map(|arena| arena.world.clone())
    }

    /// The world the game's players are expected in: the waiting world while
    /// waiting, the match world afterwards.
    pub fn world(&self) -> World {
        match self.arena.get() {
            Some(arena) if !self.state().waiting() => arena.world.clone(),
            _ => self.waiting_world.clone(),
        }
    }

    /// Whether `tx` belongs to the world the game currently expects.
    pub fn valid_tx(&self, tx: &Tx<'_>) -> bool {
        *tx.world() == self.world()
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn player_handler(&self) -> &Arc<dyn GamePlayerHandler> {
        &self.player_handler
    }

    pub fn world_handler(&self) -> &Arc<dyn GameWorldHandler> {
        &self.world_handler
    }

    pub(crate) fn weak(&self) -> Weak<Game> {
        self.me.clone()
    }

    /// Runs once when the game closes. The factory uses it to deregister
    /// the game.
    pub fn set_close_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *lock(&self.close_hook) = Some(Box::new(hook));
    }

    /// Snapshot of all participants, ordered by name.
    pub fn participants(&self) -> Vec<Arc<Participant>> {
        let mut participants: Vec<_> = self
            .participants
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        participants.sort_by(|a, b| a.name().cmp(b.name()));
        participants
    }

    pub fn participant_len(&self) -> usize {
        self.participants.len()
    }

    pub fn playing_participants(&self) -> Vec<Arc<Participant>> {
        let mut participants = self.participants();
        participants.retain(|par| par.state().playing());
        participants
    }

    pub fn playing_participant_len(&self) -> usize {
        self.participants
            .iter()
            .filter(|entry| entry.value().state().playing())
            .count()
    }

    pub fn participant(&self, xuid: &str) -> Option<Arc<Participant>> {
        self.participants
            .get(xuid)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn in_game(&self, xuid: &str) -> bool {
        self.participants.contains_key(xuid)
    }

    /// Calls `f` for every participant whose player is inside `tx`.
    /// Does nothing unless `tx` belongs to the game's current world.
    pub fn for_each_player(&self, tx: &mut Tx<'_>, mut f: impl FnMut(&mut Player, &Participant)) {
        if !self.valid_tx(tx) {
            return;
        }
        for par in self.participants() {
            if let Some(player) = par.player_mut(tx) {
                f(player, &par);
            }
        }
    }

    /// Like [`for_each_player`](Game::for_each_player), skipping spectators.
    pub fn for_each_playing_player(&self, tx: &mut Tx<'_>, mut f: impl FnMut(&mut Player, &Participant)) {
        self.for_each_player(tx, |player, par| {
            if par.state().playing() {
                f(player, par);
            }
        });
    }

    pub fn broadcast(&self, tx: &mut Tx<'_>, message: &str) {
        self.for_each_player(tx, |player, _| player.message(message));
    }

    /// One step of the game clock. Ignored unless `tx` belongs to the world
    /// the game expects.
    pub fn on_tick(&self, tx: &mut Tx<'_>) {
        if self.is_closed() || !self.valid_tx(tx) {
            return;
        }
        let tick = self.current_tick.fetch_add(1, Ordering::AcqRel) + 1;

        match self.state() {
            State::Waiting if tick % TICKS_PER_SECOND == 0 => self.waiting_step(tx),
            State::Playing => self.rules.handle_playing_tick(self, tx, tick),
            State::Finished if tick % TICKS_PER_SECOND == 0 => self.finished_step(tx),
            _ => {}
        }
    }

    fn full_countdown(&self) -> i64 {
        self.rules.waiting_duration().as_secs() as i64
    }

    fn waiting_step(&self, tx: &mut Tx<'_>) {
        let enough_players = self.participants.len() >= self.rules.min_players();
        if enough_players {
            let starting_in = self.starting_in.fetch_sub(1, Ordering::AcqRel) - 1;
            if starting_in <= MAP_LOAD_THRESHOLD && !self.map_loaded() && !self.map_failed() {
                if let Err(err) = self.load_map(tx) {
                    error!("Game {}: failed to load map: {}", self.id, err);
                }
            }
            if starting_in <= 0 && !self.map_failed() {
                if let Err(err) = self.start(tx) {
                    error!("Game {}: failed to start: {}", self.id, err);
                }
            }
        } else {
            self.starting_in
                .store(self.full_countdown(), Ordering::Release);
        }

        let starting_in = enough_players.then(|| self.starting_in());
        let participants = self.participants.len();
        self.for_each_player(tx, |player, _| {
            self.rules
                .render_waiting_scoreboard(player, starting_in, participants)
        });
    }

    fn finished_step(&self, tx: &mut Tx<'_>) {
        let closing_in = self.closing_in.fetch_sub(1, Ordering::AcqRel) - 1;
        if closing_in <= 0 {
            if let Err(err) = self.close(tx) {
                error!("Game {}: failed to close: {}", self.id, err);
            }
            return;
        }
        self.for_each_player(tx, |player, _| {
            self.rules.render_finished_scoreboard(player, closing_in)
        });
    }

    /// Adds the player to the game. The player must be in the waiting world
    /// and have a session that is not bound to another game.
    pub fn join(&self, tx: &mut Tx<'_>, handle: &EntityHandle) -> Result<(), JoinError> {
        if self.is_closed() {
            return Err(JoinError::Closed);
        }
        if !self.state().waiting() {
            return Err(JoinError::NotWaiting);
        }
        if !self.valid_tx(tx) {
            return Err(JoinError::InvalidContext);
        }
        let Some(player) = tx.player(handle) else {
            return Err(JoinError::InvalidContext);
        };
        if self.participants.len() >= self.rules.max_players() {
            return Err(JoinError::Full);
        }
        let name = player.name().to_string();
        let xuid = player.xuid().to_string();

        let session = self.sessions.get(&xuid).ok_or(JoinError::NoSession)?;
        if session.game().is_some() {
            return Err(JoinError::AlreadyInGame);
        }
        let me = self.me.upgrade().ok_or(JoinError::Closed)?;
        session.set_game(Some(me));

        let spawn = self.waiting_world.spawn();
        if let Some(player) = tx.player_mut(handle) {
            player.teleport(spawn);
            player.message(format!(
                "Teleported to {:.1}, {:.1}, {:.1}",
                spawn.x, spawn.y, spawn.z
            ));

            if let Some(admission) = self.rules.admission() {
                if let Err(reason) = admission.allow(player) {
                    session.set_game(None);
                    return Err(JoinError::NotAllowed(reason));
                }
            }
        }

        let participant = Arc::new(Participant::new(name.as_str(), xuid.as_str(), handle.clone()));
        participant.set_ext(self.rules.handle_participant_create(&participant));
        self.participants
            .insert(xuid.clone(), Arc::clone(&participant));

        if let Some(player) = tx.player_mut(handle) {
            reset_player(player);
            give_lobby_items(player);
        }

        for other in tx.handles() {
            if other == *handle {
                continue;
            }
            let co_participant = tx
                .player(&other)
                .map_or(false, |p| self.in_game(p.xuid()));
            tx.set_mutual_visibility(handle, &other, co_participant);
        }

        self.rules.handle_join(self, tx, &participant);
        info!(
            "{} joined game {} ({}/{})",
            name,
            self.id,
            self.participants.len(),
            self.rules.max_players()
        );
        Ok(())
    }

    /// Removes the player from the game. Once the game has left the waiting
    /// state the player is moved back to the waiting world.
    pub fn leave(&self, tx: &mut Tx<'_>, handle: &EntityHandle) -> Result<LeaveOutcome, LeaveError> {
        if self.is_closed() {
            return Err(LeaveError::Closed);
        }
        if !self.valid_tx(tx) {
            return Err(LeaveError::InvalidContext);
        }
        let Some(player) = tx.player(handle) else {
            return Err(LeaveError::InvalidContext);
        };
        let xuid = player.xuid().to_string();

        let session = self.sessions.get(&xuid).ok_or(LeaveError::NoSession)?;
        let current = session.game().ok_or(LeaveError::NotInGame)?;
        if current.id() != self.id {
            return Err(LeaveError::OtherGame);
        }
        let participant = self.participant(&xuid).ok_or(LeaveError::NoParticipant)?;
        session.set_game(None);

        self.rules.handle_quit(self, tx, &participant);
        if let Some(player) = tx.player_mut(handle) {
            reset_player(player);
        }
        self.participants.remove(&xuid);

        let outcome = if self.state().waiting() {
            LeaveOutcome::SameWorld
        } else {
            if let Some(detached) = tx.remove_entity(handle) {
                let _ = self
                    .waiting_world
                    .exec(move |tx| enter_waiting_world(tx, detached));
            }
            LeaveOutcome::WorldChanged
        };
        participant.close();

        info!("{} left game {}", participant.name(), self.id);
        Ok(outcome)
    }

    /// Leaves the game and hands the player to the play-again hook.
    pub fn play_again(&self, tx: &mut Tx<'_>, handle: &EntityHandle) -> Result<(), LeaveError> {
        let outcome = self.leave(tx, handle)?;
        self.run_play_again(tx, handle, outcome);
        Ok(())
    }

    fn run_play_again(&self, tx: &mut Tx<'_>, handle: &EntityHandle, outcome: LeaveOutcome) {
        let Some(hook) = self.play_again_hook.clone() else {
            return;
        };
        match outcome {
            LeaveOutcome::SameWorld => hook(tx, handle),
            // Queued behind the move into the waiting world.
            LeaveOutcome::WorldChanged => {
                let handle = handle.clone();
                let _ = self.waiting_world.exec(move |tx| {
                    if tx.contains(&handle) {
                        hook(tx, &handle);
                    }
                });
            }
        }
    }

    /// Records the player's map vote. Votes can be changed until the map is
    /// selected.
    pub fn vote_map(&self, xuid: &str, index: usize) -> Result<(), VoteError> {
        if self.is_closed() {
            return Err(VoteError::Closed);
        }
        let participant = self.participant(xuid).ok_or(VoteError::NotInGame)?;
        if index >= self.available_maps.len() {
            return Err(VoteError::OutOfRange {
                index,
                len: self.available_maps.len(),
            });
        }
        if self.map_loaded() {
            return Err(VoteError::SelectionDone);
        }
        participant.set_vote(index);
        debug!("{} voted for map {} in game {}", participant.name(), index, self.id);
        Ok(())
    }

    /// Selects the map by vote, copies it to the working directory and opens
    /// the match world over the copy.
    pub fn load_map(&self, tx: &mut Tx<'_>) -> Result<(), MapError> {
        if !self.valid_tx(tx) {
            return Err(MapError::InvalidContext);
        }
        if self.map_loaded() {
            error!("Game {}: map already loaded", self.id);
            return Err(MapError::AlreadyLoaded);
        }
        if self.map_failed() {
            return Err(MapError::LoadFailed);
        }

        let present: &Tx<'_> = tx;
        let votes: Vec<usize> = self
            .participants()
            .iter()
            .filter(|par| par.player(present).is_some())
            .filter_map(|par| par.take_vote())
            .collect();
        let counts = tally(votes, self.available_maps.len());
        let index = select_map(&counts, &mut rand::thread_rng()).ok_or(MapError::NoMaps)?;
        let map = Arc::clone(&self.available_maps[index]);
        info!("Game {}: selected map {}", self.id, map.name());

        let world = match self.open_match_world(&map) {
            Ok(world) => world,
            Err(err) => {
                self.map_failed.store(true, Ordering::Release);
                return Err(err);
            }
        };
        world.handle(Arc::new(MatchWorldHandler::new(self.weak())));

        if let Err(arena) = self.arena.set(Arena {
            map: Arc::clone(&map),
            world,
        }) {
            let _ = arena.world.close();
            return Err(MapError::AlreadyLoaded);
        }

        if let Some(binding) = self.rules.game_binding() {
            binding.bind_game(self.weak());
        }
        self.rules.handle_map_ready(self, tx, &map);
        Ok(())
    }

    fn open_match_world(&self, map: &Map) -> Result<World, MapError> {
        map.copy_world_to(&self.work_dir).map_err(MapError::Copy)?;

        let world = World::open(WorldConfig {
            name: format!("{}-{}", map.name(), self.id),
            dir: Some(self.work_dir.clone()),
            generator: Generator::Nop,
            read_only: false,
            save_interval: MATCH_SAVE_INTERVAL,
            ..WorldConfig::default()
        })?;
        world.stop_time();
        world.set_time(MATCH_WORLD_TIME);
        world.stop_thundering();
        world.stop_raining();
        world.stop_weather_cycle();
        world.set_difficulty(Difficulty::Easy);
        Ok(world)
    }

    /// Moves every participant into the match world and starts playing.
    /// Selects the map first if the countdown has not done so yet.
    pub fn start(&self, tx: &mut Tx<'_>) -> Result<(), GameError> {
        if self.is_closed() {
            return Err(GameError::Closed);
        }
        if !self.valid_tx(tx) {
            return Err(GameError::InvalidContext);
        }
        let state = self.state();
        if !state.waiting() {
            return Err(GameError::UnexpectedState {
                expected: State::Waiting,
                actual: state,
            });
        }
        if !self.map_loaded() {
            self.load_map(tx)?;
        }
        let arena = self.arena.get().ok_or(MapError::LoadFailed)?;

        let mut moved = Vec::with_capacity(self.participants.len());
        for par in self.participants() {
            let Some(handle) = par.handle() else {
                continue;
            };
            let Some(player) = tx.player_mut(&handle) else {
                continue;
            };
            reset_player(player);
            if let Some(detached) = tx.remove_entity(&handle) {
                moved.push(detached);
            }
        }
        let count = moved.len();

        self.set_state(State::Playing);

        let game = self.weak();
        let _ = arena.world.exec(move |tx| {
            for handle in moved {
                if tx.add_entity(handle.clone()).is_none() {
                    debug!("Entity {} vanished on its way into the match", handle.id());
                }
            }
            if let Some(game) = game.upgrade() {
                game.rules.handle_start(&game, tx);
            }
        });

        info!(
            "Game {} started on {} with {} players",
            self.id,
            arena.map.name(),
            count
        );
        Ok(())
    }

    /// Ends the match. The game closes itself after the closing countdown.
    pub fn end(&self, tx: &mut Tx<'_>) -> Result<(), GameError> {
        if self.is_closed() {
            return Err(GameError::Closed);
        }
        if !self.valid_tx(tx) {
            return Err(GameError::InvalidContext);
        }
        let state = self.state();
        if !state.playing() {
            return Err(GameError::UnexpectedState {
                expected: State::Playing,
                actual: state,
            });
        }

        self.set_state(State::Finished);
        self.closing_in.store(CLOSING_COUNTDOWN, Ordering::Release);
        self.for_each_player(tx, |player, par| {
            give_finished_items(player, par.state().playing())
        });

        info!("Game {} finished", self.id);
        Ok(())
    }

    /// Sends every remaining player through play-again, deregisters the game
    /// and tears down the match world. Closing twice does nothing.
    pub fn close(&self, tx: &mut Tx<'_>) -> Result<(), GameError> {
        if self.is_closed() {
            return Ok(());
        }
        if !self.valid_tx(tx) {
            warn!("Game {}: expected transaction to be valid when closing", self.id);
            return Err(GameError::InvalidContext);
        }

        self.rules.handle_close(self, tx);

        let mut left = Vec::new();
        for par in self.participants() {
            let Some(handle) = par.handle() else {
                continue;
            };
            if !tx.contains(&handle) {
                continue;
            }
            match self.leave(tx, &handle) {
                Ok(outcome) => left.push((handle, outcome)),
                Err(err) => warn!("Game {}: {} could not leave: {}", self.id, par.name(), err),
            }
        }
        // Participants whose player was not around to leave.
        for entry in self.participants.iter() {
            entry.value().close();
        }
        self.participants.clear();

        self.set_state(State::Unknown);
        self.closed.store(true, Ordering::Release);

        if let Some(hook) = lock(&self.close_hook).take() {
            hook();
        }

        // The game no longer accepts joins, so a play-again hook looking for
        // a new game will not land in this one.
        for (handle, outcome) in left {
            self.run_play_again(tx, &handle, outcome);
        }

        // A failed load may have left a partial copy without a match world.
        let world = self.arena.get().map(|arena| arena.world.clone());
        let dir = self.work_dir.clone();
        let id = self.id;
        let _ = self.waiting_world.exec(move |_tx| {
            if let Some(world) = world {
                let _ = world.close();
            }
            if !dir.exists() {
                return;
            }
            if let Err(err) = fs::remove_dir_all(&dir) {
                error!(
                    "Game {}: failed to remove world directory {}: {}",
                    id,
                    dir.display(),
                    err
                );
            }
        });

        info!("Game {} closed", self.id);
        Ok(())
    }

    /// Turns a participant into a spectator. Spectators stay in the game but
    /// are skipped by the playing-only helpers.
    pub fn set_spectator(&self, tx: &mut Tx<'_>, handle: &EntityHandle) -> Result<(), GameError> {
        if self.is_closed() {
            return Err(GameError::Closed);
        }
        if !self.valid_tx(tx) {
            return Err(GameError::InvalidContext);
        }
        let xuid = tx
            .player(handle)
            .map(|p| p.xuid().to_string())
            .ok_or(GameError::InvalidContext)?;
        let participant = self.participant(&xuid).ok_or(GameError::NoParticipant)?;

        participant.set_state(ParticipantState::Spectating);
        if let Some(player) = tx.player_mut(handle) {
            give_spectator_items(player);
        }
        debug!("{} is now spectating game {}", participant.name(), self.id);
        Ok(())
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("participants", &self.participants.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Attaches a player that left a running match to the waiting world,
/// hidden from everyone there.
fn enter_waiting_world(tx: &mut Tx<'_>, handle: EntityHandle) {
    let spawn = tx.world().spawn();
    let Some(player) = tx.add_entity(handle.clone()) else {
        debug!("Entity {} is gone, not returning it to the lobby", handle.id());
        return;
    };
    player.teleport(spawn);

    for other in tx.handles() {
        if other != handle {
            tx.set_mutual_visibility(&handle, &other, false);
        }
    }
}

async fn run_ticker(game: Weak<Game>) {
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let Some(strong) = game.upgrade() else {
            break;
        };
        if strong.is_closed() {
            break;
        }
        let id = strong.id;
        let world = strong.world();
        let completion = world.exec(move |tx| strong.on_tick(tx));
        if completion.await.is_err() {
            debug!("Game {}: tick did not complete in {}", id, world.name());
        }
    }

    debug!("Tick driver stopped");
}
