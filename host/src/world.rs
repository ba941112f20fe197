//! Worlds and their serialized execution contexts.
//!
//! Every world owns a single background task that drains a queue of jobs.
//! A job receives a [`Tx`] granting exclusive access to the world's entity
//! table for the duration of the job, so all mutation of world-visible state
//! is serialized per world without any further locking. Jobs from different
//! worlds run independently.
//!
//! Moving a player between worlds is a two-step handoff: the entity is
//! removed under one world's `Tx` (its handle then owns the player data and
//! reports [`Location::InTransit`]) and later added by a job running in the
//! other world.

use crate::entity::{EntityHandle, EntityId, Location, Player, Vec3};
use crate::event::{EventContext, PlayerEvent, WorldEvent, WorldHandler};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub type WorldId = u64;

/// Resolves once a scheduled job has run to completion. Resolves to an
/// error if the job panicked or the world closed before running it.
pub type Completion = oneshot::Receiver<()>;

type Job = Box<dyn FnOnce(&mut Tx<'_>) + Send>;

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Peaceful,
    Easy,
    #[default]
    Normal,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Generator {
    #[default]
    Flat,
    /// Generates nothing; only stored chunks exist.
    Nop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub name: String,
    /// Directory holding the world snapshot. `None` keeps the world in memory.
    pub dir: Option<PathBuf>,
    pub spawn: Vec3,
    pub generator: Generator,
    pub read_only: bool,
    pub save_interval: Duration,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_string(),
            dir: None,
            spawn: Vec3::new(0.5, 64.0, 0.5),
            generator: Generator::default(),
            read_only: false,
            save_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Environment parameters that may be changed while the world runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    pub time: i64,
    pub time_cycle: bool,
    pub raining: bool,
    pub thundering: bool,
    pub weather_cycle: bool,
    pub difficulty: Difficulty,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            time: 0,
            time_cycle: true,
            raining: false,
            thundering: false,
            weather_cycle: true,
            difficulty: Difficulty::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world directory {0} does not exist or is not a directory")]
    MissingDirectory(PathBuf),
    #[error("world config has no directory to open")]
    NoDirectory,
}

enum Message {
    Exec(Job, oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

struct WorldCore {
    id: WorldId,
    config: WorldConfig,
    settings: Mutex<WorldSettings>,
    handler: Mutex<Option<Arc<dyn WorldHandler>>>,
    closed: AtomicBool,
}

/// Shared reference to a running world. Clones refer to the same world and
/// compare equal.
#[derive(Clone)]
pub struct World {
    core: Arc<WorldCore>,
    jobs: mpsc::UnboundedSender<Message>,
}

impl World {
    /// Starts an in-memory world. Must be called from within a tokio runtime.
    ///
    /// The world keeps running until [`World::close`] is called.
    pub fn new(config: WorldConfig) -> Self {
        let (jobs, receiver) = mpsc::unbounded_channel();
        let world = World {
            core: Arc::new(WorldCore {
                id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
                config,
                settings: Mutex::new(WorldSettings::default()),
                handler: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
            jobs,
        };
        info!("World {} ({}) started", world.name(), world.id());
        tokio::spawn(run_world(world.clone(), receiver));
        world
    }

    /// Starts a world over an existing on-disk snapshot directory.
    pub fn open(config: WorldConfig) -> Result<Self, WorldError> {
        let dir = config.dir.as_deref().ok_or(WorldError::NoDirectory)?;
        if !dir.is_dir() {
            return Err(WorldError::MissingDirectory(dir.to_path_buf()));
        }
        Ok(Self::new(config))
    }

    pub fn id(&self) -> WorldId {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    pub fn spawn(&self) -> Vec3 {
        self.core.config.spawn
    }

    pub fn config(&self) -> &WorldConfig {
        &self.core.config
    }

    pub fn settings(&self) -> WorldSettings {
        *self.settings_mut()
    }

    pub fn set_time(&self, time: i64) {
        self.settings_mut().time = time;
    }

    pub fn stop_time(&self) {
        self.settings_mut().time_cycle = false;
    }

    pub fn stop_raining(&self) {
        self.settings_mut().raining = false;
    }

    pub fn stop_thundering(&self) {
        self.settings_mut().thundering = false;
    }

    pub fn stop_weather_cycle(&self) {
        self.settings_mut().weather_cycle = false;
    }

    pub fn set_difficulty(&self, difficulty: Difficulty) {
        self.settings_mut().difficulty = difficulty;
    }

    /// Installs the handler that receives this world's events.
    pub fn handle(&self, handler: Arc<dyn WorldHandler>) {
        *lock(&self.core.handler) = Some(handler);
    }

    fn handler(&self) -> Option<Arc<dyn WorldHandler>> {
        lock(&self.core.handler).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::Acquire)
    }

    /// Queues `job` to run with exclusive access to this world.
    pub fn exec<F>(&self, job: F) -> Completion
    where
        F: FnOnce(&mut Tx<'_>) + Send + 'static,
    {
        let (done, completion) = oneshot::channel();
        if self.jobs.send(Message::Exec(Box::new(job), done)).is_err() {
            debug!("World {} is closed, dropping job", self.name());
        }
        completion
    }

    /// Stops the world after the jobs already queued have run. Entities
    /// still inside are closed.
    pub fn close(&self) -> Completion {
        let (done, completion) = oneshot::channel();
        if !self.core.closed.swap(true, Ordering::AcqRel) {
            let _ = self.jobs.send(Message::Close(done));
        }
        completion
    }

    fn settings_mut(&self) -> MutexGuard<'_, WorldSettings> {
        lock(&self.core.settings)
    }
}

impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for World {}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.core.id)
            .field("name", &self.core.config.name)
            .finish_non_exhaustive()
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Entry {
    handle: EntityHandle,
    player: Player,
}

#[derive(Default)]
struct WorldState {
    entities: BTreeMap<EntityId, Entry>,
}

async fn run_world(world: World, mut jobs: mpsc::UnboundedReceiver<Message>) {
    let mut state = WorldState::default();

    while let Some(message) = jobs.recv().await {
        match message {
            Message::Exec(job, done) => {
                let mut tx = Tx {
                    world: &world,
                    state: &mut state,
                };
                match panic::catch_unwind(AssertUnwindSafe(|| job(&mut tx))) {
                    Ok(()) => {
                        let _ = done.send(());
                    }
                    Err(payload) => {
                        error!(
                            "World {}: job panicked: {}",
                            world.name(),
                            panic_message(payload.as_ref())
                        );
                    }
                }
            }
            Message::Close(done) => {
                let mut tx = Tx {
                    world: &world,
                    state: &mut state,
                };
                if let Some(handler) = world.handler() {
                    handler.handle_close(&mut tx);
                }
                for entry in state.entities.values() {
                    entry.handle.close();
                }
                state.entities.clear();

                jobs.close();
                while jobs.try_recv().is_ok() {}

                info!("World {} ({}) closed", world.name(), world.id());
                let _ = done.send(());
                break;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Exclusive access to one world for the duration of a job.
pub struct Tx<'a> {
    world: &'a World,
    state: &'a mut WorldState,
}

impl<'a> Tx<'a> {
    /// The world this context belongs to.
    pub fn world(&self) -> &World {
        self.world
    }

    /// Creates a new player entity at the world spawn.
    pub fn spawn_player(&mut self, name: impl Into<String>, xuid: impl Into<String>) -> EntityHandle {
        let id = EntityHandle::next_id();
        let player = Player::new(id, name.into(), xuid.into(), self.world.spawn());
        let handle = EntityHandle::in_world(id, self.world.id());
        debug!("Spawned {} in world {}", player.name(), self.world.name());
        self.state.entities.insert(
            id,
            Entry {
                handle: handle.clone(),
                player,
            },
        );
        if let Some(handler) = self.world.handler() {
            handler.handle_entity_spawn(self, id);
        }
        handle
    }

    pub fn player(&self, handle: &EntityHandle) -> Option<&Player> {
        self.state.entities.get(&handle.id()).map(|e| &e.player)
    }

    pub fn player_mut(&mut self, handle: &EntityHandle) -> Option<&mut Player> {
        self.state.entities.get_mut(&handle.id()).map(|e| &mut e.player)
    }

    pub fn contains(&self, handle: &EntityHandle) -> bool {
        self.state.entities.contains_key(&handle.id())
    }

    /// Handles of every entity currently in this world.
    pub fn handles(&self) -> Vec<EntityHandle> {
        self.state
            .entities
            .values()
            .map(|e| e.handle.clone())
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.state.entities.len()
    }

    /// Attaches a handle that is in transit to this world.
    ///
    /// Returns `None` if the handle is not in transit: it is still owned by
    /// another world, was already attached, or was closed meanwhile.
    pub fn add_entity(&mut self, handle: EntityHandle) -> Option<&mut Player> {
        let id = handle.id();
        let player = handle.attach(self.world.id())?;
        debug!("Added {} to world {}", player.name(), self.world.name());
        self.state.entities.insert(id, Entry { handle, player });
        if let Some(handler) = self.world.handler() {
            handler.handle_entity_spawn(self, id);
        }
        self.player_mut_by_id(id)
    }

    /// Detaches the entity from this world. The returned handle is in
    /// transit and owns the player data until another world adds it.
    pub fn remove_entity(&mut self, handle: &EntityHandle) -> Option<EntityHandle> {
        let id = handle.id();
        if !self.state.entities.contains_key(&id) {
            return None;
        }
        if let Some(handler) = self.world.handler() {
            handler.handle_entity_despawn(self, id);
        }
        let entry = self.state.entities.remove(&id)?;
        debug!(
            "Removed {} from world {}",
            entry.player.name(),
            self.world.name()
        );
        entry.handle.detach(entry.player);
        debug_assert_eq!(entry.handle.location(), Location::InTransit);
        Some(entry.handle)
    }

    /// Shows or hides two entities from each other.
    pub fn set_mutual_visibility(&mut self, a: &EntityHandle, b: &EntityHandle, visible: bool) {
        if a == b {
            return;
        }
        if let Some(player) = self.player_mut(a) {
            if visible {
                player.show_entity(b.id());
            } else {
                player.hide_entity(b.id());
            }
        }
        if let Some(player) = self.player_mut(b) {
            if visible {
                player.show_entity(a.id());
            } else {
                player.hide_entity(a.id());
            }
        }
    }

    /// Offers `event` to the player's handler. Returns true if the action
    /// may proceed.
    pub fn player_event(&mut self, handle: &EntityHandle, mut event: PlayerEvent) -> bool {
        let Some(handler) = self.player(handle).and_then(Player::handler) else {
            return self.contains(handle);
        };
        let mut ctx = EventContext::default();
        handler.handle_event(&mut ctx, self, handle, &mut event);
        !ctx.cancelled()
    }

    /// Offers `event` to the world handler. Returns true if the change may
    /// proceed.
    pub fn world_event(&mut self, event: WorldEvent) -> bool {
        let mut ctx = EventContext::default();
        if let Some(handler) = self.world.handler() {
            handler.handle_event(&mut ctx, &event);
        }
        !ctx.cancelled()
    }

    /// Runs the player's quit handler, then removes the entity and closes
    /// its handle.
    pub fn disconnect(&mut self, handle: &EntityHandle) {
        if let Some(handler) = self.player(handle).and_then(Player::handler) {
            handler.handle_quit(self, handle);
        }
        if self.contains(handle) {
            if let Some(handler) = self.world.handler() {
                handler.handle_entity_despawn(self, handle.id());
            }
            self.state.entities.remove(&handle.id());
        }
        handle.close();
        debug!("Entity {} disconnected", handle.id());
    }

    fn player_mut_by_id(&mut self, id: EntityId) -> Option<&mut Player> {
        self.state.entities.get_mut(&id).map(|e| &mut e.player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{NopHandler, PlayerHandler};
    use std::sync::atomic::AtomicUsize;
    use tokio_test::{assert_err, assert_ok};

    fn world(name: &str) -> World {
        World::new(WorldConfig {
            name: name.to_string(),
            ..WorldConfig::default()
        })
    }

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let w = world("order");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            let _ = w.exec(move |_tx| seen.lock().unwrap().push(i));
        }
        assert_ok!(w.exec(|_tx| {}).await);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let w = world("panics");

        let failed = w.exec(|_tx| panic!("boom"));
        assert_err!(failed.await);

        // The world keeps serving jobs.
        let handle = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&handle);
        assert_ok!(
            w.exec(move |tx| {
                *slot.lock().unwrap() = Some(tx.spawn_player("alice", "x-alice"));
            })
            .await
        );
        assert!(handle.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_exec_after_close_fails() {
        let w = world("closing");
        assert_ok!(w.close().await);
        assert!(w.is_closed());
        assert_err!(w.exec(|_tx| {}).await);
    }

    #[tokio::test]
    async fn test_close_closes_remaining_entities() {
        let w = world("occupied");
        let (sender, receiver) = oneshot::channel();
        let _ = w.exec(move |tx| {
            let _ = sender.send(tx.spawn_player("bob", "x-bob"));
        });
        let handle = receiver.await.unwrap();
        assert_eq!(handle.location(), Location::InWorld(w.id()));

        assert_ok!(w.close().await);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_entity_handoff_between_worlds() {
        let lobby = world("lobby");
        let arena = world("arena");

        let (sender, receiver) = oneshot::channel();
        let _ = lobby.exec(move |tx| {
            let handle = tx.spawn_player("carol", "x-carol");
            let detached = tx.remove_entity(&handle).unwrap();
            assert!(!tx.contains(&handle));
            let _ = sender.send(detached);
        });
        let handle = receiver.await.unwrap();
        assert_eq!(handle.location(), Location::InTransit);

        let moved = handle.clone();
        assert_ok!(
            arena
                .exec(move |tx| {
                    let player = tx.add_entity(moved).unwrap();
                    assert_eq!(player.name(), "carol");
                })
                .await
        );
        assert_eq!(handle.location(), Location::InWorld(arena.id()));

        // A second attach elsewhere is refused.
        let again = handle.clone();
        assert_ok!(lobby.exec(move |tx| assert!(tx.add_entity(again).is_none())).await);
    }

    #[tokio::test]
    async fn test_mutual_visibility() {
        let w = world("visibility");
        assert_ok!(
            w.exec(|tx| {
                let a = tx.spawn_player("a", "x-a");
                let b = tx.spawn_player("b", "x-b");
                tx.set_mutual_visibility(&a, &b, false);
                assert!(!tx.player(&a).unwrap().can_see(b.id()));
                assert!(!tx.player(&b).unwrap().can_see(a.id()));
                tx.set_mutual_visibility(&a, &b, true);
                assert!(tx.player(&a).unwrap().can_see(b.id()));
            })
            .await
        );
    }

    struct CancelFire;

    impl WorldHandler for CancelFire {
        fn handle_event(&self, ctx: &mut EventContext, event: &WorldEvent) {
            if matches!(event, WorldEvent::FireSpread { .. }) {
                ctx.cancel();
            }
        }
    }

    #[tokio::test]
    async fn test_world_events_reach_handler() {
        let w = world("events");
        w.handle(Arc::new(CancelFire));
        assert_ok!(
            w.exec(|tx| {
                let pos = crate::event::BlockPos::new(1, 2, 3);
                assert!(!tx.world_event(WorldEvent::FireSpread { from: pos, to: pos }));
                assert!(tx.world_event(WorldEvent::BlockBurn { pos }));
            })
            .await
        );
    }

    #[derive(Default)]
    struct CountingHandler {
        events: AtomicUsize,
        quits: AtomicUsize,
    }

    impl PlayerHandler for CountingHandler {
        fn handle_event(
            &self,
            ctx: &mut EventContext,
            _tx: &mut Tx<'_>,
            _player: &EntityHandle,
            event: &mut PlayerEvent,
        ) {
            self.events.fetch_add(1, Ordering::SeqCst);
            if matches!(event, PlayerEvent::Hurt { .. }) {
                ctx.cancel();
            }
        }

        fn handle_quit(&self, tx: &mut Tx<'_>, player: &EntityHandle) {
            assert!(tx.contains(player));
            self.quits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_player_events_and_disconnect() {
        let w = world("players");
        let counter = Arc::new(CountingHandler::default());
        let handler: Arc<dyn PlayerHandler> = counter.clone();

        assert_ok!(
            w.exec(move |tx| {
                let handle = tx.spawn_player("dave", "x-dave");
                tx.player_mut(&handle).unwrap().handle(handler);

                assert!(!tx.player_event(&handle, PlayerEvent::Hurt { damage: 2.0 }));
                assert!(tx.player_event(&handle, PlayerEvent::Jump));

                tx.disconnect(&handle);
                assert!(!tx.contains(&handle));
                assert!(handle.is_closed());
            })
            .await
        );

        assert_eq!(counter.events.load(Ordering::SeqCst), 2);
        assert_eq!(counter.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_requires_directory() {
        let missing = World::open(WorldConfig {
            dir: Some(PathBuf::from("/definitely/not/here")),
            ..WorldConfig::default()
        });
        assert!(matches!(missing, Err(WorldError::MissingDirectory(_))));

        let none = World::open(WorldConfig::default());
        assert!(matches!(none, Err(WorldError::NoDirectory)));
    }

    #[tokio::test]
    async fn test_settings_updates() {
        let w = world("settings");
        w.handle(Arc::new(NopHandler));
        w.stop_time();
        w.set_time(3000);
        w.stop_weather_cycle();
        w.set_difficulty(Difficulty::Easy);

        let settings = w.settings();
        assert_eq!(settings.time, 3000);
        assert!(!settings.time_cycle);
        assert!(!settings.weather_cycle);
        assert_eq!(settings.difficulty, Difficulty::Easy);
    }
}
