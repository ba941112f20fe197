//! Shared fixtures for the unit tests: a lobby world, on-disk maps and
//! counting rules.

use crate::config::{GameConfig, PlayAgainHook};
use crate::error::{JoinError, LeaveError};
use crate::game::{Game, LeaveOutcome};
use crate::handler::GameEventHandler;
use crate::map::{CONFIG_FILE_NAME, WORLD_DIR_NAME};
use crate::participant::Participant;
use crate::rules::{Admission, Rules};
use crate::session::SessionRegistry;
use host::{EntityHandle, Player, Tx, World, WorldConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

pub(crate) fn lobby() -> World {
    World::new(WorldConfig {
        name: "lobby".to_string(),
        ..WorldConfig::default()
    })
}

/// Runs `job` in `world` and returns its result.
pub(crate) async fn run<R, F>(world: &World, job: F) -> R
where
    F: FnOnce(&mut Tx<'_>) -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let _ = world.exec(move |tx| {
        let _ = sender.send(job(tx));
    });
    receiver.await.expect("world job did not complete")
}

/// Spawns a player named `name` with XUID `x-<name>`.
pub(crate) async fn spawn(world: &World, name: &str) -> EntityHandle {
    let name = name.to_string();
    let xuid = format!("x-{name}");
    run(world, move |tx| tx.spawn_player(name, xuid)).await
}

pub(crate) fn write_map(root: &Path, name: &str) {
    let world = root.join(name).join(WORLD_DIR_NAME);
    fs::create_dir_all(world.join("db")).unwrap();
    fs::write(world.join("level.dat"), name.as_bytes()).unwrap();
    fs::write(root.join(name).join(CONFIG_FILE_NAME), "{}\n").unwrap();
}

#[derive(Default)]
pub(crate) struct TestRules {
    min: usize,
    max: usize,
    waiting: Duration,
    denied: Mutex<Option<String>>,
    loads: AtomicUsize,
    joins: AtomicUsize,
    quits: AtomicUsize,
    starts: AtomicUsize,
    closes: AtomicUsize,
    map_ready: AtomicUsize,
}

impl TestRules {
    pub(crate) fn deny(&self, reason: &str) {
        *self.denied.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub(crate) fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn map_ready(&self) -> usize {
        self.map_ready.load(Ordering::SeqCst)
    }
}

impl Rules for TestRules {
    fn max_players(&self) -> usize {
        self.max
    }

    fn min_players(&self) -> usize {
        self.min
    }

    fn waiting_duration(&self) -> Duration {
        self.waiting
    }

    fn load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_start(&self, _game: &Game, _tx: &mut Tx<'_>) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_quit(&self, _game: &Game, _tx: &mut Tx<'_>, _participant: &Participant) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_join(&self, _game: &Game, _tx: &mut Tx<'_>, _participant: &Participant) {
        self.joins.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_close(&self, _game: &Game, _tx: &mut Tx<'_>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn handle_map_ready(&self, _game: &Game, _tx: &mut Tx<'_>, _map: &crate::map::Map) {
        self.map_ready.fetch_add(1, Ordering::SeqCst);
    }

    fn admission(&self) -> Option<&dyn Admission> {
        Some(self)
    }
}

impl Admission for TestRules {
    fn allow(&self, _player: &Player) -> Result<(), String> {
        match self.denied.lock().unwrap().clone() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// A lobby, two maps (`island`, `volcano`) and a session registry.
pub(crate) struct Fixture {
    maps: TempDir,
    worlds: TempDir,
    pub(crate) lobby: World,
    pub(crate) sessions: Arc<SessionRegistry>,
    pub(crate) rules: Arc<TestRules>,
    played_again: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    pub(crate) fn new(min: usize, max: usize) -> Self {
        Self::with_waiting(min, max, 60)
    }

    pub(crate) fn with_waiting(min: usize, max: usize, waiting_secs: u64) -> Self {
        let maps = tempfile::tempdir().unwrap();
        write_map(maps.path(), "volcano");
        write_map(maps.path(), "island");

        Self {
            maps,
            worlds: tempfile::tempdir().unwrap(),
            lobby: lobby(),
            sessions: Arc::new(SessionRegistry::new()),
            rules: Arc::new(TestRules {
                min,
                max,
                waiting: Duration::from_secs(waiting_secs),
                ..TestRules::default()
            }),
            played_again: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes copying every map fail on a dangling link inside its world.
    #[cfg(unix)]
    pub(crate) fn break_maps(&self) {
        for name in ["volcano", "island"] {
            let link = self.maps.path().join(name).join(WORLD_DIR_NAME).join("missing.dat");
            std::os::unix::fs::symlink(self.maps.path().join("nowhere"), link).unwrap();
        }
    }

    #[cfg(unix)]
    pub(crate) fn repair_maps(&self) {
        for name in ["volcano", "island"] {
            fs::remove_file(self.maps.path().join(name).join(WORLD_DIR_NAME).join("missing.dat")).unwrap();
        }
    }

    pub(crate) fn worlds_dir(&self) -> PathBuf {
        self.worlds.path().to_path_buf()
    }

    pub(crate) fn config(&self) -> GameConfig {
        let played_again = Arc::clone(&self.played_again);
        let hook: PlayAgainHook = Arc::new(move |tx: &mut Tx<'_>, handle: &EntityHandle| {
            if let Some(player) = tx.player(handle) {
                played_again.lock().unwrap().push(player.name().to_string());
            }
        });
        GameConfig {
            id: None,
            rules: self.rules.clone(),
            maps_dir: self.maps.path().to_path_buf(),
            worlds_dir: self.worlds_dir(),
            waiting_world: self.lobby.clone(),
            sessions: Arc::clone(&self.sessions),
            player_handler: None,
            world_handler: None,
            play_again: Some(hook),
        }
    }

    pub(crate) fn game(&self) -> Arc<Game> {
        Game::load(self.config()).unwrap()
    }

    /// Spawns a player in the lobby with a session and the game event
    /// handler installed.
    pub(crate) async fn connect(&self, name: &str) -> EntityHandle {
        let handle = spawn(&self.lobby, name).await;
        let sessions = Arc::clone(&self.sessions);
        let h = handle.clone();
        run(&self.lobby, move |tx| {
            let handler = Arc::new(GameEventHandler::new(Arc::clone(&sessions)));
            tx.player_mut(&h).unwrap().handle(handler);
            let player = tx.player(&h).unwrap();
            sessions.connect(player, h.clone());
        })
        .await;
        handle
    }

    pub(crate) async fn join(&self, game: &Arc<Game>, handle: &EntityHandle) -> Result<(), JoinError> {
        let (g, h) = (Arc::clone(game), handle.clone());
        run(&self.lobby, move |tx| g.join(tx, &h)).await
    }

    pub(crate) async fn leave(&self, game: &Arc<Game>, handle: &EntityHandle) -> Result<LeaveOutcome, LeaveError> {
        let (g, h) = (Arc::clone(game), handle.clone());
        run(&game.world(), move |tx| g.leave(tx, &h)).await
    }

    pub(crate) async fn close(&self, game: &Arc<Game>) {
        let g = Arc::clone(game);
        run(&game.world(), move |tx| g.close(tx)).await.unwrap();
    }

    pub(crate) fn played_again(&self) -> Vec<String> {
        self.played_again.lock().unwrap().clone()
    }
}
