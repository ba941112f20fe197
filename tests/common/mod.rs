//! Harness shared by the integration tests: a lobby world, two maps on disk
//! and a factory whose games send players back into matchmaking.

#![allow(dead_code)]

use host::{EntityHandle, Location, Tx, World, WorldConfig};
use server::map::{CONFIG_FILE_NAME, WORLD_DIR_NAME};
use server::{Factory, FactoryConfig, Game, GameConfig, GameEventHandler, PlayAgainHook, Rules, SessionRegistry};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

pub struct FixedRules {
    pub min: usize,
    pub max: usize,
    pub waiting: Duration,
}

impl Rules for FixedRules {
    fn max_players(&self) -> usize {
        self.max
    }

    fn min_players(&self) -> usize {
        self.min
    }

    fn waiting_duration(&self) -> Duration {
        self.waiting
    }
}

/// Runs `job` in `world` and hands back what it returned.
pub async fn run<R, F>(world: &World, job: F) -> R
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

fn write_map(root: &Path, name: &str) {
    let world = root.join(name).join(WORLD_DIR_NAME);
    fs::create_dir_all(world.join("db")).unwrap();
    fs::write(world.join("level.dat"), name.as_bytes()).unwrap();
    fs::write(root.join(name).join(CONFIG_FILE_NAME), "{}\n").unwrap();
}

pub struct Harness {
    _maps: TempDir,
    _worlds: TempDir,
    pub lobby: World,
    pub sessions: Arc<SessionRegistry>,
    pub factory: Arc<Factory>,
}

impl Harness {
    /// Players are not placed into a new game after a match.
    pub fn new(min: usize, max: usize, waiting_secs: u64) -> Self {
        Self::build(min, max, waiting_secs, false)
    }

    /// Finished players are put back into matchmaking.
    pub fn with_play_again(min: usize, max: usize, waiting_secs: u64) -> Self {
        Self::build(min, max, waiting_secs, true)
    }

    fn build(min: usize, max: usize, waiting_secs: u64, play_again: bool) -> Self {
        let maps = tempfile::tempdir().unwrap();
        write_map(maps.path(), "volcano");
        write_map(maps.path(), "island");
        let worlds = tempfile::tempdir().unwrap();
        let lobby = World::new(WorldConfig {
            name: "lobby".to_string(),
            ..WorldConfig::default()
        });
        let sessions = Arc::new(SessionRegistry::new());

        let config = GameConfig {
            id: None,
            rules: Arc::new(FixedRules {
                min,
                max,
                waiting: Duration::from_secs(waiting_secs),
            }),
            maps_dir: maps.path().to_path_buf(),
            worlds_dir: worlds.path().to_path_buf(),
            waiting_world: lobby.clone(),
            sessions: Arc::clone(&sessions),
            player_handler: None,
            world_handler: None,
            play_again: None,
        };
        let factory = Arc::new_cyclic(|factory: &Weak<Factory>| {
            let mut config = config;
            if play_again {
                let factory = factory.clone();
                let hook: PlayAgainHook = Arc::new(move |tx: &mut Tx<'_>, handle: &EntityHandle| {
                    if let Some(factory) = factory.upgrade() {
                        let _ = factory.join(tx, handle);
                    }
                });
                config.play_again = Some(hook);
            }
            Factory::new(FactoryConfig::new(move || config.clone().new_game()))
        });

        Self {
            _maps: maps,
            _worlds: worlds,
            lobby,
            sessions,
            factory,
        }
    }

    /// Spawns a player in the lobby the way a login would: event handler
    /// installed and a session registered.
    pub async fn connect(&self, name: &str) -> EntityHandle {
        let sessions = Arc::clone(&self.sessions);
        let name = name.to_string();
        run(&self.lobby, move |tx| {
            let handle = tx.spawn_player(name.clone(), format!("x-{name}"));
            let player = tx.player_mut(&handle).unwrap();
            player.handle(Arc::new(GameEventHandler::new(Arc::clone(&sessions))));
            sessions.connect(player, handle.clone());
            handle
        })
        .await
    }

    pub async fn matchmake(&self, handle: &EntityHandle) -> Arc<Game> {
        let (factory, handle) = (Arc::clone(&self.factory), handle.clone());
        run(&self.lobby, move |tx| factory.join(tx, &handle))
            .await
            .unwrap()
    }

    pub fn in_lobby(&self, handle: &EntityHandle) -> bool {
        handle.location() == Location::InWorld(self.lobby.id())
    }

    pub fn game_of(&self, name: &str) -> Option<Arc<Game>> {
        self.sessions.get(&format!("x-{name}"))?.game()
    }
}
