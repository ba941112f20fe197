use clap::Parser;
use host::{EntityHandle, Tx, Vec3, World, WorldConfig};
use log::{error, info, warn};
use serde::Deserialize;
use server::{Factory, FactoryConfig, Game, GameConfig, GameEventHandler, Map, PlayAgainHook, Rules, SessionRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Directory with one sub-directory per map
    #[clap(long, default_value = "maps")]
    maps_dir: PathBuf,
    /// Directory the per-game world copies are created in
    #[clap(long, default_value = "game_worlds")]
    worlds_dir: PathBuf,
    #[clap(long, default_value = "2")]
    min_players: usize,
    #[clap(long, default_value = "8")]
    max_players: usize,
    /// Lobby countdown once enough players joined
    #[clap(long, default_value = "10")]
    waiting_secs: u64,
    /// Length of a match
    #[clap(long, default_value = "30")]
    match_secs: u64,
    /// Number of simulated players to connect
    #[clap(short, long, default_value = "4")]
    players: usize,
}

#[derive(Debug, Deserialize)]
struct MapConfig {
    spawn: Vec3,
}

/// Rules of the demo: everyone is teleported to the map's spawn and the
/// match ends after a fixed time.
struct TimedRules {
    min_players: usize,
    max_players: usize,
    waiting: Duration,
    match_ticks: u64,
    started_at: AtomicU64,
    spawn: Mutex<Option<Vec3>>,
}

impl Rules for TimedRules {
    fn max_players(&self) -> usize {
        self.max_players
    }

    fn min_players(&self) -> usize {
        self.min_players
    }

    fn waiting_duration(&self) -> Duration {
        self.waiting
    }

    fn handle_map_ready(&self, game: &Game, tx: &mut Tx<'_>, map: &Map) {
        match map.unmarshal_config::<MapConfig>() {
            Ok(config) => *self.spawn.lock().unwrap_or_else(|p| p.into_inner()) = Some(config.spawn),
            Err(err) => warn!("Map {} has an invalid config: {}", map.name(), err),
        }
        game.broadcast(tx, &format!("Playing on {}", map.name()));
    }

    fn handle_start(&self, game: &Game, tx: &mut Tx<'_>) {
        self.started_at.store(game.current_tick(), Ordering::Release);
        let spawn = *self.spawn.lock().unwrap_or_else(|p| p.into_inner());
        game.for_each_playing_player(tx, |player, _| {
            if let Some(spawn) = spawn {
                player.teleport(spawn);
            }
            player.message("Go!");
        });
    }

    fn handle_playing_tick(&self, game: &Game, tx: &mut Tx<'_>, current_tick: u64) {
        let started_at = self.started_at.load(Ordering::Acquire);
        if current_tick.saturating_sub(started_at) >= self.match_ticks {
            if let Err(err) = game.end(tx) {
                error!("Failed to end game {}: {}", game.id(), err);
            }
        }
    }
}

/// Writes a single playable map if the maps directory does not exist yet.
fn seed_demo_map(maps_dir: &Path) -> std::io::Result<()> {
    if maps_dir.exists() {
        return Ok(());
    }
    let map = maps_dir.join("plains");
    fs::create_dir_all(map.join("world").join("db"))?;
    fs::write(map.join("world").join("level.dat"), b"plains")?;
    fs::write(map.join("config.yml"), "spawn: {x: 0.5, y: 65.0, z: 0.5}\n")?;
    info!("Created demo map in {}", maps_dir.display());
    Ok(())
}

fn build_factory(args: &Args, lobby: &World, sessions: &Arc<SessionRegistry>) -> Arc<Factory> {
    let min_players = args.min_players;
    let max_players = args.max_players;
    let waiting = Duration::from_secs(args.waiting_secs);
    let match_ticks = args.match_secs * server::game::TICKS_PER_SECOND;
    let maps_dir = args.maps_dir.clone();
    let worlds_dir = args.worlds_dir.clone();
    let lobby = lobby.clone();
    let sessions = Arc::clone(sessions);

    Arc::new_cyclic(|factory: &Weak<Factory>| {
        let rejoin = factory.clone();
        let play_again: PlayAgainHook = Arc::new(move |tx: &mut Tx<'_>, handle: &EntityHandle| {
            let Some(factory) = rejoin.upgrade() else {
                return;
            };
            if let Err(err) = factory.join(tx, handle) {
                warn!("Could not place entity {} again: {}", handle.id(), err);
            }
        });

        Factory::new(FactoryConfig::new(move || {
            GameConfig {
                id: None,
                rules: Arc::new(TimedRules {
                    min_players,
                    max_players,
                    waiting,
                    match_ticks,
                    started_at: AtomicU64::new(0),
                    spawn: Mutex::new(None),
                }),
                maps_dir: maps_dir.clone(),
                worlds_dir: worlds_dir.clone(),
                waiting_world: lobby.clone(),
                sessions: Arc::clone(&sessions),
                player_handler: None,
                world_handler: None,
                play_again: Some(Arc::clone(&play_again)),
            }
            .new_game()
        }))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    seed_demo_map(&args.maps_dir)?;
    fs::create_dir_all(&args.worlds_dir)?;

    let lobby = World::new(WorldConfig {
        name: "lobby".to_string(),
        ..WorldConfig::default()
    });
    let sessions = Arc::new(SessionRegistry::new());
    let factory = build_factory(&args, &lobby, &sessions);

    for i in 0..args.players {
        let sessions = Arc::clone(&sessions);
        let factory = Arc::clone(&factory);
        let _ = lobby.exec(move |tx| {
            let handle = tx.spawn_player(format!("Player{}", i + 1), format!("{}", 2535400000000000u64 + i as u64));
            let handler = Arc::new(GameEventHandler::new(Arc::clone(&sessions)));
            let Some(player) = tx.player_mut(&handle) else {
                return;
            };
            player.handle(handler);
            sessions.connect(player, handle.clone());

            match factory.join(tx, &handle) {
                Ok(game) => info!("Player{} placed into game {}", i + 1, game.id()),
                Err(err) => error!("Player{} could not be placed: {}", i + 1, err),
            }
        });
    }

    let mut status = interval(Duration::from_secs(5));
    status.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Skip the first tick since it fires immediately
    status.tick().await;

    loop {
        tokio::select! {
            _ = status.tick() => {
                for game in factory.games() {
                    info!(
                        "Game {}: {} with {} players",
                        game.id(),
                        game.state(),
                        game.participant_len()
                    );
                }
                info!("{} games running, {} sessions", factory.len(), sessions.len());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down gracefully...");
                break;
            }
        }
    }

    Ok(())
}
