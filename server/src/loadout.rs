//! Lobby, finished and spectator item loadouts.
//!
//! Game items are tagged with the `gameItem` value so the event handler can
//! recognise them no matter which slot they end up in.

use host::{GameMode, ItemKind, ItemStack, Player};
use std::fmt;
use std::str::FromStr;

pub const GAME_ITEM_KEY: &str = "gameItem";

pub const LOBBY_VOTE_SLOT: usize = 0;
pub const PLAY_AGAIN_SLOT: usize = 0;
pub const TELEPORTER_SLOT: usize = 4;
pub const QUIT_SLOT: usize = 8;
pub const FINISHED_HELD_SLOT: usize = 1;

const MAX_HEALTH: f64 = 20.0;
const MAX_FOOD: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameItem {
    Quit,
    PlayAgain,
    Teleporter,
    VoteMap,
}

impl GameItem {
    pub fn key(self) -> &'static str {
        match self {
            GameItem::Quit => "quit",
            GameItem::PlayAgain => "playAgain",
            GameItem::Teleporter => "teleporter",
            GameItem::VoteMap => "voteMap",
        }
    }

    pub fn stack(self) -> ItemStack {
        let (kind, name) = match self {
            GameItem::Quit => (ItemKind::DragonBreath, "Quit"),
            GameItem::PlayAgain => (ItemKind::Paper, "Play Again"),
            GameItem::Teleporter => (ItemKind::Compass, "Teleporter"),
            GameItem::VoteMap => (ItemKind::Paper, "Vote Map"),
        };
        ItemStack::new(kind, 1)
            .with_custom_name(name)
            .with_value(GAME_ITEM_KEY, self.key())
    }

    /// Recognises a tagged game item.
    pub fn from_stack(stack: &ItemStack) -> Option<Self> {
        stack.value(GAME_ITEM_KEY)?.parse().ok()
    }
}

impl fmt::Display for GameItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for GameItem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quit" => Ok(GameItem::Quit),
            "playAgain" => Ok(GameItem::PlayAgain),
            "teleporter" => Ok(GameItem::Teleporter),
            "voteMap" => Ok(GameItem::VoteMap),
            other => Err(format!("unknown game item {other}")),
        }
    }
}

/// Clears everything a previous game may have left on the player.
pub fn reset_player(player: &mut Player) {
    player.inventory_mut().clear();
    player.armour_mut().clear();
    player.clear_effects();
    player.set_max_health(MAX_HEALTH);
    player.heal(MAX_HEALTH);
    player.set_food(MAX_FOOD);
    player.set_experience_level(0);
    player.set_experience_progress(0.0);
    player.set_scale(1.0);
}

pub fn give_lobby_items(player: &mut Player) {
    player.set_game_mode(GameMode::Adventure);
    set_items(player, &[(LOBBY_VOTE_SLOT, GameItem::VoteMap), (QUIT_SLOT, GameItem::Quit)]);
}

/// Items handed out when the match ends. Spectators keep their game mode.
pub fn give_finished_items(player: &mut Player, playing: bool) {
    if playing {
        player.set_game_mode(GameMode::Adventure);
    }
    reset_player(player);
    set_items(player, &[(PLAY_AGAIN_SLOT, GameItem::PlayAgain), (QUIT_SLOT, GameItem::Quit)]);
    hold(player, FINISHED_HELD_SLOT);
}

pub fn give_spectator_items(player: &mut Player) {
    player.set_game_mode(GameMode::Spectator);
    reset_player(player);
    set_items(
        player,
        &[
            (PLAY_AGAIN_SLOT, GameItem::PlayAgain),
            (TELEPORTER_SLOT, GameItem::Teleporter),
            (QUIT_SLOT, GameItem::Quit),
        ],
    );
    hold(player, FINISHED_HELD_SLOT);
}

fn set_items(player: &mut Player, items: &[(usize, GameItem)]) {
    for &(slot, item) in items {
        // Slots are constants well inside the inventory.
        let _ = player.inventory_mut().set_item(slot, item.stack());
    }
}

fn hold(player: &mut Player, slot: usize) {
    let _ = player.set_held_slot(slot);
}
