//! Event handling between the host and running games.
//!
//! [`GameEventHandler`] is installed on every connected player and
//! [`MatchWorldHandler`] on every match world. Both drop events that make no
//! sense in the game's current state, take care of the game items, and pass
//! whatever remains to the handlers configured on the game.

use crate::forms::{send_teleporter_menu, send_vote_map_menu};
use crate::game::Game;
use crate::loadout::GameItem;
use crate::session::SessionRegistry;
use host::{EntityHandle, EntityId, EventContext, Player, PlayerEvent, PlayerHandler, Tx, WorldEvent, WorldHandler};
use log::debug;
use std::sync::{Arc, Weak};

/// Game-aware player event handler, configured per game.
pub trait GamePlayerHandler: Send + Sync + 'static {
    fn handle_event(
        &self,
        _game: &Game,
        _ctx: &mut EventContext,
        _tx: &mut Tx<'_>,
        _player: &EntityHandle,
        _event: &mut PlayerEvent,
    ) {
    }
}

/// Game-aware world event handler, configured per game.
pub trait GameWorldHandler: Send + Sync + 'static {
    fn handle_event(&self, _game: &Game, _ctx: &mut EventContext, _event: &WorldEvent) {}

    fn handle_entity_spawn(&self, _game: &Game, _tx: &mut Tx<'_>, _entity: EntityId) {}

    fn handle_entity_despawn(&self, _game: &Game, _tx: &mut Tx<'_>, _entity: EntityId) {}

    fn handle_close(&self, _game: &Game, _tx: &mut Tx<'_>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NopGameHandler;

impl GamePlayerHandler for NopGameHandler {}

impl GameWorldHandler for NopGameHandler {}

/// Actions only allowed while the match is being played.
fn playing_only(event: &PlayerEvent) -> bool {
    matches!(
        event,
        PlayerEvent::FoodLoss { .. }
            | PlayerEvent::Hurt { .. }
            | PlayerEvent::FireExtinguish { .. }
            | PlayerEvent::StartBreak { .. }
            | PlayerEvent::BlockBreak { .. }
            | PlayerEvent::BlockPlace { .. }
            | PlayerEvent::BlockPick { .. }
            | PlayerEvent::ItemUseOnBlock { .. }
            | PlayerEvent::ItemUseOnEntity { .. }
            | PlayerEvent::ItemRelease
            | PlayerEvent::ItemConsume
            | PlayerEvent::AttackEntity { .. }
            | PlayerEvent::ExperienceGain { .. }
            | PlayerEvent::ItemDrop
    )
}

/// Host player handler routing events to the game the player's session is
/// bound to.
pub struct GameEventHandler {
    sessions: Arc<SessionRegistry>,
}

impl GameEventHandler {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }

    /// The player's game, if the player is in the world that game expects.
    fn game(&self, tx: &Tx<'_>, handle: &EntityHandle) -> Option<Arc<Game>> {
        let player = tx.player(handle)?;
        let game = self.sessions.get(player.xuid())?.game()?;
        game.valid_tx(tx).then_some(game)
    }

    fn use_game_item(&self, game: &Game, tx: &mut Tx<'_>, handle: &EntityHandle, item: GameItem) {
        match item {
            GameItem::VoteMap => send_vote_map_menu(game, tx, handle),
            GameItem::Teleporter => send_teleporter_menu(game, tx, handle),
            GameItem::Quit => {
                if let Err(err) = game.leave(tx, handle) {
                    debug!("Quit item ignored: {}", err);
                }
            }
            GameItem::PlayAgain => {
                if let Err(err) = game.play_again(tx, handle) {
                    debug!("Play again item ignored: {}", err);
                }
            }
        }
    }
}

impl PlayerHandler for GameEventHandler {
    fn handle_event(
        &self,
        ctx: &mut EventContext,
        tx: &mut Tx<'_>,
        player: &EntityHandle,
        event: &mut PlayerEvent,
    ) {
        if matches!(event, PlayerEvent::SkinChange) {
            ctx.cancel();
            return;
        }
        let Some(game) = self.game(tx, player) else {
            return;
        };
        if playing_only(event) && !game.state().playing() {
            ctx.cancel();
            return;
        }
        if matches!(event, PlayerEvent::ItemUse) {
            let item = tx
                .player(player)
                .and_then(Player::held_item)
                .and_then(GameItem::from_stack);
            if let Some(item) = item {
                ctx.cancel();
                self.use_game_item(&game, tx, player, item);
                return;
            }
        }

        game.player_handler()
            .handle_event(&game, ctx, tx, player, event);
    }

    fn handle_quit(&self, tx: &mut Tx<'_>, player: &EntityHandle) {
        let xuid = tx.player(player).map(|p| p.xuid().to_string());
        if let Some(game) = self.game(tx, player) {
            if let Err(err) = game.leave(tx, player) {
                debug!("Leaving game {} on quit failed: {}", game.id(), err);
            }
        }
        if let Some(xuid) = xuid {
            self.sessions.disconnect(&xuid);
        }
    }
}

/// Installed on each match world.
pub struct MatchWorldHandler {
    game: Weak<Game>,
}

impl MatchWorldHandler {
    pub fn new(game: Weak<Game>) -> Self {
        Self { game }
    }
}

impl WorldHandler for MatchWorldHandler {
    fn handle_event(&self, ctx: &mut EventContext, event: &WorldEvent) {
        if matches!(event, WorldEvent::LeavesDecay { .. }) {
            ctx.cancel();
        }
        let Some(game) = self.game.upgrade() else {
            return;
        };
        let playing_only = matches!(
            event,
            WorldEvent::LiquidFlow { .. }
                | WorldEvent::LiquidDecay { .. }
                | WorldEvent::LiquidHarden { .. }
                | WorldEvent::FireSpread { .. }
                | WorldEvent::BlockBurn { .. }
                | WorldEvent::CropTrample { .. }
        );
        if playing_only && !game.state().playing() {
            ctx.cancel();
            return;
        }
        game.world_handler().handle_event(&game, ctx, event);
    }

    fn handle_entity_spawn(&self, tx: &mut Tx<'_>, entity: EntityId) {
        if let Some(game) = self.game.upgrade() {
            game.world_handler().handle_entity_spawn(&game, tx, entity);
        }
    }

    fn handle_entity_despawn(&self, tx: &mut Tx<'_>, entity: EntityId) {
        if let Some(game) = self.game.upgrade() {
            game.world_handler()
                .handle_entity_despawn(&game, tx, entity);
        }
    }

    fn handle_close(&self, tx: &mut Tx<'_>) {
        if let Some(game) = self.game.upgrade() {
            game.world_handler().handle_close(&game, tx);
        }
    }
}
