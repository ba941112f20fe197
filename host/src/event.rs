//! Cancellable event contexts and the handler traits the host calls into.
//!
//! Every player or world action the host performs is first offered to the
//! installed handler together with an [`EventContext`]. A handler that
//! cancels the context stops the host from applying the action.

use crate::entity::{EntityHandle, EntityId, Vec3};
use crate::world::Tx;

/// Integer block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Default)]
pub struct EventContext {
    cancelled: bool,
}

impl EventContext {
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Actions performed by or on a player entity.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Move { to: Vec3 },
    Jump,
    Teleport { to: Vec3 },
    ToggleSprint { after: bool },
    ToggleSneak { after: bool },
    Chat { message: String },
    FoodLoss { from: i32, to: i32 },
    Heal { amount: f64 },
    Hurt { damage: f64 },
    Death,
    Respawn,
    SkinChange,
    FireExtinguish { pos: BlockPos },
    StartBreak { pos: BlockPos },
    BlockBreak { pos: BlockPos },
    BlockPlace { pos: BlockPos },
    BlockPick { pos: BlockPos },
    ItemUse,
    ItemUseOnBlock { pos: BlockPos },
    ItemUseOnEntity { target: EntityId },
    ItemRelease,
    ItemConsume,
    AttackEntity { target: EntityId },
    ExperienceGain { amount: i32 },
    PunchAir,
    HeldSlotChange { from: usize, to: usize },
    ItemDrop,
    CommandExecution { command: String },
}

/// Environment changes inside a world.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    LiquidFlow { from: BlockPos, into: BlockPos },
    LiquidDecay { pos: BlockPos },
    LiquidHarden { pos: BlockPos },
    Sound { at: Vec3 },
    FireSpread { from: BlockPos, to: BlockPos },
    BlockBurn { pos: BlockPos },
    CropTrample { pos: BlockPos },
    LeavesDecay { pos: BlockPos },
}

/// Receives events for a single player entity.
pub trait PlayerHandler: Send + Sync {
    fn handle_event(
        &self,
        _ctx: &mut EventContext,
        _tx: &mut Tx<'_>,
        _player: &EntityHandle,
        _event: &mut PlayerEvent,
    ) {
    }

    /// Called while the player is still present in `tx`, right before the
    /// host removes it for good.
    fn handle_quit(&self, _tx: &mut Tx<'_>, _player: &EntityHandle) {}
}

/// Receives events for one world.
pub trait WorldHandler: Send + Sync {
    fn handle_event(&self, _ctx: &mut EventContext, _event: &WorldEvent) {}

    fn handle_entity_spawn(&self, _tx: &mut Tx<'_>, _entity: EntityId) {}

    fn handle_entity_despawn(&self, _tx: &mut Tx<'_>, _entity: EntityId) {}

    fn handle_close(&self, _tx: &mut Tx<'_>) {}
}

/// Handler that accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopHandler;

impl PlayerHandler for NopHandler {}

impl WorldHandler for NopHandler {}
