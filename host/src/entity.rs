//! Player entities and the context-independent handles that refer to them.
//!
//! A [`Player`] value lives inside exactly one place at a time: the entity
//! table of a world, or its own [`EntityHandle`] while it is being moved
//! between worlds. Code outside a world only ever holds handles; the player
//! data itself is reachable through a [`Tx`](crate::world::Tx) of the world
//! that currently owns it.

use crate::event::PlayerHandler;
use crate::form::Menu;
use crate::item::{Inventory, InventoryError, ItemStack};
use crate::world::WorldId;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub type EntityId = u64;

pub const INVENTORY_SIZE: usize = 36;
pub const ARMOUR_SIZE: usize = 4;
pub const HOTBAR_SIZE: usize = 9;
pub const DEFAULT_MAX_HEALTH: f64 = 20.0;
pub const DEFAULT_FOOD: i32 = 20;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Survival,
    Adventure,
    Spectator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub name: String,
    pub level: u8,
}

/// Simulation state of one connected player.
pub struct Player {
    id: EntityId,
    name: String,
    xuid: String,
    position: Vec3,
    game_mode: GameMode,
    inventory: Inventory,
    armour: Inventory,
    held_slot: usize,
    health: f64,
    max_health: f64,
    food: i32,
    experience_level: i32,
    experience_progress: f64,
    scale: f64,
    effects: Vec<Effect>,
    hidden: HashSet<EntityId>,
    messages: Vec<String>,
    scoreboard: Vec<String>,
    forms: VecDeque<Menu>,
    handler: Option<Arc<dyn PlayerHandler>>,
}

impl Player {
    pub(crate) fn new(id: EntityId, name: String, xuid: String, position: Vec3) -> Self {
        Self {
            id,
            name,
            xuid,
            position,
            game_mode: GameMode::default(),
            inventory: Inventory::new(INVENTORY_SIZE),
            armour: Inventory::new(ARMOUR_SIZE),
            held_slot: 0,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            food: DEFAULT_FOOD,
            experience_level: 0,
            experience_progress: 0.0,
            scale: 1.0,
            effects: Vec::new(),
            hidden: HashSet::new(),
            messages: Vec::new(),
            scoreboard: Vec::new(),
            forms: VecDeque::new(),
            handler: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable account identifier of the player.
    pub fn xuid(&self) -> &str {
        &self.xuid
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn teleport(&mut self, to: Vec3) {
        self.position = to;
    }

    pub fn game_mode(&self) -> GameMode {
        self.game_mode
    }

    pub fn set_game_mode(&mut self, mode: GameMode) {
        self.game_mode = mode;
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    pub fn armour(&self) -> &Inventory {
        &self.armour
    }

    pub fn armour_mut(&mut self) -> &mut Inventory {
        &mut self.armour
    }

    pub fn held_slot(&self) -> usize {
        self.held_slot
    }

    pub fn set_held_slot(&mut self, slot: usize) -> Result<(), InventoryError> {
        if slot >= HOTBAR_SIZE {
            return Err(InventoryError::SlotOutOfRange {
                slot,
                size: HOTBAR_SIZE,
            });
        }
        self.held_slot = slot;
        Ok(())
    }

    pub fn held_item(&self) -> Option<&ItemStack> {
        self.inventory.item(self.held_slot)
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn max_health(&self) -> f64 {
        self.max_health
    }

    pub fn set_max_health(&mut self, max: f64) {
        self.max_health = max;
        self.health = self.health.min(max);
    }

    pub fn heal(&mut self, amount: f64) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn hurt(&mut self, damage: f64) {
        self.health = (self.health - damage).max(0.0);
    }

    pub fn food(&self) -> i32 {
        self.food
    }

    pub fn set_food(&mut self, food: i32) {
        self.food = food;
    }

    pub fn experience_level(&self) -> i32 {
        self.experience_level
    }

    pub fn set_experience_level(&mut self, level: i32) {
        self.experience_level = level;
    }

    pub fn experience_progress(&self) -> f64 {
        self.experience_progress
    }

    pub fn set_experience_progress(&mut self, progress: f64) {
        self.experience_progress = progress;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn add_effect(&mut self, effect: Effect) {
        self.effects.retain(|e| e.name != effect.name);
        self.effects.push(effect);
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    pub fn hide_entity(&mut self, other: EntityId) {
        self.hidden.insert(other);
    }

    pub fn show_entity(&mut self, other: EntityId) {
        self.hidden.remove(&other);
    }

    pub fn can_see(&self, other: EntityId) -> bool {
        !self.hidden.contains(&other)
    }

    pub fn message(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn set_scoreboard(&mut self, lines: Vec<String>) {
        self.scoreboard = lines;
    }

    pub fn scoreboard(&self) -> &[String] {
        &self.scoreboard
    }

    pub fn send_form(&mut self, menu: Menu) {
        self.forms.push_back(menu);
    }

    /// Removes the oldest unanswered menu.
    pub fn take_form(&mut self) -> Option<Menu> {
        self.forms.pop_front()
    }

    pub fn pending_forms(&self) -> usize {
        self.forms.len()
    }

    /// Installs the handler that receives this player's events.
    pub fn handle(&mut self, handler: Arc<dyn PlayerHandler>) {
        self.handler = Some(handler);
    }

    pub(crate) fn handler(&self) -> Option<Arc<dyn PlayerHandler>> {
        self.handler.clone()
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("xuid", &self.xuid)
            .field("position", &self.position)
            .field("game_mode", &self.game_mode)
            .finish_non_exhaustive()
    }
}

/// Where the entity behind a handle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    InWorld(WorldId),
    /// Detached from one world and not yet attached to another.
    InTransit,
    Closed,
}

enum Residence {
    InWorld(WorldId),
    InTransit(Box<Player>),
    Closed,
}

struct HandleInner {
    id: EntityId,
    residence: Mutex<Residence>,
}

/// Cloneable reference to a player entity that stays valid across worlds.
#[derive(Clone)]
pub struct EntityHandle {
    inner: Arc<HandleInner>,
}

impl EntityHandle {
    pub(crate) fn next_id() -> EntityId {
        NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn in_world(id: EntityId, world: WorldId) -> Self {
        Self::with_residence(id, Residence::InWorld(world))
    }

    fn with_residence(id: EntityId, residence: Residence) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                residence: Mutex::new(residence),
            }),
        }
    }

    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    pub fn location(&self) -> Location {
        match &*self.residence() {
            Residence::InWorld(world) => Location::InWorld(*world),
            Residence::InTransit(_) => Location::InTransit,
            Residence::Closed => Location::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.location() == Location::Closed
    }

    /// Drops any detached player data and makes the handle unusable.
    pub fn close(&self) {
        *self.residence() = Residence::Closed;
    }

    pub(crate) fn detach(&self, player: Player) {
        *self.residence() = Residence::InTransit(Box::new(player));
    }

    /// Takes the detached player out of the handle, recording `world` as
    /// its new owner. Returns `None` unless the handle is in transit.
    pub(crate) fn attach(&self, world: WorldId) -> Option<Player> {
        let mut residence = self.residence();
        if !matches!(&*residence, Residence::InTransit(_)) {
            return None;
        }
        match std::mem::replace(&mut *residence, Residence::InWorld(world)) {
            Residence::InTransit(player) => Some(*player),
            _ => None,
        }
    }

    fn residence(&self) -> MutexGuard<'_, Residence> {
        self.inner
            .residence
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for EntityHandle {}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("id", &self.inner.id)
            .field("location", &self.location())
            .finish()
    }
}
