//! Item stacks and fixed-size inventories held by player entities.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    DragonBreath,
    Paper,
    Compass,
    Helmet,
}

/// A stack of items with an optional display name and string-keyed values
/// that plugins use to tag special items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    kind: ItemKind,
    count: u32,
    custom_name: Option<String>,
    values: BTreeMap<String, String>,
}

impl ItemStack {
    pub fn new(kind: ItemKind, count: u32) -> Self {
        Self {
            kind,
            count,
            custom_name: None,
            values: BTreeMap::new(),
        }
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn custom_name(&self) -> Option<&str> {
        self.custom_name.as_deref()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("slot {slot} out of range for inventory of size {size}")]
    SlotOutOfRange { slot: usize, size: usize },
}

/// Fixed-size list of optional item stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
}

impl Inventory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn item(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn set_item(&mut self, slot: usize, stack: ItemStack) -> Result<(), InventoryError> {
        let size = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(InventoryError::SlotOutOfRange { slot, size })?;
        *entry = Some(stack);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Iterates over occupied slots as `(slot, stack)` pairs.
    pub fn items(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, stack)| stack.as_ref().map(|s| (slot, s)))
    }
}
