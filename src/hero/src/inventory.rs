// src/hero/src/inventory.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Inventory errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("inventory is full")]
    Full,
    #[error("not enough `{item}` (have {have}, need {need})")]
    Missing { item: String, have: u32, need: u32 },
    #[error("quantity must be positive")]
    ZeroQuantity,
}

/// Counted item bag plus ammo counters.
///
/// `capacity` limits the number of *distinct* items; stacking onto an item
/// already held never fails. Ammo lives in separate counters and does not
/// take inventory slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    capacity: usize,
    #[serde(default)]
    items: BTreeMap<String, u32>,
    #[serde(default)]
    ammo: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: BTreeMap::new(),
            ammo: BTreeMap::new(),
        }
    }

    /// Add items, stacking onto an existing entry
    pub fn add(&mut self, item: &str, quantity: u32) -> Result<u32, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity);
        }
        if !self.items.contains_key(item) && self.is_full() {
            return Err(InventoryError::Full);
        }
        let count = self.items.entry(item.to_string()).or_insert(0);
        *count = count.saturating_add(quantity);
        Ok(*count)
    }

    /// Whether `item` could be added without failing
    pub fn can_accept(&self, item: &str) -> bool {
        self.items.contains_key(item) || !self.is_full()
    }

    /// Remove items; a stack that reaches zero frees its slot
    pub fn remove(&mut self, item: &str, quantity: u32) -> Result<u32, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity);
        }
        let have = self.count(item);
        if have < quantity {
            return Err(InventoryError::Missing {
                item: item.to_string(),
                have,
                need: quantity,
            });
        }
        let left = have - quantity;
        if left == 0 {
            self.items.remove(item);
        } else {
            self.items.insert(item.to_string(), left);
        }
        Ok(left)
    }

    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn has(&self, item: &str, quantity: u32) -> bool {
        self.count(item) >= quantity.max(1)
    }

    pub fn add_ammo(&mut self, kind: &str, amount: u32) -> u32 {
        let count = self.ammo.entry(kind.to_string()).or_insert(0);
        *count = count.saturating_add(amount);
        *count
    }

    /// Spend one unit of ammo. Returns `false` when empty.
    pub fn spend_ammo(&mut self, kind: &str) -> bool {
        match self.ammo.get_mut(kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn ammo(&self, kind: &str) -> u32 {
        self.ammo.get(kind).copied().unwrap_or(0)
    }

    /// Items as `(id, count)` in id order for display
    pub fn items(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(id, count)| (id.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ammo.clear();
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(crate::DEFAULT_INVENTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacking_never_needs_a_slot() {
        let mut bag = Inventory::new(1);
        assert_eq!(bag.add("apple", 1), Ok(1));
        assert_eq!(bag.add("apple", 2), Ok(3));
        assert_eq!(bag.add("pear", 1), Err(InventoryError::Full));
        assert!(bag.can_accept("apple"));
        assert!(!bag.can_accept("pear"));
    }

    #[test]
    fn remove_frees_slot() {
        let mut bag = Inventory::new(1);
        bag.add("key", 1).unwrap();
        assert_eq!(
            bag.remove("key", 2),
            Err(InventoryError::Missing {
                item: "key".into(),
                have: 1,
                need: 2
            })
        );
        assert_eq!(bag.remove("key", 1), Ok(0));
        assert!(bag.is_empty());
        assert!(bag.add("map", 1).is_ok());
    }

    #[test]
    fn ammo_is_separate_from_slots() {
        let mut bag = Inventory::new(0);
        assert_eq!(bag.add_ammo("pebble", 2), 2);
        assert!(bag.spend_ammo("pebble"));
        assert!(bag.spend_ammo("pebble"));
        assert!(!bag.spend_ammo("pebble"));
        assert!(!bag.spend_ammo("arrow"));
    }

    #[test]
    fn json_shape_is_stable() {
        let mut bag = Inventory::new(4);
        bag.add("key", 1).unwrap();
        let json = serde_json::to_value(&bag).unwrap();
        assert_eq!(json["items"]["key"], 1);
        let back: Inventory = serde_json::from_value(json).unwrap();
        assert_eq!(back, bag);
    }
}
