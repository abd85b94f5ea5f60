//! Fixed-slot inventory allocation and equipment swaps.
//!
//! Every mutating function here is all-or-nothing: it either applies the full
//! change to the player or returns an error with the player untouched.

use serde::Serialize;

use super::content::Catalog;
use super::errors::EconomyError;
use super::types::{EquipmentSlotKey, InventorySlot, ItemRecord, PlayerRecord};

// ============================================================================
// Queries
// ============================================================================

/// Units of `item` the inventory can still absorb: free room in matching
/// stacks plus a full stack for every empty slot.
pub fn capacity_for(player: &PlayerRecord, item: &ItemRecord) -> u64 {
    let limit = player.modifiers.stack_limit(item) as u64;
    player
        .inventory
        .iter()
        .map(|slot| {
            if slot.is_empty() {
                limit
            } else if slot.holds(&item.id) {
                limit.saturating_sub(slot.quantity as u64)
            } else {
                0
            }
        })
        .sum()
}

pub fn can_deposit(player: &PlayerRecord, item: &ItemRecord, quantity: u32) -> bool {
    capacity_for(player, item) >= quantity as u64
}

/// Sum of `item_id` across all slots.
pub fn total_quantity(player: &PlayerRecord, item_id: &str) -> u32 {
    player
        .inventory
        .iter()
        .filter(|slot| slot.holds(item_id))
        .map(|slot| slot.quantity)
        .sum()
}

/// Occupied slot at `index`.
pub fn occupied_slot(player: &PlayerRecord, index: u8) -> Result<&InventorySlot, EconomyError> {
    player
        .inventory
        .iter()
        .find(|slot| slot.index == index && !slot.is_empty())
        .ok_or_else(|| EconomyError::NotFound(format!("inventory slot {} is empty", index)))
}

// ============================================================================
// Deposit / withdraw
// ============================================================================

/// Place `quantity` units of `item`, topping up existing stacks in slot order
/// before opening empty slots.
pub fn deposit(player: &mut PlayerRecord, item: &ItemRecord, quantity: u32) -> Result<(), EconomyError> {
    if quantity == 0 {
        return Ok(());
    }
    if !can_deposit(player, item, quantity) {
        return Err(EconomyError::InventoryFull {
            item_id: item.id.clone(),
            quantity,
        });
    }

    let limit = player.modifiers.stack_limit(item);
    let mut remaining = quantity;
    player.inventory.sort_by_key(|slot| slot.index);

    for slot in player.inventory.iter_mut().filter(|slot| slot.holds(&item.id)) {
        if remaining == 0 {
            break;
        }
        let room = limit.saturating_sub(slot.quantity);
        let placed = room.min(remaining);
        slot.quantity += placed;
        remaining -= placed;
    }

    for slot in player.inventory.iter_mut() {
        if remaining == 0 {
            break;
        }
        if slot.is_empty() {
            let placed = limit.min(remaining);
            slot.item_id = Some(item.id.clone());
            slot.quantity = placed;
            remaining -= placed;
        }
    }

    debug_assert_eq!(remaining, 0);
    Ok(())
}

/// Remove `quantity` units of `item_id`, draining matching slots in order.
pub fn withdraw(player: &mut PlayerRecord, item_id: &str, quantity: u32) -> Result<(), EconomyError> {
    let available = total_quantity(player, item_id);
    if available < quantity {
        return Err(EconomyError::MissingIngredient {
            item_id: item_id.to_string(),
            needed: quantity,
            available,
        });
    }

    let mut remaining = quantity;
    player.inventory.sort_by_key(|slot| slot.index);
    for slot in player.inventory.iter_mut().filter(|slot| slot.holds(item_id)) {
        if remaining == 0 {
            break;
        }
        let taken = slot.quantity.min(remaining);
        slot.quantity -= taken;
        remaining -= taken;
        if slot.quantity == 0 {
            slot.clear();
        }
    }
    Ok(())
}

/// Remove `quantity` units from one specific slot and return the item id.
pub fn take_from_slot(player: &mut PlayerRecord, index: u8, quantity: u32) -> Result<String, EconomyError> {
    let slot = player
        .inventory
        .iter_mut()
        .find(|slot| slot.index == index && !slot.is_empty())
        .ok_or_else(|| EconomyError::NotFound(format!("inventory slot {} is empty", index)))?;
    let item_id = slot.item_id.clone().unwrap_or_default();
    if slot.quantity < quantity {
        return Err(EconomyError::MissingIngredient {
            item_id,
            needed: quantity,
            available: slot.quantity,
        });
    }
    slot.quantity -= quantity;
    if slot.quantity == 0 {
        slot.clear();
    }
    Ok(item_id)
}

/// True when no stack exceeds its current effective limit.
pub fn within_stack_limits(player: &PlayerRecord, catalog: &Catalog) -> Result<bool, EconomyError> {
    for slot in &player.inventory {
        if let Some(item_id) = slot.item_id.as_deref() {
            let item = catalog.item(item_id)?;
            if slot.quantity > player.modifiers.stack_limit(item) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

// ============================================================================
// Equipment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipChange {
    pub slot: EquipmentSlotKey,
    pub equipped: String,
    pub displaced: Option<String>,
}

/// Move one unit of the equipment in inventory slot `index` onto the body.
/// A previously worn item goes back into the inventory or the whole swap fails.
pub fn equip(player: &mut PlayerRecord, catalog: &Catalog, index: u8) -> Result<EquipChange, EconomyError> {
    let item_id = occupied_slot(player, index)?
        .item_id
        .clone()
        .unwrap_or_default();
    let item = catalog.item(&item_id)?;
    let spec = item.equipment.as_ref().ok_or_else(|| {
        EconomyError::Validation(format!("{} cannot be equipped", item.name))
    })?;

    let mut staged = player.clone();
    take_from_slot(&mut staged, index, 1)?;
    let displaced = staged.equipped(spec.slot).map(str::to_string);
    if let Some(previous) = &displaced {
        let previous_item = catalog.item(previous)?;
        deposit(&mut staged, previous_item, 1)?;
    }
    staged.equipment_slot_mut(spec.slot).item_id = Some(item_id.clone());
    *player = staged;

    Ok(EquipChange {
        slot: spec.slot,
        equipped: item_id,
        displaced,
    })
}

/// Return the item worn in `key` to the inventory.
pub fn unequip(player: &mut PlayerRecord, catalog: &Catalog, key: EquipmentSlotKey) -> Result<String, EconomyError> {
    let item_id = player
        .equipped(key)
        .map(str::to_string)
        .ok_or_else(|| EconomyError::NotFound(format!("nothing equipped in {}", key)))?;
    let item = catalog.item(&item_id)?;
    deposit(player, item, 1)?;
    player.equipment_slot_mut(key).item_id = None;
    Ok(item_id)
}
