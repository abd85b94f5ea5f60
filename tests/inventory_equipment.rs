//! Integration tests for slot allocation and equipment swaps.
mod common;

use tempfile::TempDir;

use common::{economy, edit_player, give, held, slot_of, t0};
use homestead::economy::{EquipmentSlotKey, ErrorKind, INVENTORY_SLOTS};

#[test]
fn deposits_fill_stacks_before_empty_slots() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "vegetable", 25);

    let player = eco.store().get_player("alice").expect("player");
    let stacks: Vec<u32> = player
        .inventory
        .iter()
        .filter(|slot| slot.holds("vegetable"))
        .map(|slot| slot.quantity)
        .collect();
    assert_eq!(stacks, vec![10, 10, 5]);
    assert_eq!(player.inventory.len(), INVENTORY_SLOTS);
}

#[test]
fn equipping_swaps_the_worn_piece_back_into_inventory() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "sun_hat", 1);
    give(&eco, "alice", "toque_blanche", 1);

    let hat = slot_of(&eco, "alice", "sun_hat");
    let change = eco.equip("alice", hat, t0()).expect("equip hat");
    assert_eq!(change.slot, EquipmentSlotKey::Head);
    assert_eq!(change.displaced, None);

    let toque = slot_of(&eco, "alice", "toque_blanche");
    let change = eco.equip("alice", toque, t0()).expect("equip toque");
    assert_eq!(change.equipped, "toque_blanche");
    assert_eq!(change.displaced.as_deref(), Some("sun_hat"));

    let player = eco.store().get_player("alice").expect("player");
    assert_eq!(player.equipped(EquipmentSlotKey::Head), Some("toque_blanche"));
    assert_eq!(held(&eco, "alice", "sun_hat"), 1);
    assert_eq!(held(&eco, "alice", "toque_blanche"), 0);
    assert!((player.modifiers.ingredient_save_chance - 0.1).abs() < 1e-9);
    assert_eq!(player.modifiers.hunger_tier_reduction, 0);
}

#[test]
fn only_equipment_can_be_equipped() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "salt", 4);

    let err = eco
        .equip("alice", slot_of(&eco, "alice", "salt"), t0())
        .expect_err("salt is not equipment");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(held(&eco, "alice", "salt"), 4);
}

#[test]
fn stack_bonus_holds_while_worn_and_blocks_unequip_when_exceeded() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "cargo_pants", 1);
    eco.equip("alice", slot_of(&eco, "alice", "cargo_pants"), t0())
        .expect("equip pants");

    give(&eco, "alice", "chicken_meat", 10);
    let player = eco.store().get_player("alice").expect("player");
    let meat_slots = player
        .inventory
        .iter()
        .filter(|slot| slot.holds("chicken_meat"))
        .count();
    assert_eq!(meat_slots, 1);

    let err = eco
        .unequip("alice", EquipmentSlotKey::LowerBody, t0())
        .expect_err("stack would overflow");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let player = eco.store().get_player("alice").expect("player");
    assert_eq!(player.equipped(EquipmentSlotKey::LowerBody), Some("cargo_pants"));
    assert_eq!(held(&eco, "alice", "cargo_pants"), 0);
}

#[test]
fn unequip_needs_a_free_slot() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "mud_boots", 1);
    eco.equip("alice", slot_of(&eco, "alice", "mud_boots"), t0())
        .expect("equip boots");
    give(&eco, "alice", "salt", 20 * INVENTORY_SLOTS as u32);

    let err = eco
        .unequip("alice", EquipmentSlotKey::Shoe, t0())
        .expect_err("inventory full");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    edit_player(&eco, "alice", |p| {
        p.inventory[0].clear();
    });
    let item = eco.unequip("alice", EquipmentSlotKey::Shoe, t0()).expect("unequip");
    assert_eq!(item, "mud_boots");
    let player = eco.store().get_player("alice").expect("player");
    assert_eq!(player.modifiers.decay_reduction_per_min, 0.0);
}

#[test]
fn unequipping_an_empty_slot_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    let err = eco
        .unequip("alice", EquipmentSlotKey::Glove, t0())
        .expect_err("nothing worn");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
