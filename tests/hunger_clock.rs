//! Integration tests for lazy hunger decay, meals and satiety buffs.
mod common;

use tempfile::TempDir;

use common::{at, economy, edit_player, give, held, slot_of, t0};
use homestead::economy::{ErrorKind, HungerTier};

#[test]
fn hunger_decays_from_stored_timestamp() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");

    let status = eco.player_status("alice", at(30)).expect("status");
    assert_eq!(status.hunger, 2000.0);
    assert_eq!(status.tier, HungerTier::Fit);

    // Same instant again is a no-op.
    let again = eco.player_status("alice", at(30)).expect("status");
    assert_eq!(again.hunger, 2000.0);

    let stored = eco.store().get_player("alice").expect("player");
    assert_eq!(stored.hunger_updated_at, at(30));
}

#[test]
fn hunger_never_drops_below_zero() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");

    let status = eco.player_status("alice", at(24 * 60)).expect("status");
    assert_eq!(status.hunger, 0.0);
    assert_eq!(status.tier, HungerTier::Starving);
}

#[test]
fn eating_adds_kcal_and_clamps_at_max() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    edit_player(&eco, "alice", |p| p.hunger = 2000.0);
    give(&eco, "alice", "chicken_salad", 1);
    give(&eco, "alice", "beef_steak", 2);

    let salad = slot_of(&eco, "alice", "chicken_salad");
    let meal = eco.eat("alice", salad, t0()).expect("eat salad");
    assert_eq!(meal.hunger, 2080.0);
    assert!((meal.satiety_buff - 0.05).abs() < 1e-9);
    assert_eq!(meal.buff_expires_at, Some(at(30)));
    assert_eq!(held(&eco, "alice", "chicken_salad"), 0);

    let steak = slot_of(&eco, "alice", "beef_steak");
    let meal = eco.eat("alice", steak, t0()).expect("eat steak");
    assert_eq!(meal.hunger, 2400.0);
    // A new buff replaces the old one.
    assert!((meal.satiety_buff - 0.15).abs() < 1e-9);
    assert_eq!(meal.buff_expires_at, Some(at(60)));
    assert_eq!(held(&eco, "alice", "beef_steak"), 1);
}

#[test]
fn satiety_buff_slows_decay_until_it_expires() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    edit_player(&eco, "alice", |p| {
        p.satiety_buff = 0.25;
        p.buff_expires_at = Some(at(60));
    });

    let status = eco.player_status("alice", at(30)).expect("status");
    assert_eq!(status.hunger, 2100.0);
    assert!((status.satiety_buff - 0.25).abs() < 1e-9);

    // Buff expired before this read, so the whole window decays at full rate.
    let status = eco.player_status("alice", at(90)).expect("status");
    assert_eq!(status.hunger, 1300.0);
    assert_eq!(status.satiety_buff, 0.0);
    assert_eq!(status.buff_expires_at, None);
}

#[test]
fn equipment_bonus_raises_the_meal_ceiling() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "field_shirt", 1);
    let shirt = slot_of(&eco, "alice", "field_shirt");
    eco.equip("alice", shirt, t0()).expect("equip");
    give(&eco, "alice", "beef_steak", 1);

    let steak = slot_of(&eco, "alice", "beef_steak");
    let meal = eco.eat("alice", steak, t0()).expect("eat");
    assert_eq!(meal.hunger, 2700.0);

    let status = eco.player_status("alice", t0()).expect("status");
    assert_eq!(status.max_hunger, 2700.0);
}

#[test]
fn non_meals_and_empty_slots_cannot_be_eaten() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("alice", t0()).expect("register");
    give(&eco, "alice", "vegetable", 3);

    let veg = slot_of(&eco, "alice", "vegetable");
    let err = eco.eat("alice", veg, t0()).expect_err("raw produce");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(held(&eco, "alice", "vegetable"), 3);

    let err = eco.eat("alice", 7, t0()).expect_err("empty slot");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
