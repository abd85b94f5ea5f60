//! Integration tests for occupations, EXP and levels.
mod common;

use tempfile::TempDir;

use common::{at, economy, edit_player, give, player_with, slot_of, t0};
use homestead::economy::{level_threshold, ErrorKind, Occupation, SECOND_OCCUPATION_UNLOCK_LEVEL};

#[test]
fn primary_occupation_is_chosen_once() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    let player = player_with(&eco, "pat", Occupation::Provider);
    assert_eq!(player.primary_occupation, Some(Occupation::Provider));
    assert_eq!(player.provider.level, 1);
    assert!(!player.chef.is_unlocked());

    let err = eco
        .select_occupation("pat", Occupation::Chef, t0())
        .expect_err("second choice");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn second_occupation_waits_for_primary_level() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    eco.register_player("newbie", t0()).expect("register");
    let err = eco
        .unlock_second_occupation("newbie", t0())
        .expect_err("no primary");
    assert_eq!(err.kind(), ErrorKind::Authorization);

    player_with(&eco, "pat", Occupation::Provider);
    let err = eco.unlock_second_occupation("pat", t0()).expect_err("level 1");
    assert_eq!(err.kind(), ErrorKind::Authorization);

    edit_player(&eco, "pat", |p| {
        p.provider.exp = level_threshold(SECOND_OCCUPATION_UNLOCK_LEVEL);
        p.provider.level = SECOND_OCCUPATION_UNLOCK_LEVEL;
    });
    let unlocked = eco.unlock_second_occupation("pat", t0()).expect("unlock");
    assert_eq!(unlocked, Occupation::Chef);
    let status = eco.player_status("pat", t0()).expect("status");
    assert_eq!(status.chef.level, 1);
    assert_eq!(status.primary_occupation, Some(Occupation::Provider));

    let err = eco.unlock_second_occupation("pat", t0()).expect_err("again");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn collection_exp_can_level_up() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);
    edit_player(&eco, "pat", |p| p.provider.exp = 395);
    give(&eco, "pat", "chicken_egg", 1);

    let order = eco.start_farm("pat", "chicken_egg", 1, t0()).expect("farm");
    let outcome = eco.collect_work("pat", order.id, at(10)).expect("collect");
    let grant = outcome.exp.expect("exp");
    assert_eq!(grant.gained, 10);
    assert!(grant.leveled_up());
    assert_eq!(grant.new_level, 2);

    let status = eco.player_status("pat", at(10)).expect("status");
    assert_eq!(status.provider.level, 2);
    assert_eq!(status.provider.exp_in_level, 5);
    assert_eq!(status.provider.exp_span, 500);
    assert!((status.provider.percent - 1.0).abs() < 1e-9);
}

#[test]
fn sales_only_credit_unlocked_tracks() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);
    give(&eco, "pat", "chicken_salad", 1);

    let slot = slot_of(&eco, "pat", "chicken_salad");
    let outcome = eco.create_listing("pat", slot, 1, 150, t0()).expect("listing");
    assert!(outcome.exp.is_none());
    let player = eco.store().get_player("pat").expect("player");
    assert_eq!(player.chef.exp, 0);
}

#[test]
fn sale_exp_scales_with_current_hunger() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);
    give(&eco, "pat", "chicken_meat", 1);
    edit_player(&eco, "pat", |p| p.hunger = 1200.0);

    let slot = slot_of(&eco, "pat", "chicken_meat");
    let outcome = eco.create_listing("pat", slot, 1, 50, t0()).expect("listing");
    assert_eq!(outcome.exp.expect("exp").gained, 25);
}
