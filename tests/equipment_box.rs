//! Integration tests for equipment box odds and openings.
mod common;

use tempfile::TempDir;

use common::{economy, economy_with, edit_player, give, held, player_with, restock, t0};
use homestead::config::{EconomyConfig, SlotWeights};
use homestead::economy::{
    Catalog, EconomyError, EquipmentEffect, EquipmentSlotKey, ItemKind, ItemRecord, Occupation,
    INVENTORY_SLOTS,
};

#[test]
fn odds_favour_the_primary_occupation() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);

    let odds = eco.equipment_box_odds("pat").expect("odds");
    assert_eq!(odds.len(), 12);
    let head = odds
        .iter()
        .find(|row| row.role == Occupation::Provider && row.slot == EquipmentSlotKey::Head)
        .expect("provider head");
    assert!((head.probability - 0.098).abs() < 1e-9);
    let chef_head = odds
        .iter()
        .find(|row| row.role == Occupation::Chef && row.slot == EquipmentSlotKey::Head)
        .expect("chef head");
    assert!((chef_head.probability - 0.042).abs() < 1e-9);
    let total: f64 = odds.iter().map(|row| row.probability).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn opening_a_box_charges_and_delivers_matching_equipment() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);

    let outcome = eco.open_equipment_box("pat", t0()).expect("open");
    assert_eq!(outcome.price, 420);
    assert_eq!(outcome.money_left, 580);
    assert!(!outcome.fallback);
    assert_eq!(held(&eco, "pat", &outcome.item_id), 1);

    let item = eco.catalog().item(&outcome.item_id).expect("item");
    assert_eq!(item.kind, ItemKind::Equipment);
    let spec = item.equipment.as_ref().expect("equipment spec");
    assert_eq!(spec.role, outcome.role);
    assert_eq!(spec.slot, outcome.slot);
}

#[test]
fn full_bias_always_rolls_the_primary_role() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = EconomyConfig::default();
    config.equipment_box.primary_bias = 1.0;
    let eco = economy_with(&dir, Catalog::standard(), config);
    player_with(&eco, "cleo", Occupation::Chef);
    edit_player(&eco, "cleo", |p| p.money = 5_000);

    for _ in 0..5 {
        let outcome = eco.open_equipment_box("cleo", t0()).expect("open");
        assert_eq!(outcome.role, Occupation::Chef);
    }
    let player = eco.store().get_player("cleo").expect("player");
    assert_eq!(player.money, 5_000 - 5 * 420);
}

#[test]
fn missing_pairs_fall_back_to_any_equipment() {
    let dir = TempDir::new().expect("tempdir");
    let catalog = Catalog::new(
        vec![ItemRecord::equipment(
            "sun_hat",
            "Sun Hat",
            Occupation::Provider,
            EquipmentSlotKey::Head,
            EquipmentEffect::HungerPenaltyTierReduction { tiers: 1 },
        )
        .with_sell_price(320)],
        Vec::new(),
    )
    .expect("catalog");
    let mut config = EconomyConfig::default();
    config.equipment_box.slot_weights = SlotWeights {
        head: 0,
        upper_body: 0,
        lower_body: 0,
        arm: 0,
        glove: 1,
        shoe: 0,
    };
    let eco = economy_with(&dir, catalog, config);
    eco.register_player("pat", t0()).expect("register");

    let outcome = eco.open_equipment_box("pat", t0()).expect("open");
    assert_eq!(outcome.slot, EquipmentSlotKey::Glove);
    assert!(outcome.fallback);
    assert_eq!(outcome.item_id, "sun_hat");
    assert_eq!(held(&eco, "pat", "sun_hat"), 1);
}

#[test]
fn failed_openings_charge_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);

    edit_player(&eco, "pat", |p| p.money = 100);
    let err = eco.open_equipment_box("pat", t0()).expect_err("too poor");
    assert!(matches!(err, EconomyError::InsufficientFunds { needed: 420, .. }));

    edit_player(&eco, "pat", |p| p.money = 1_000);
    give(&eco, "pat", "salt", 20 * INVENTORY_SLOTS as u32);
    let err = eco.open_equipment_box("pat", t0()).expect_err("no room");
    assert!(matches!(err, EconomyError::InventoryFull { .. }));
    assert_eq!(eco.store().get_player("pat").expect("player").money, 1_000);
}

#[test]
fn long_run_openings_follow_the_published_odds() {
    let dir = TempDir::new().expect("tempdir");
    let eco = economy(&dir);
    player_with(&eco, "pat", Occupation::Provider);
    edit_player(&eco, "pat", |p| p.money = 1_000_000);
    let odds = eco.equipment_box_odds("pat").expect("odds");

    let rounds = 600;
    let mut providers = 0;
    let mut per_slot = [0u32; 6];
    for _ in 0..rounds {
        restock(&eco, "pat", &[]);
        let outcome = eco.open_equipment_box("pat", t0()).expect("open");
        assert!(!outcome.fallback);
        if outcome.role == Occupation::Provider {
            providers += 1;
        }
        let index = EquipmentSlotKey::ALL
            .iter()
            .position(|key| *key == outcome.slot)
            .expect("known slot");
        per_slot[index] += 1;
    }

    let expected_provider: f64 = odds
        .iter()
        .filter(|row| row.role == Occupation::Provider)
        .map(|row| row.probability)
        .sum();
    assert!((expected_provider - 0.7).abs() < 1e-9);
    let provider_rate = providers as f64 / rounds as f64;
    assert!(
        (provider_rate - expected_provider).abs() < 0.06,
        "provider rate {provider_rate}"
    );

    for (index, key) in EquipmentSlotKey::ALL.iter().enumerate() {
        let expected: f64 = odds
            .iter()
            .filter(|row| row.slot == *key)
            .map(|row| row.probability)
            .sum();
        let rate = per_slot[index] as f64 / rounds as f64;
        assert!((rate - expected).abs() < 0.05, "{key:?} rate {rate}, expected {expected}");
    }
}
