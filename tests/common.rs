//! Test utilities & fixtures.
//! Every economy is backed by a throwaway sled store and a seeded RNG.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use homestead::config::EconomyConfig;
use homestead::economy::{inventory, Catalog, Economy, EconomyStoreBuilder, Occupation, PlayerRecord};

/// Fixed starting instant for every scenario.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid time")
}

/// `minutes` after [`t0`].
pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub fn economy(dir: &TempDir) -> Economy {
    economy_with(dir, Catalog::standard(), EconomyConfig::default())
}

pub fn economy_with(dir: &TempDir, catalog: Catalog, config: EconomyConfig) -> Economy {
    let store = EconomyStoreBuilder::new(dir.path())
        .without_flush()
        .open()
        .expect("store");
    Economy::new(store, catalog, config).with_rng_seed(42)
}

/// Register `username` at [`t0`] with `occupation` as primary.
pub fn player_with(eco: &Economy, username: &str, occupation: Occupation) -> PlayerRecord {
    eco.register_player(username, t0()).expect("register");
    eco.select_occupation(username, occupation, t0())
        .expect("select occupation")
}

/// Rewrite the stored player directly, outside any game action.
pub fn edit_player(eco: &Economy, username: &str, f: impl FnOnce(&mut PlayerRecord)) {
    let mut player = eco.store().get_player(username).expect("player");
    f(&mut player);
    eco.store().put_player(player).expect("put player");
}

/// Drop `quantity` units of `item_id` into the player's inventory.
pub fn give(eco: &Economy, username: &str, item_id: &str, quantity: u32) {
    let item = eco.catalog().item(item_id).expect("catalog item").clone();
    edit_player(eco, username, |player| {
        inventory::deposit(player, &item, quantity).expect("deposit");
    });
}

pub fn held(eco: &Economy, username: &str, item_id: &str) -> u32 {
    let player = eco.store().get_player(username).expect("player");
    inventory::total_quantity(&player, item_id)
}

/// Index of the first slot holding `item_id`.
pub fn slot_of(eco: &Economy, username: &str, item_id: &str) -> u8 {
    let player = eco.store().get_player(username).expect("player");
    player
        .inventory
        .iter()
        .find(|slot| slot.holds(item_id))
        .map(|slot| slot.index)
        .expect("item in inventory")
}

/// Empty every inventory slot, then deposit `contents`.
pub fn restock(eco: &Economy, username: &str, contents: &[(&str, u32)]) {
    let items: Vec<_> = contents
        .iter()
        .map(|(id, qty)| (eco.catalog().item(id).expect("catalog item").clone(), *qty))
        .collect();
    edit_player(eco, username, |player| {
        for slot in player.inventory.iter_mut() {
            slot.clear();
        }
        for (item, qty) in &items {
            inventory::deposit(player, item, *qty).expect("deposit");
        }
    });
}
