use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::content::Catalog;
use super::effects::EffectModifiers;
use super::errors::EconomyError;
use super::hunger::{self, HungerTier, MealOutcome};
use super::inventory::{self, EquipChange};
use super::progression::{self, ExpProgress};
use super::storage::{EconomyStore, EconomyStoreBuilder, EconomyTxn};
use super::types::{
    EquipmentSlot, EquipmentSlotKey, InventorySlot, ItemKind, Occupation, PlayerRecord,
    PLAYER_SCHEMA_VERSION,
};
use crate::config::{Config, EconomyConfig};
use crate::logutil::escape_log;

const USERNAME_MIN: usize = 2;
const USERNAME_MAX: usize = 30;

/// Check a username before it becomes a storage key.
pub fn validate_username(username: &str) -> Result<(), EconomyError> {
    let trimmed = username.trim();
    if trimmed != username {
        return Err(EconomyError::Validation("username has surrounding whitespace".into()));
    }
    let len = trimmed.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(EconomyError::Validation(format!(
            "username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        || trimmed.contains("..")
    {
        return Err(EconomyError::Validation(
            "username may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    Ok(())
}

/// The economy engine: catalog, tuning, storage and a shared RNG.
///
/// Every public operation takes an explicit `now` and runs as one storage
/// transaction, starting with a hunger recompute for the acting player.
pub struct Economy {
    store: EconomyStore,
    catalog: Arc<Catalog>,
    config: EconomyConfig,
    rng: Mutex<StdRng>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub username: String,
    pub money: i64,
    pub hunger: f64,
    pub max_hunger: f64,
    pub tier: HungerTier,
    pub satiety_buff: f64,
    pub buff_expires_at: Option<DateTime<Utc>>,
    pub primary_occupation: Option<Occupation>,
    pub provider: ExpProgress,
    pub chef: ExpProgress,
    pub inventory: Vec<InventorySlot>,
    pub equipment: Vec<EquipmentSlot>,
    pub modifiers: EffectModifiers,
}

impl Economy {
    pub fn new(store: EconomyStore, catalog: Catalog, config: EconomyConfig) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Open the store and catalog described by `config`.
    pub fn open(config: &Config) -> Result<Self, EconomyError> {
        let catalog = match &config.content.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::standard(),
        };
        let store = EconomyStoreBuilder::new(config.database_path()).open()?;
        log::info!(
            "economy opened at {} ({} items, {} recipes)",
            config.database_path().display(),
            catalog.items().count(),
            catalog.recipes().count()
        );
        Ok(Self::new(store, catalog, config.economy.clone()))
    }

    /// Replace the RNG with a deterministic one.
    pub fn with_rng_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn store(&self) -> &EconomyStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Load a player inside a transaction with hunger brought up to `now`.
    pub(crate) fn load_player(
        &self,
        txn: &EconomyTxn<'_>,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, EconomyError> {
        let mut player = txn.get_player(username)?;
        hunger::recompute(&mut player, &self.config, now);
        Ok(player)
    }

    pub(crate) fn save_player(
        &self,
        txn: &EconomyTxn<'_>,
        player: &mut PlayerRecord,
        now: DateTime<Utc>,
    ) -> Result<(), EconomyError> {
        player.updated_at = now;
        player.schema_version = PLAYER_SCHEMA_VERSION;
        txn.put_player(player)
    }

    /// Re-resolve equipment modifiers after a change and re-check the limits
    /// that depend on them.
    fn refresh_modifiers(&self, player: &mut PlayerRecord) -> Result<(), EconomyError> {
        player.modifiers = EffectModifiers::resolve(&player.equipment, &self.catalog)?;
        if !inventory::within_stack_limits(player, &self.catalog)? {
            return Err(EconomyError::Conflict(
                "an inventory stack would exceed its limit without this equipment".into(),
            ));
        }
        hunger::clamp_to_max(player, &self.config);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Player lifecycle
    // ------------------------------------------------------------------

    pub fn register_player(&self, username: &str, now: DateTime<Utc>) -> Result<PlayerRecord, EconomyError> {
        validate_username(username)?;
        let record = self.store.transaction(|txn| {
            if txn.player_exists(username)? {
                return Err(EconomyError::Conflict(format!("player {} already exists", username)));
            }
            let mut player = PlayerRecord::new(
                username,
                now,
                self.config.max_hunger,
                self.config.starting_money,
            );
            self.save_player(txn, &mut player, now)?;
            Ok(player)
        })?;
        log::info!("registered player {}", escape_log(username));
        Ok(record)
    }

    pub fn select_occupation(
        &self,
        username: &str,
        occupation: Occupation,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, EconomyError> {
        let record = self.store.transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            progression::select_primary(&mut player, occupation)?;
            self.save_player(txn, &mut player, now)?;
            Ok(player)
        })?;
        log::info!("{} chose {} as primary occupation", escape_log(username), occupation);
        Ok(record)
    }

    pub fn unlock_second_occupation(&self, username: &str, now: DateTime<Utc>) -> Result<Occupation, EconomyError> {
        let unlocked = self.store.transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let unlocked = progression::unlock_secondary(&mut player)?;
            self.save_player(txn, &mut player, now)?;
            Ok(unlocked)
        })?;
        log::info!("{} unlocked {}", escape_log(username), unlocked);
        Ok(unlocked)
    }

    /// Current state with hunger recomputed and persisted.
    pub fn player_status(&self, username: &str, now: DateTime<Utc>) -> Result<PlayerStatus, EconomyError> {
        let player = self.store.transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            self.save_player(txn, &mut player, now)?;
            Ok(player)
        })?;
        Ok(PlayerStatus {
            username: player.username.clone(),
            money: player.money,
            hunger: player.hunger,
            max_hunger: hunger::effective_max(&player, &self.config),
            tier: hunger::current_tier(&player, &self.config),
            satiety_buff: player.satiety_buff,
            buff_expires_at: player.buff_expires_at,
            primary_occupation: player.primary_occupation,
            provider: progression::exp_progress(&player, Occupation::Provider),
            chef: progression::exp_progress(&player, Occupation::Chef),
            inventory: player.inventory.clone(),
            equipment: player.equipment.clone(),
            modifiers: player.modifiers.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Eating and equipment
    // ------------------------------------------------------------------

    /// Eat one unit of the meal in inventory slot `slot`.
    pub fn eat(&self, username: &str, slot: u8, now: DateTime<Utc>) -> Result<MealOutcome, EconomyError> {
        let outcome = self.store.transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let item_id = inventory::occupied_slot(&player, slot)?
                .item_id
                .clone()
                .unwrap_or_default();
            let item = self.catalog.item(&item_id)?;
            if item.kind != ItemKind::Meal || !item.is_edible() {
                return Err(EconomyError::Validation(format!("{} cannot be eaten", item.name)));
            }
            inventory::take_from_slot(&mut player, slot, 1)?;
            let outcome = hunger::apply_meal(&mut player, &self.config, item, now);
            self.save_player(txn, &mut player, now)?;
            Ok(outcome)
        })?;
        log::info!(
            "{} ate from slot {}, hunger now {:.2}",
            escape_log(username),
            slot,
            outcome.hunger
        );
        Ok(outcome)
    }

    pub fn equip(&self, username: &str, slot: u8, now: DateTime<Utc>) -> Result<EquipChange, EconomyError> {
        let change = self.store.transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let change = inventory::equip(&mut player, &self.catalog, slot)?;
            self.refresh_modifiers(&mut player)?;
            self.save_player(txn, &mut player, now)?;
            Ok(change)
        })?;
        log::info!(
            "{} equipped {} in {}",
            escape_log(username),
            change.equipped,
            change.slot
        );
        Ok(change)
    }

    pub fn unequip(&self, username: &str, key: EquipmentSlotKey, now: DateTime<Utc>) -> Result<String, EconomyError> {
        let item_id = self.store.transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let item_id = inventory::unequip(&mut player, &self.catalog, key)?;
            self.refresh_modifiers(&mut player)?;
            self.save_player(txn, &mut player, now)?;
            Ok(item_id)
        })?;
        log::info!("{} unequipped {} from {}", escape_log(username), item_id, key);
        Ok(item_id)
    }
}
