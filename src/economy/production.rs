//! Timed farming and cooking orders.
//!
//! Readiness is derived from `completes_at`; nothing is scheduled. Random
//! rolls for save/double/gourmet chances are drawn before the storage
//! transaction starts so a retried transaction sees the same outcome.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

use super::effects::chance;
use super::engine::Economy;
use super::errors::EconomyError;
use super::hunger::{self, HungerTier};
use super::inventory;
use super::progression::{self, ExpGrant};
use super::storage::EconomyTxn;
use super::types::{
    ItemKind, OrderState, PlayerRecord, WorkOrder, WorkType, ORDER_SCHEMA_VERSION,
};
use crate::logutil::escape_log;

/// What to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkRequest {
    Farm { seed_id: String, quantity: u32 },
    Cook { recipe_id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: WorkOrder,
    pub state: OrderState,
    /// Seconds until ready, 0 once ready.
    pub remaining_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectOutcome {
    pub order_id: u64,
    pub item_id: String,
    pub quantity: u32,
    pub doubled: bool,
    pub gourmet: bool,
    pub exp: Option<ExpGrant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectAllOutcome {
    pub collected: Vec<CollectOutcome>,
    /// Set when collection stopped because the inventory had no room.
    pub blocked_by: Option<BlockedOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedOrder {
    pub order_id: u64,
    pub item_id: String,
    pub quantity: u32,
}

/// Scale `base_mins` by the hunger tier and a fractional reduction.
pub fn work_duration(base_mins: u32, tier: HungerTier, reduction: f64) -> Duration {
    let minutes = base_mins as f64 * tier.multiplier() * (1.0 - reduction.clamp(0.0, 1.0));
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

fn remaining_secs(order: &WorkOrder, now: DateTime<Utc>) -> i64 {
    let ms = (order.completes_at - now).num_milliseconds().max(0);
    (ms + 999) / 1000
}

impl Economy {
    pub(crate) fn roll(&self) -> f64 {
        self.with_rng(|rng| rng.gen::<f64>())
    }

    /// Dispatch to [`Economy::start_farm`] or [`Economy::start_cook`].
    pub fn start_work(&self, username: &str, request: &WorkRequest, now: DateTime<Utc>) -> Result<WorkOrder, EconomyError> {
        match request {
            WorkRequest::Farm { seed_id, quantity } => self.start_farm(username, seed_id, *quantity, now),
            WorkRequest::Cook { recipe_id } => self.start_cook(username, recipe_id, now),
        }
    }

    /// Plant `quantity` seeds. Seeds leave the inventory immediately.
    pub fn start_farm(&self, username: &str, seed_id: &str, quantity: u32, now: DateTime<Utc>) -> Result<WorkOrder, EconomyError> {
        if quantity == 0 {
            return Err(EconomyError::Validation("quantity must be positive".into()));
        }
        let order_id = self.store().next_id()?;
        let order = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            if !player.provider.is_unlocked() {
                return Err(EconomyError::Unauthorized(
                    "the Provider occupation is required to farm".into(),
                ));
            }
            let seed = self.catalog().item(seed_id)?;
            let grow_mins = match (seed.kind, seed.grow_mins) {
                (ItemKind::Seed, Some(mins)) => mins,
                _ => {
                    return Err(EconomyError::Validation(format!("{} cannot be farmed", seed.name)))
                }
            };
            if seed.yield_item_id.is_none() {
                return Err(EconomyError::Internal(format!("seed {} has no yield configured", seed.id)));
            }
            inventory::withdraw(&mut player, seed_id, quantity)?;

            let tier = hunger::current_tier(&player, self.config())
                .improved_by(player.modifiers.hunger_tier_reduction);
            let reduction = player
                .modifiers
                .time_reduction(WorkType::Farm, self.config().max_time_reduction);
            let order = WorkOrder {
                id: order_id,
                username: player.username.clone(),
                work: WorkType::Farm,
                item_id: seed.id.clone(),
                recipe_id: None,
                quantity,
                started_at: now,
                completes_at: now + work_duration(grow_mins, tier, reduction),
                collected: false,
                schema_version: ORDER_SCHEMA_VERSION,
            };
            txn.put_order(&order)?;
            self.save_player(txn, &mut player, now)?;
            Ok(order)
        })?;
        log::info!(
            "{} planted {}x {} (order {}, ready {})",
            escape_log(username),
            quantity,
            seed_id,
            order.id,
            order.completes_at
        );
        Ok(order)
    }

    /// Start cooking an unlocked recipe. Ingredients are drawn immediately;
    /// each secondary ingredient may be saved by equipment.
    pub fn start_cook(&self, username: &str, recipe_id: &str, now: DateTime<Utc>) -> Result<WorkOrder, EconomyError> {
        let recipe = self.catalog().recipe(recipe_id)?;
        let save_rolls: Vec<f64> = recipe.ingredients.iter().map(|_| self.roll()).collect();
        let order_id = self.store().next_id()?;

        let order = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            if !player.chef.is_unlocked() {
                return Err(EconomyError::Unauthorized(
                    "the Chef occupation is required to cook".into(),
                ));
            }
            if !player.has_recipe(recipe_id) {
                return Err(EconomyError::Unauthorized(format!(
                    "recipe {} is locked; buy it from the recipe shop first",
                    recipe.name
                )));
            }
            for ingredient in &recipe.ingredients {
                let available = inventory::total_quantity(&player, &ingredient.item_id);
                if available < ingredient.quantity {
                    return Err(EconomyError::MissingIngredient {
                        item_id: ingredient.item_id.clone(),
                        needed: ingredient.quantity,
                        available,
                    });
                }
            }

            let save_chance = chance(player.modifiers.ingredient_save_chance);
            for (index, ingredient) in recipe.ingredients.iter().enumerate() {
                let saved = index > 0 && save_rolls.get(index).is_some_and(|roll| *roll < save_chance);
                if saved {
                    log::debug!(
                        "{} saved {}x {}",
                        escape_log(username),
                        ingredient.quantity,
                        ingredient.item_id
                    );
                    continue;
                }
                inventory::withdraw(&mut player, &ingredient.item_id, ingredient.quantity)?;
            }

            let tier = hunger::current_tier(&player, self.config());
            let reduction = player
                .modifiers
                .time_reduction(WorkType::Cook, self.config().max_time_reduction);
            let completes_at = now + work_duration(recipe.cook_mins, tier, reduction);
            player.cooking_until = Some(player.cooking_until.map_or(completes_at, |c| c.max(completes_at)));

            let order = WorkOrder {
                id: order_id,
                username: player.username.clone(),
                work: WorkType::Cook,
                item_id: recipe.output_item_id.clone(),
                recipe_id: Some(recipe.id.clone()),
                quantity: recipe.output_qty,
                started_at: now,
                completes_at,
                collected: false,
                schema_version: ORDER_SCHEMA_VERSION,
            };
            txn.put_order(&order)?;
            self.save_player(txn, &mut player, now)?;
            Ok(order)
        })?;
        log::info!(
            "{} started cooking {} (order {}, ready {})",
            escape_log(username),
            recipe_id,
            order.id,
            order.completes_at
        );
        Ok(order)
    }

    /// Resolve and deposit one ready order. Leaves `player` untouched on error.
    fn collect_order(
        &self,
        txn: &EconomyTxn<'_>,
        player: &mut PlayerRecord,
        order: &mut WorkOrder,
        roll: f64,
        now: DateTime<Utc>,
    ) -> Result<CollectOutcome, EconomyError> {
        if order.collected {
            return Err(EconomyError::NotFound(format!("work order: {}", order.id)));
        }
        if !order.is_ready(now) {
            return Err(EconomyError::NotReady {
                order_id: order.id,
                remaining_secs: remaining_secs(order, now),
            });
        }

        let (item_id, quantity, doubled, gourmet) = match order.work {
            WorkType::Farm => {
                let seed = self.catalog().item(&order.item_id)?;
                let yield_id = seed.yield_item_id.clone().ok_or_else(|| {
                    EconomyError::Internal(format!("seed {} has no yield configured", seed.id))
                })?;
                let base = seed.yield_qty.unwrap_or(1).saturating_mul(order.quantity);
                let doubled = roll < chance(player.modifiers.double_yield_chance);
                let quantity = if doubled { base.saturating_mul(2) } else { base };
                (yield_id, quantity, doubled, false)
            }
            WorkType::Cook => {
                let output = self.catalog().item(&order.item_id)?;
                match &output.gourmet_variant_id {
                    Some(variant) if roll < chance(player.modifiers.gourmet_chance) => {
                        (variant.clone(), order.quantity, false, true)
                    }
                    _ => (output.id.clone(), order.quantity, false, false),
                }
            }
        };

        let output_item = self.catalog().item(&item_id)?;
        inventory::deposit(player, output_item, quantity)?;
        order.collected = true;
        txn.put_order(order)?;

        let exp = progression::grant_exp(
            player,
            order.work.occupation(),
            progression::collection_exp(output_item, quantity),
        );
        Ok(CollectOutcome {
            order_id: order.id,
            item_id,
            quantity,
            doubled,
            gourmet,
            exp,
        })
    }

    /// Collect one ready order into the inventory.
    pub fn collect_work(&self, username: &str, order_id: u64, now: DateTime<Utc>) -> Result<CollectOutcome, EconomyError> {
        let roll = self.roll();
        let outcome = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let mut order = txn.get_order(username, order_id)?;
            let outcome = self.collect_order(txn, &mut player, &mut order, roll, now)?;
            self.save_player(txn, &mut player, now)?;
            Ok(outcome)
        })?;
        log::info!(
            "{} collected {}x {} from order {}",
            escape_log(username),
            outcome.quantity,
            outcome.item_id,
            order_id
        );
        Ok(outcome)
    }

    /// Collect every ready order, oldest completion first, stopping at the
    /// first one that does not fit. Earlier collections are kept.
    ///
    /// Running out of room is the only per-order stop. Any other failure
    /// (an order whose item left the catalog, a storage error) aborts the
    /// whole batch and nothing is collected.
    pub fn collect_all_ready(&self, username: &str, now: DateTime<Utc>) -> Result<CollectAllOutcome, EconomyError> {
        let candidates: Vec<u64> = self
            .store()
            .list_orders(username)?
            .into_iter()
            .filter(|order| order.is_ready(now))
            .map(|order| order.id)
            .collect();
        let rolls: BTreeMap<u64, f64> = candidates.iter().map(|id| (*id, self.roll())).collect();

        let outcome = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let mut ready = Vec::new();
            for id in &candidates {
                let order = txn.get_order(username, *id)?;
                if order.is_ready(now) {
                    ready.push(order);
                }
            }
            ready.sort_by_key(|order| (order.completes_at, order.id));

            let mut collected = Vec::new();
            let mut blocked_by = None;
            for mut order in ready {
                let roll = rolls.get(&order.id).copied().unwrap_or(1.0);
                match self.collect_order(txn, &mut player, &mut order, roll, now) {
                    Ok(done) => collected.push(done),
                    Err(EconomyError::InventoryFull { item_id, quantity }) => {
                        blocked_by = Some(BlockedOrder {
                            order_id: order.id,
                            item_id,
                            quantity,
                        });
                        break;
                    }
                    Err(other) => return Err(other),
                }
            }
            self.save_player(txn, &mut player, now)?;
            Ok(CollectAllOutcome {
                collected,
                blocked_by,
            })
        })?;

        if let Some(blocked) = &outcome.blocked_by {
            log::info!(
                "{} collected {} orders, stopped at order {}: no room for {}x {}",
                escape_log(username),
                outcome.collected.len(),
                blocked.order_id,
                blocked.quantity,
                blocked.item_id
            );
        } else {
            log::info!("{} collected {} orders", escape_log(username), outcome.collected.len());
        }
        Ok(outcome)
    }

    /// Uncollected orders, newest first.
    pub fn list_work_orders(&self, username: &str, now: DateTime<Utc>) -> Result<Vec<OrderView>, EconomyError> {
        self.store().get_player(username)?;
        let mut orders: Vec<WorkOrder> = self
            .store()
            .list_orders(username)?
            .into_iter()
            .filter(|order| !order.collected)
            .collect();
        orders.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(orders
            .into_iter()
            .map(|order| OrderView {
                state: order.state(now),
                remaining_secs: remaining_secs(&order, now),
                order,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_scales_with_tier_and_reduction() {
        assert_eq!(work_duration(10, HungerTier::Fit, 0.0), Duration::minutes(10));
        assert_eq!(work_duration(10, HungerTier::Starving, 0.0), Duration::minutes(25));
        assert_eq!(work_duration(10, HungerTier::Normal, 0.0), Duration::minutes(12));
        assert_eq!(work_duration(20, HungerTier::Fit, 0.1), Duration::minutes(18));
        assert_eq!(work_duration(5, HungerTier::Hungry, 0.0), Duration::seconds(450));
    }

    #[test]
    fn remaining_time_rounds_up_to_whole_seconds() {
        let now = Utc::now();
        let order = WorkOrder {
            id: 1,
            username: "a".into(),
            work: WorkType::Farm,
            item_id: "chicken_egg".into(),
            recipe_id: None,
            quantity: 1,
            started_at: now,
            completes_at: now + Duration::milliseconds(1500),
            collected: false,
            schema_version: ORDER_SCHEMA_VERSION,
        };
        assert_eq!(remaining_secs(&order, now), 2);
        assert_eq!(remaining_secs(&order, now + Duration::minutes(1)), 0);
    }
}
