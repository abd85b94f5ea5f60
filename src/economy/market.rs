//! Peer market listings, the NPC shop, recipe unlocks and equipment boxes.
//!
//! Money and items always move inside one storage transaction. Listings hold
//! their items in escrow from the moment they are created.

use chrono::{DateTime, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::engine::Economy;
use super::errors::EconomyError;
use super::hunger;
use super::inventory;
use super::progression::{self, ExpGrant};
use super::types::{
    EquipmentSlotKey, ItemKind, ItemRecord, ListingStatus, MarketListing, Occupation, PlayerRecord,
    RecipeRecord, LISTING_SCHEMA_VERSION,
};
use crate::config::EquipmentBoxConfig;
use crate::logutil::escape_log;

#[derive(Debug, Clone, Serialize)]
pub struct ListingOutcome {
    pub listing: MarketListing,
    pub exp: Option<ExpGrant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopEntry {
    pub item_id: String,
    pub name: String,
    pub kind: ItemKind,
    pub buy_price: i64,
    pub max_stack: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopPurchase {
    pub item_id: String,
    pub quantity: u32,
    pub total_cost: i64,
    pub money_left: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeEntry {
    pub recipe: RecipeRecord,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeUnlock {
    pub recipe_id: String,
    pub price: i64,
    pub money_left: i64,
}

/// Chance of one (role, slot) pair in an equipment box.
#[derive(Debug, Clone, Serialize)]
pub struct BoxOdds {
    pub role: Occupation,
    pub slot: EquipmentSlotKey,
    pub probability: f64,
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxOutcome {
    pub item_id: String,
    pub role: Occupation,
    pub slot: EquipmentSlotKey,
    /// True when nothing matched the rolled pair and a random piece was given instead.
    pub fallback: bool,
    pub price: i64,
    pub money_left: i64,
}

/// Probability of rolling `role` for a player whose primary is `primary`.
pub fn role_probability(cfg: &EquipmentBoxConfig, primary: Option<Occupation>, role: Occupation) -> f64 {
    match primary {
        Some(primary) if primary == role => cfg.primary_bias,
        Some(_) => 1.0 - cfg.primary_bias,
        None => 0.5,
    }
}

/// The full role x slot probability table.
pub fn box_odds_table(
    cfg: &EquipmentBoxConfig,
    primary: Option<Occupation>,
    catalog: &super::content::Catalog,
) -> Vec<BoxOdds> {
    let total = cfg.slot_weights.total().max(1) as f64;
    let mut table = Vec::new();
    for role in [Occupation::Provider, Occupation::Chef] {
        for slot in EquipmentSlotKey::ALL {
            table.push(BoxOdds {
                role,
                slot,
                probability: role_probability(cfg, primary, role) * cfg.slot_weights.weight(slot) as f64 / total,
                item_ids: catalog
                    .equipment_for(role, slot)
                    .into_iter()
                    .map(|item| item.id.clone())
                    .collect(),
            });
        }
    }
    table
}

/// Pre-drawn randomness for one box.
#[derive(Debug, Clone, Copy)]
struct BoxRolls {
    role: f64,
    slot: EquipmentSlotKey,
    pick: f64,
}

fn pick_index(roll: f64, len: usize) -> usize {
    ((roll * len as f64) as usize).min(len.saturating_sub(1))
}

fn sells_to(player: &PlayerRecord, item: &ItemRecord) -> bool {
    match item.kind {
        ItemKind::Seed => player.provider.is_unlocked(),
        ItemKind::Ingredient => player.chef.is_unlocked(),
        ItemKind::Equipment => false,
        ItemKind::Raw | ItemKind::Meal => true,
    }
}

fn debit(player: &mut PlayerRecord, amount: i64) -> Result<(), EconomyError> {
    if player.money < amount {
        return Err(EconomyError::InsufficientFunds {
            needed: amount,
            available: player.money,
        });
    }
    player.money -= amount;
    Ok(())
}

impl Economy {
    // ------------------------------------------------------------------
    // Peer market
    // ------------------------------------------------------------------

    /// List `quantity` units from inventory slot `slot` for a total of `price`.
    ///
    /// The items leave the inventory now, and sale EXP is granted now.
    pub fn create_listing(
        &self,
        username: &str,
        slot: u8,
        quantity: u32,
        price: i64,
        now: DateTime<Utc>,
    ) -> Result<ListingOutcome, EconomyError> {
        if quantity == 0 || price <= 0 {
            return Err(EconomyError::Validation(
                "quantity and price must be positive".into(),
            ));
        }
        let listing_id = self.store().next_id()?;
        let outcome = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let item_id = inventory::take_from_slot(&mut player, slot, quantity)?;
            let item = self.catalog().item(&item_id)?;

            let exp = match progression::sale_occupation(item.kind) {
                Some(occupation) => {
                    let max = hunger::effective_max(&player, self.config());
                    let amount = progression::sale_exp(item, price, player.hunger, max);
                    progression::grant_exp(&mut player, occupation, amount)
                }
                None => None,
            };

            let listing = MarketListing {
                id: listing_id,
                seller: player.username.clone(),
                item_id,
                quantity,
                price,
                status: ListingStatus::Active,
                created_at: now,
                buyer: None,
                sold_at: None,
                schema_version: LISTING_SCHEMA_VERSION,
            };
            txn.put_listing(&listing)?;
            self.save_player(txn, &mut player, now)?;
            Ok(ListingOutcome { listing, exp })
        })?;
        log::info!(
            "{} listed {}x {} for {} (listing {})",
            escape_log(username),
            quantity,
            outcome.listing.item_id,
            price,
            listing_id
        );
        Ok(outcome)
    }

    /// Buy an active listing outright.
    pub fn buy_listing(&self, buyer: &str, listing_id: u64, now: DateTime<Utc>) -> Result<MarketListing, EconomyError> {
        let listing = self.store().transaction(|txn| {
            let mut listing = txn.get_listing(listing_id)?;
            if listing.seller.eq_ignore_ascii_case(buyer) {
                return Err(EconomyError::Conflict("you cannot buy your own listing".into()));
            }
            if listing.status != ListingStatus::Active {
                return Err(EconomyError::Conflict(format!(
                    "listing {} is no longer active",
                    listing_id
                )));
            }

            let mut buyer_record = self.load_player(txn, buyer, now)?;
            let mut seller_record = txn.get_player(&listing.seller)?;
            let item = self.catalog().item(&listing.item_id)?;

            debit(&mut buyer_record, listing.price)?;
            inventory::deposit(&mut buyer_record, item, listing.quantity)?;
            seller_record.money = seller_record.money.saturating_add(listing.price);

            listing.status = ListingStatus::Sold;
            listing.buyer = Some(buyer_record.username.clone());
            listing.sold_at = Some(now);

            txn.put_listing(&listing)?;
            self.save_player(txn, &mut buyer_record, now)?;
            txn.put_player(&seller_record)?;
            Ok(listing)
        })?;
        log::info!(
            "{} bought listing {} ({}x {}) from {} for {}",
            escape_log(buyer),
            listing.id,
            listing.quantity,
            listing.item_id,
            escape_log(&listing.seller),
            listing.price
        );
        Ok(listing)
    }

    /// Withdraw an active listing and return its items to the seller.
    /// EXP granted at listing time is kept.
    pub fn cancel_listing(&self, seller: &str, listing_id: u64, now: DateTime<Utc>) -> Result<MarketListing, EconomyError> {
        let listing = self.store().transaction(|txn| {
            let mut listing = txn.get_listing(listing_id)?;
            if !listing.seller.eq_ignore_ascii_case(seller) {
                return Err(EconomyError::NotFound(format!("listing: {}", listing_id)));
            }
            if listing.status != ListingStatus::Active {
                return Err(EconomyError::Conflict(format!(
                    "listing {} is no longer active",
                    listing_id
                )));
            }
            let mut player = self.load_player(txn, seller, now)?;
            let item = self.catalog().item(&listing.item_id)?;
            inventory::deposit(&mut player, item, listing.quantity)?;
            listing.status = ListingStatus::Cancelled;
            txn.put_listing(&listing)?;
            self.save_player(txn, &mut player, now)?;
            Ok(listing)
        })?;
        log::info!("{} cancelled listing {}", escape_log(seller), listing_id);
        Ok(listing)
    }

    /// Active listings, newest first.
    pub fn active_listings(&self) -> Result<Vec<MarketListing>, EconomyError> {
        let mut listings: Vec<MarketListing> = self
            .store()
            .list_listings()?
            .into_iter()
            .filter(|listing| listing.status == ListingStatus::Active)
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listings)
    }

    // ------------------------------------------------------------------
    // NPC shop
    // ------------------------------------------------------------------

    /// Items this player may buy from the shop.
    pub fn shop_catalog(&self, username: &str) -> Result<Vec<ShopEntry>, EconomyError> {
        let player = self.store().get_player(username)?;
        Ok(self
            .catalog()
            .items()
            .filter(|item| sells_to(&player, item))
            .filter_map(|item| {
                item.buy_price.map(|price| ShopEntry {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    kind: item.kind,
                    buy_price: price,
                    max_stack: item.max_stack,
                })
            })
            .collect())
    }

    pub fn buy_from_shop(
        &self,
        username: &str,
        item_id: &str,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<ShopPurchase, EconomyError> {
        if quantity == 0 {
            return Err(EconomyError::Validation("quantity must be positive".into()));
        }
        let item = self.catalog().item(item_id)?;
        let unit_price = match (item.kind, item.buy_price) {
            (ItemKind::Equipment, _) | (_, None) => {
                return Err(EconomyError::Validation(format!("{} is not sold in the shop", item.name)))
            }
            (_, Some(price)) => price,
        };
        let total_cost = unit_price
            .checked_mul(quantity as i64)
            .ok_or_else(|| EconomyError::Validation("order total is too large".into()))?;

        let purchase = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            if !sells_to(&player, item) {
                let needed = match item.kind {
                    ItemKind::Seed => Occupation::Provider,
                    _ => Occupation::Chef,
                };
                return Err(EconomyError::Unauthorized(format!(
                    "the {} occupation is required to buy {}",
                    needed, item.name
                )));
            }
            let limit = player.modifiers.stack_limit(item);
            if quantity > limit {
                return Err(EconomyError::Validation(format!(
                    "at most {} {} per purchase",
                    limit, item.name
                )));
            }
            debit(&mut player, total_cost)?;
            inventory::deposit(&mut player, item, quantity)?;
            self.save_player(txn, &mut player, now)?;
            Ok(ShopPurchase {
                item_id: item.id.clone(),
                quantity,
                total_cost,
                money_left: player.money,
            })
        })?;
        log::info!(
            "{} bought {}x {} for {}",
            escape_log(username),
            quantity,
            item_id,
            total_cost
        );
        Ok(purchase)
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    /// Recipes with this player's unlock state; empty without the Chef occupation.
    pub fn recipe_catalog(&self, username: &str) -> Result<Vec<RecipeEntry>, EconomyError> {
        let player = self.store().get_player(username)?;
        if !player.chef.is_unlocked() {
            return Ok(Vec::new());
        }
        Ok(self
            .catalog()
            .recipes()
            .map(|recipe| RecipeEntry {
                recipe: recipe.clone(),
                unlocked: player.has_recipe(&recipe.id),
            })
            .collect())
    }

    pub fn buy_recipe_unlock(&self, username: &str, recipe_id: &str, now: DateTime<Utc>) -> Result<RecipeUnlock, EconomyError> {
        let recipe = self.catalog().recipe(recipe_id)?;
        let unlock = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            if !player.chef.is_unlocked() {
                return Err(EconomyError::Unauthorized(
                    "the Chef occupation is required to buy recipes".into(),
                ));
            }
            if player.has_recipe(recipe_id) {
                return Err(EconomyError::Conflict(format!(
                    "{} is already unlocked",
                    recipe.name
                )));
            }
            debit(&mut player, recipe.unlock_price)?;
            player.unlocked_recipes.insert(recipe.id.clone());
            self.save_player(txn, &mut player, now)?;
            Ok(RecipeUnlock {
                recipe_id: recipe.id.clone(),
                price: recipe.unlock_price,
                money_left: player.money,
            })
        })?;
        log::info!(
            "{} unlocked recipe {} for {}",
            escape_log(username),
            recipe_id,
            unlock.price
        );
        Ok(unlock)
    }

    // ------------------------------------------------------------------
    // Equipment box
    // ------------------------------------------------------------------

    pub fn equipment_box_odds(&self, username: &str) -> Result<Vec<BoxOdds>, EconomyError> {
        let player = self.store().get_player(username)?;
        Ok(box_odds_table(
            &self.config().equipment_box,
            player.primary_occupation,
            self.catalog(),
        ))
    }

    fn draw_box_rolls(&self) -> Result<BoxRolls, EconomyError> {
        let weights = &self.config().equipment_box.slot_weights;
        let dist = WeightedIndex::new(EquipmentSlotKey::ALL.iter().map(|key| weights.weight(*key)))
            .map_err(|e| EconomyError::Internal(format!("invalid slot weights: {}", e)))?;
        Ok(self.with_rng(|rng| BoxRolls {
            role: rng.gen::<f64>(),
            slot: EquipmentSlotKey::ALL[dist.sample(rng)],
            pick: rng.gen::<f64>(),
        }))
    }

    /// Pay the box price and receive one random equipment piece.
    pub fn open_equipment_box(&self, username: &str, now: DateTime<Utc>) -> Result<BoxOutcome, EconomyError> {
        let rolls = self.draw_box_rolls()?;
        let all_equipment = self.catalog().equipment_items();
        let fallback_item = self
            .with_rng(|rng| all_equipment.choose(rng).copied())
            .ok_or_else(|| EconomyError::Internal("no equipment is configured".into()))?;
        let price = self.config().equipment_box.price;

        let outcome = self.store().transaction(|txn| {
            let mut player = self.load_player(txn, username, now)?;
            let provider_chance =
                role_probability(&self.config().equipment_box, player.primary_occupation, Occupation::Provider);
            let role = if rolls.role < provider_chance {
                Occupation::Provider
            } else {
                Occupation::Chef
            };

            let matching = self.catalog().equipment_for(role, rolls.slot);
            let (item, fallback) = if matching.is_empty() {
                (fallback_item, true)
            } else {
                (matching[pick_index(rolls.pick, matching.len())], false)
            };

            debit(&mut player, price)?;
            inventory::deposit(&mut player, item, 1)?;
            self.save_player(txn, &mut player, now)?;
            Ok(BoxOutcome {
                item_id: item.id.clone(),
                role,
                slot: rolls.slot,
                fallback,
                price,
                money_left: player.money,
            })
        })?;
        log::info!(
            "{} opened an equipment box: {} ({}/{}{})",
            escape_log(username),
            outcome.item_id,
            outcome.role,
            outcome.slot,
            if outcome.fallback { ", fallback" } else { "" }
        );
        Ok(outcome)
    }
}
