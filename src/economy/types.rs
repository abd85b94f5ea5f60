use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::effects::EffectModifiers;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const ORDER_SCHEMA_VERSION: u8 = 1;
pub const LISTING_SCHEMA_VERSION: u8 = 1;

/// Every player owns exactly this many inventory slots, indexed `0..INVENTORY_SLOTS`.
pub const INVENTORY_SLOTS: usize = 8;

// ============================================================================
// Static content
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Seed,
    Raw,
    Ingredient,
    Meal,
    Equipment,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "SEED",
            Self::Raw => "RAW",
            Self::Ingredient => "INGREDIENT",
            Self::Meal => "MEAL",
            Self::Equipment => "EQUIPMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Occupation {
    /// Farming track.
    Provider,
    /// Cooking track.
    Chef,
}

impl Occupation {
    pub fn other(&self) -> Self {
        match self {
            Self::Provider => Self::Chef,
            Self::Chef => Self::Provider,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "PROVIDER",
            Self::Chef => "CHEF",
        }
    }
}

impl fmt::Display for Occupation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Occupation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "provider" => Ok(Self::Provider),
            "chef" => Ok(Self::Chef),
            other => Err(format!("unknown occupation '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlotKey {
    Head,
    UpperBody,
    LowerBody,
    Arm,
    Glove,
    Shoe,
}

impl EquipmentSlotKey {
    pub const ALL: [EquipmentSlotKey; 6] = [
        Self::Head,
        Self::UpperBody,
        Self::LowerBody,
        Self::Arm,
        Self::Glove,
        Self::Shoe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::UpperBody => "UPPER_BODY",
            Self::LowerBody => "LOWER_BODY",
            Self::Arm => "ARM",
            Self::Glove => "GLOVE",
            Self::Shoe => "SHOE",
        }
    }
}

impl fmt::Display for EquipmentSlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentSlotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| format!("unknown equipment slot '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Farm,
    Cook,
}

impl WorkType {
    /// Occupation whose track receives collection EXP.
    pub fn occupation(&self) -> Occupation {
        match self {
            Self::Farm => Occupation::Provider,
            Self::Cook => Occupation::Chef,
        }
    }
}

/// Named modifier carried by one equipment item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentEffect {
    /// Shift the hunger tier lookup this many bands toward Fit (farming).
    HungerPenaltyTierReduction { tiers: u8 },
    /// Chance to skip drawing each secondary recipe ingredient.
    SecondaryIngredientSaveChance { chance: f64 },
    MaxHungerBonus { kcal: f64 },
    /// Raises max hunger and adds to the satiety buff granted by meals.
    MaxHungerAndSatietyBonus { kcal: f64, satiety_pct: f64 },
    StackBonus { kind: ItemKind, amount: u32 },
    TimeReduction { work: WorkType, pct: f64 },
    DoubleYieldChance { chance: f64 },
    GourmetChance { chance: f64 },
    DecayReductionPerMinute { kcal: f64 },
    /// Percentage decay reduction while a cooking order is running.
    DecayReductionWhileCooking { pct: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentSpec {
    pub role: Occupation,
    pub slot: EquipmentSlotKey,
    pub effect: EquipmentEffect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub max_stack: u32,
    #[serde(default)]
    pub buy_price: Option<i64>,
    #[serde(default)]
    pub sell_price: Option<i64>,
    /// Meals: hunger restored when eaten.
    #[serde(default)]
    pub kcal: Option<f64>,
    #[serde(default)]
    pub buff_pct: Option<f64>,
    #[serde(default)]
    pub buff_mins: Option<u32>,
    /// Seeds: minutes from planting to harvest.
    #[serde(default)]
    pub grow_mins: Option<u32>,
    #[serde(default)]
    pub yield_item_id: Option<String>,
    #[serde(default)]
    pub yield_qty: Option<u32>,
    #[serde(default)]
    pub equipment: Option<EquipmentSpec>,
    /// Higher-value item substituted on a gourmet roll.
    #[serde(default)]
    pub gourmet_variant_id: Option<String>,
    #[serde(default)]
    pub exp_value: f64,
}

impl ItemRecord {
    pub fn new(id: &str, name: &str, kind: ItemKind, max_stack: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            max_stack,
            buy_price: None,
            sell_price: None,
            kcal: None,
            buff_pct: None,
            buff_mins: None,
            grow_mins: None,
            yield_item_id: None,
            yield_qty: None,
            equipment: None,
            gourmet_variant_id: None,
            exp_value: 0.0,
        }
    }

    pub fn seed(id: &str, name: &str, grow_mins: u32) -> Self {
        let mut item = Self::new(id, name, ItemKind::Seed, 10);
        item.grow_mins = Some(grow_mins);
        item
    }

    pub fn meal(id: &str, name: &str, kcal: f64) -> Self {
        let mut item = Self::new(id, name, ItemKind::Meal, 3);
        item.kcal = Some(kcal);
        item
    }

    pub fn equipment(id: &str, name: &str, role: Occupation, slot: EquipmentSlotKey, effect: EquipmentEffect) -> Self {
        let mut item = Self::new(id, name, ItemKind::Equipment, 1);
        item.equipment = Some(EquipmentSpec { role, slot, effect });
        item
    }

    pub fn with_buy_price(mut self, price: i64) -> Self {
        self.buy_price = Some(price);
        self
    }

    pub fn with_sell_price(mut self, price: i64) -> Self {
        self.sell_price = Some(price);
        self
    }

    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn with_exp_value(mut self, exp_value: f64) -> Self {
        self.exp_value = exp_value;
        self
    }

    pub fn with_yield(mut self, item_id: &str, qty: u32) -> Self {
        self.yield_item_id = Some(item_id.to_string());
        self.yield_qty = Some(qty);
        self
    }

    pub fn with_buff(mut self, pct: f64, mins: u32) -> Self {
        self.buff_pct = Some(pct);
        self.buff_mins = Some(mins);
        self
    }

    pub fn with_gourmet_variant(mut self, item_id: &str) -> Self {
        self.gourmet_variant_id = Some(item_id.to_string());
        self
    }

    pub fn is_edible(&self) -> bool {
        self.kcal.is_some_and(|k| k > 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeRecord {
    pub id: String,
    pub name: String,
    pub output_item_id: String,
    pub output_qty: u32,
    pub cook_mins: u32,
    pub unlock_price: i64,
    /// Ordered; every entry after the first counts as a secondary ingredient.
    pub ingredients: Vec<RecipeIngredient>,
}

impl RecipeRecord {
    pub fn new(id: &str, name: &str, output_item_id: &str, cook_mins: u32, unlock_price: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            output_item_id: output_item_id.to_string(),
            output_qty: 1,
            cook_mins,
            unlock_price,
            ingredients: Vec::new(),
        }
    }

    pub fn with_ingredient(mut self, item_id: &str, quantity: u32) -> Self {
        self.ingredients.push(RecipeIngredient {
            item_id: item_id.to_string(),
            quantity,
        });
        self
    }
}

// ============================================================================
// Player state
// ============================================================================

/// One of a player's fixed inventory slots. Empty exactly when `item_id` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventorySlot {
    pub index: u8,
    pub item_id: Option<String>,
    pub quantity: u32,
}

impl InventorySlot {
    pub fn empty(index: u8) -> Self {
        Self {
            index,
            item_id: None,
            quantity: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_id.is_none()
    }

    pub fn holds(&self, item_id: &str) -> bool {
        self.item_id.as_deref() == Some(item_id)
    }

    pub fn clear(&mut self) {
        self.item_id = None;
        self.quantity = 0;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EquipmentSlot {
    pub key: EquipmentSlotKey,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccupationTrack {
    /// 0 while locked, otherwise 1..=MAX_LEVEL.
    pub level: u32,
    pub exp: u64,
}

impl OccupationTrack {
    pub fn is_unlocked(&self) -> bool {
        self.level >= 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub money: i64,
    pub hunger: f64,
    pub hunger_updated_at: DateTime<Utc>,
    /// Fractional decay reduction, 0 when no buff is active.
    pub satiety_buff: f64,
    pub buff_expires_at: Option<DateTime<Utc>>,
    /// Latest completion time of a started cooking order.
    #[serde(default)]
    pub cooking_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub primary_occupation: Option<Occupation>,
    pub provider: OccupationTrack,
    pub chef: OccupationTrack,
    pub inventory: Vec<InventorySlot>,
    pub equipment: Vec<EquipmentSlot>,
    /// Aggregated equipment effects, refreshed on every equip/unequip.
    #[serde(default)]
    pub modifiers: EffectModifiers,
    #[serde(default)]
    pub unlocked_recipes: BTreeSet<String>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(username: &str, now: DateTime<Utc>, hunger: f64, money: i64) -> Self {
        Self {
            username: username.to_string(),
            created_at: now,
            updated_at: now,
            money,
            hunger,
            hunger_updated_at: now,
            satiety_buff: 0.0,
            buff_expires_at: None,
            cooking_until: None,
            primary_occupation: None,
            provider: OccupationTrack::default(),
            chef: OccupationTrack::default(),
            inventory: (0..INVENTORY_SLOTS as u8).map(InventorySlot::empty).collect(),
            equipment: EquipmentSlotKey::ALL
                .iter()
                .map(|key| EquipmentSlot {
                    key: *key,
                    item_id: None,
                })
                .collect(),
            modifiers: EffectModifiers::default(),
            unlocked_recipes: BTreeSet::new(),
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn track(&self, occupation: Occupation) -> &OccupationTrack {
        match occupation {
            Occupation::Provider => &self.provider,
            Occupation::Chef => &self.chef,
        }
    }

    pub fn track_mut(&mut self, occupation: Occupation) -> &mut OccupationTrack {
        match occupation {
            Occupation::Provider => &mut self.provider,
            Occupation::Chef => &mut self.chef,
        }
    }

    pub fn equipped(&self, key: EquipmentSlotKey) -> Option<&str> {
        self.equipment
            .iter()
            .find(|slot| slot.key == key)
            .and_then(|slot| slot.item_id.as_deref())
    }

    pub fn equipment_slot_mut(&mut self, key: EquipmentSlotKey) -> &mut EquipmentSlot {
        if let Some(pos) = self.equipment.iter().position(|slot| slot.key == key) {
            return &mut self.equipment[pos];
        }
        self.equipment.push(EquipmentSlot { key, item_id: None });
        let last = self.equipment.len() - 1;
        &mut self.equipment[last]
    }

    pub fn has_recipe(&self, recipe_id: &str) -> bool {
        self.unlocked_recipes.contains(recipe_id)
    }
}

// ============================================================================
// Work orders
// ============================================================================

/// Derived lifecycle state of a work order; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Ready,
    Collected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrder {
    pub id: u64,
    pub username: String,
    pub work: WorkType,
    /// Seed item for farming, output item for cooking.
    pub item_id: String,
    pub recipe_id: Option<String>,
    pub quantity: u32,
    pub started_at: DateTime<Utc>,
    pub completes_at: DateTime<Utc>,
    pub collected: bool,
    pub schema_version: u8,
}

impl WorkOrder {
    pub fn state(&self, now: DateTime<Utc>) -> OrderState {
        if self.collected {
            OrderState::Collected
        } else if now >= self.completes_at {
            OrderState::Ready
        } else {
            OrderState::Pending
        }
    }

    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == OrderState::Ready
    }
}

// ============================================================================
// Market listings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Sold,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketListing {
    pub id: u64,
    pub seller: String,
    pub item_id: String,
    pub quantity: u32,
    /// Total price for the whole listing.
    pub price: i64,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub buyer: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub schema_version: u8,
}
