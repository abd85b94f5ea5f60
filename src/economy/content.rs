//! Static item and recipe content.
//!
//! Content is data-driven: a JSON catalog file can replace the built-in
//! [`Catalog::standard`] set without recompiling. Every cross reference
//! (seed yields, recipe ingredients, gourmet variants) is checked once at load
//! time so the engine can treat a dangling id as an internal error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::errors::EconomyError;
use super::types::{
    EquipmentEffect, EquipmentSlotKey, ItemKind, ItemRecord, Occupation, RecipeRecord, WorkType,
};

/// On-disk layout of a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub recipes: Vec<RecipeRecord>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    items: BTreeMap<String, ItemRecord>,
    recipes: BTreeMap<String, RecipeRecord>,
}

impl Catalog {
    pub fn new(items: Vec<ItemRecord>, recipes: Vec<RecipeRecord>) -> Result<Self, EconomyError> {
        let mut item_map = BTreeMap::new();
        for item in items {
            if item.id.trim().is_empty() {
                return Err(EconomyError::Internal("catalog item with empty id".into()));
            }
            if let Some(prev) = item_map.insert(item.id.clone(), item) {
                return Err(EconomyError::Internal(format!("duplicate item id '{}'", prev.id)));
            }
        }
        let mut recipe_map = BTreeMap::new();
        for recipe in recipes {
            if let Some(prev) = recipe_map.insert(recipe.id.clone(), recipe) {
                return Err(EconomyError::Internal(format!("duplicate recipe id '{}'", prev.id)));
            }
        }
        let catalog = Self {
            items: item_map,
            recipes: recipe_map,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, EconomyError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| EconomyError::Internal(format!("failed to parse catalog: {}", e)))?;
        Self::new(file.items, file.recipes)
    }

    /// Load a catalog from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EconomyError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&contents).map_err(|e| {
            EconomyError::Internal(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Self::new(file.items, file.recipes)
    }

    pub fn to_file(&self) -> CatalogFile {
        CatalogFile {
            items: self.items.values().cloned().collect(),
            recipes: self.recipes.values().cloned().collect(),
        }
    }

    fn validate(&self) -> Result<(), EconomyError> {
        for item in self.items.values() {
            if item.max_stack == 0 {
                return Err(EconomyError::Internal(format!(
                    "item '{}' has a max stack of zero",
                    item.id
                )));
            }
            if let Some(yield_id) = &item.yield_item_id {
                self.ensure_item(yield_id, &item.id)?;
            }
            if let Some(variant) = &item.gourmet_variant_id {
                self.ensure_item(variant, &item.id)?;
            }
            match (item.kind, &item.equipment) {
                (ItemKind::Equipment, None) => {
                    return Err(EconomyError::Internal(format!(
                        "equipment item '{}' has no role, slot or effect",
                        item.id
                    )))
                }
                (kind, Some(_)) if kind != ItemKind::Equipment => {
                    return Err(EconomyError::Internal(format!(
                        "item '{}' carries an equipment effect but is {}",
                        item.id,
                        kind.as_str()
                    )))
                }
                _ => {}
            }
        }
        for recipe in self.recipes.values() {
            self.ensure_item(&recipe.output_item_id, &recipe.id)?;
            if recipe.output_qty == 0 {
                return Err(EconomyError::Internal(format!(
                    "recipe '{}' produces nothing",
                    recipe.id
                )));
            }
            for ingredient in &recipe.ingredients {
                self.ensure_item(&ingredient.item_id, &recipe.id)?;
            }
        }
        Ok(())
    }

    fn ensure_item(&self, item_id: &str, referenced_by: &str) -> Result<(), EconomyError> {
        if self.items.contains_key(item_id) {
            Ok(())
        } else {
            Err(EconomyError::Internal(format!(
                "'{}' references unknown item '{}'",
                referenced_by, item_id
            )))
        }
    }

    pub fn item(&self, item_id: &str) -> Result<&ItemRecord, EconomyError> {
        self.items
            .get(item_id)
            .ok_or_else(|| EconomyError::NotFound(format!("item: {}", item_id)))
    }

    pub fn recipe(&self, recipe_id: &str) -> Result<&RecipeRecord, EconomyError> {
        self.recipes
            .get(recipe_id)
            .ok_or_else(|| EconomyError::NotFound(format!("recipe: {}", recipe_id)))
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values()
    }

    pub fn recipes(&self) -> impl Iterator<Item = &RecipeRecord> {
        self.recipes.values()
    }

    pub fn equipment_items(&self) -> Vec<&ItemRecord> {
        self.items
            .values()
            .filter(|item| item.equipment.is_some())
            .collect()
    }

    /// Equipment matching an exact role and slot.
    pub fn equipment_for(&self, role: Occupation, slot: EquipmentSlotKey) -> Vec<&ItemRecord> {
        self.items
            .values()
            .filter(|item| {
                item.equipment
                    .as_ref()
                    .is_some_and(|spec| spec.role == role && spec.slot == slot)
            })
            .collect()
    }

    /// The seed data the game ships with.
    pub fn standard() -> Self {
        let items = standard_items();
        let recipes = vec![
            RecipeRecord::new("recipe_chicken_salad", "Chicken Salad", "chicken_salad", 5, 250)
                .with_ingredient("chicken_meat", 1)
                .with_ingredient("vegetable", 2),
            RecipeRecord::new("recipe_beef_steak", "Beef Steak", "beef_steak", 10, 600)
                .with_ingredient("beef_meat", 1)
                .with_ingredient("vegetable", 1)
                .with_ingredient("salt", 1),
        ];
        Self {
            items: items.into_iter().map(|item| (item.id.clone(), item)).collect(),
            recipes: recipes
                .into_iter()
                .map(|recipe| (recipe.id.clone(), recipe))
                .collect(),
        }
    }
}

fn standard_items() -> Vec<ItemRecord> {
    use EquipmentSlotKey::*;
    use Occupation::*;

    vec![
        // Seeds
        ItemRecord::seed("chicken_egg", "Chicken Egg", 10)
            .with_buy_price(50)
            .with_yield("chicken_meat", 1)
            .with_exp_value(0.5),
        ItemRecord::seed("beef_calf", "Beef Calf", 20)
            .with_buy_price(120)
            .with_yield("beef_meat", 1)
            .with_exp_value(0.8),
        ItemRecord::seed("vegetable_seed", "Vegetable Seed", 8)
            .with_buy_price(30)
            .with_yield("vegetable", 2)
            .with_exp_value(0.3),
        // Produce
        ItemRecord::new("chicken_meat", "Chicken Meat", ItemKind::Raw, 5)
            .with_sell_price(80)
            .with_exp_value(1.0),
        ItemRecord::new("beef_meat", "Beef Meat", ItemKind::Raw, 5)
            .with_sell_price(180)
            .with_exp_value(1.5),
        ItemRecord::new("vegetable", "Vegetable", ItemKind::Raw, 10)
            .with_sell_price(40)
            .with_exp_value(0.5),
        ItemRecord::new("salt", "Salt", ItemKind::Ingredient, 20)
            .with_buy_price(20)
            .with_exp_value(0.2),
        // Meals
        ItemRecord::meal("chicken_salad", "Chicken Salad", 80.0)
            .with_sell_price(150)
            .with_buff(0.05, 30)
            .with_gourmet_variant("gourmet_chicken_salad")
            .with_exp_value(2.0),
        ItemRecord::meal("beef_steak", "Beef Steak", 360.0)
            .with_sell_price(400)
            .with_buff(0.15, 60)
            .with_gourmet_variant("gourmet_beef_steak")
            .with_exp_value(3.0),
        ItemRecord::meal("gourmet_chicken_salad", "Gourmet Chicken Salad", 120.0)
            .with_sell_price(300)
            .with_buff(0.08, 45)
            .with_exp_value(3.0),
        ItemRecord::meal("gourmet_beef_steak", "Gourmet Beef Steak", 480.0)
            .with_sell_price(800)
            .with_buff(0.2, 90)
            .with_exp_value(4.5),
        // Equipment, one piece per role and slot
        ItemRecord::equipment(
            "sun_hat",
            "Sun Hat",
            Provider,
            Head,
            EquipmentEffect::HungerPenaltyTierReduction { tiers: 1 },
        )
        .with_sell_price(320),
        ItemRecord::equipment(
            "toque_blanche",
            "Toque Blanche",
            Chef,
            Head,
            EquipmentEffect::SecondaryIngredientSaveChance { chance: 0.1 },
        )
        .with_sell_price(360),
        ItemRecord::equipment(
            "field_shirt",
            "Field Shirt",
            Provider,
            UpperBody,
            EquipmentEffect::MaxHungerBonus { kcal: 300.0 },
        )
        .with_sell_price(420),
        ItemRecord::equipment(
            "apron",
            "Apron",
            Chef,
            UpperBody,
            EquipmentEffect::MaxHungerAndSatietyBonus { kcal: 150.0, satiety_pct: 0.1 },
        )
        .with_sell_price(440),
        ItemRecord::equipment(
            "cargo_pants",
            "Cargo Pants",
            Provider,
            LowerBody,
            EquipmentEffect::StackBonus { kind: ItemKind::Raw, amount: 5 },
        )
        .with_sell_price(520),
        ItemRecord::equipment(
            "slack_pants",
            "Slack Pants",
            Chef,
            LowerBody,
            EquipmentEffect::StackBonus { kind: ItemKind::Ingredient, amount: 5 },
        )
        .with_sell_price(520),
        ItemRecord::equipment(
            "sweatband",
            "Sweatband",
            Provider,
            Arm,
            EquipmentEffect::TimeReduction { work: WorkType::Farm, pct: 0.1 },
        )
        .with_sell_price(600),
        ItemRecord::equipment(
            "wrist_support",
            "Wrist Support",
            Chef,
            Arm,
            EquipmentEffect::TimeReduction { work: WorkType::Cook, pct: 0.1 },
        )
        .with_sell_price(600),
        ItemRecord::equipment(
            "work_gloves",
            "Work Gloves",
            Provider,
            Glove,
            EquipmentEffect::DoubleYieldChance { chance: 0.08 },
        )
        .with_sell_price(650),
        ItemRecord::equipment(
            "latex_gloves",
            "Latex Gloves",
            Chef,
            Glove,
            EquipmentEffect::GourmetChance { chance: 0.08 },
        )
        .with_sell_price(650),
        ItemRecord::equipment(
            "mud_boots",
            "Mud Boots",
            Provider,
            Shoe,
            EquipmentEffect::DecayReductionPerMinute { kcal: 1.5 },
        )
        .with_sell_price(700),
        ItemRecord::equipment(
            "anti_slip_shoes",
            "Anti-Slip Shoes",
            Chef,
            Shoe,
            EquipmentEffect::DecayReductionWhileCooking { pct: 0.2 },
        )
        .with_sell_price(700),
    ]
}
