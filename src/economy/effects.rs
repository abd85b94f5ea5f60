use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::content::Catalog;
use super::errors::EconomyError;
use super::types::{EquipmentEffect, EquipmentSlot, ItemKind, ItemRecord, WorkType};

/// Aggregated modifiers from everything a player has equipped.
///
/// Resolved once whenever equipment changes and cached on the player record,
/// so hot paths (hunger decay, production timing, deposits) never look at
/// individual items.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EffectModifiers {
    pub farm_time_reduction: f64,
    pub cook_time_reduction: f64,
    pub double_yield_chance: f64,
    pub gourmet_chance: f64,
    pub ingredient_save_chance: f64,
    pub max_hunger_bonus: f64,
    pub satiety_bonus: f64,
    pub stack_bonus: BTreeMap<ItemKind, u32>,
    pub decay_reduction_per_min: f64,
    pub decay_reduction_pct_while_cooking: f64,
    pub hunger_tier_reduction: u8,
}

impl EffectModifiers {
    pub fn resolve(equipment: &[EquipmentSlot], catalog: &Catalog) -> Result<Self, EconomyError> {
        let mut modifiers = Self::default();
        for slot in equipment {
            let Some(item_id) = slot.item_id.as_deref() else {
                continue;
            };
            let item = catalog
                .item(item_id)
                .map_err(|_| EconomyError::Internal(format!("equipped item '{}' is not in the catalog", item_id)))?;
            let spec = item.equipment.as_ref().ok_or_else(|| {
                EconomyError::Internal(format!("equipped item '{}' is not equipment", item_id))
            })?;
            modifiers.apply(&spec.effect);
        }
        Ok(modifiers)
    }

    fn apply(&mut self, effect: &EquipmentEffect) {
        match effect {
            EquipmentEffect::HungerPenaltyTierReduction { tiers } => {
                self.hunger_tier_reduction = self.hunger_tier_reduction.saturating_add(*tiers);
            }
            EquipmentEffect::SecondaryIngredientSaveChance { chance } => {
                self.ingredient_save_chance += chance;
            }
            EquipmentEffect::MaxHungerBonus { kcal } => self.max_hunger_bonus += kcal,
            EquipmentEffect::MaxHungerAndSatietyBonus { kcal, satiety_pct } => {
                self.max_hunger_bonus += kcal;
                self.satiety_bonus += satiety_pct;
            }
            EquipmentEffect::StackBonus { kind, amount } => {
                *self.stack_bonus.entry(*kind).or_insert(0) += amount;
            }
            EquipmentEffect::TimeReduction { work, pct } => match work {
                WorkType::Farm => self.farm_time_reduction += pct,
                WorkType::Cook => self.cook_time_reduction += pct,
            },
            EquipmentEffect::DoubleYieldChance { chance } => self.double_yield_chance += chance,
            EquipmentEffect::GourmetChance { chance } => self.gourmet_chance += chance,
            EquipmentEffect::DecayReductionPerMinute { kcal } => {
                self.decay_reduction_per_min += kcal;
            }
            EquipmentEffect::DecayReductionWhileCooking { pct } => {
                self.decay_reduction_pct_while_cooking += pct;
            }
        }
    }

    /// Effective stack limit for `item` including category bonuses.
    pub fn stack_limit(&self, item: &ItemRecord) -> u32 {
        item.max_stack + self.stack_bonus.get(&item.kind).copied().unwrap_or(0)
    }

    /// Duration reduction for `work`, clamped to `[0, cap]`.
    pub fn time_reduction(&self, work: WorkType, cap: f64) -> f64 {
        let raw = match work {
            WorkType::Farm => self.farm_time_reduction,
            WorkType::Cook => self.cook_time_reduction,
        };
        raw.clamp(0.0, cap.max(0.0))
    }
}

/// Clamp a configured probability into `[0, 1]`.
pub fn chance(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
