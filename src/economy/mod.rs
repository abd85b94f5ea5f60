//! Real-time farming and cooking economy.
//! Hunger, production readiness and buff expiry are recomputed lazily from
//! stored timestamps; every player action is a single sled transaction.

pub mod content;
pub mod effects;
pub mod engine;
pub mod errors;
pub mod hunger;
pub mod inventory;
pub mod market;
pub mod production;
pub mod progression;
pub mod storage;
pub mod types;

pub use content::{Catalog, CatalogFile};
pub use effects::EffectModifiers;
pub use engine::{validate_username, Economy, PlayerStatus};
pub use errors::{EconomyError, ErrorKind};
pub use hunger::{apply_meal, recompute, tier_for, HungerTier, MealOutcome};
pub use inventory::{capacity_for, deposit, total_quantity, withdraw, EquipChange};
pub use market::{
    box_odds_table, role_probability, BoxOdds, BoxOutcome, ListingOutcome, RecipeEntry,
    RecipeUnlock, ShopEntry, ShopPurchase,
};
pub use production::{
    work_duration, BlockedOrder, CollectAllOutcome, CollectOutcome, OrderView, WorkRequest,
};
pub use progression::{
    exp_for_next_level, level_from_exp, level_threshold, ExpGrant, ExpProgress, MAX_LEVEL,
    SECOND_OCCUPATION_UNLOCK_LEVEL,
};
pub use storage::{EconomyStore, EconomyStoreBuilder};
pub use types::*;
