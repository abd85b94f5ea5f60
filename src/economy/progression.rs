//! Occupation EXP and level bookkeeping.
//!
//! Levels are always derived from cumulative EXP with [`level_from_exp`], never
//! incremented, so a large grant can skip several levels in one step.

use serde::{Deserialize, Serialize};

use super::errors::EconomyError;
use super::types::{ItemKind, ItemRecord, Occupation, PlayerRecord};

pub const MAX_LEVEL: u32 = 50;
pub const SECOND_OCCUPATION_UNLOCK_LEVEL: u32 = 5;

/// Cumulative EXP needed to reach `level`.
pub fn level_threshold(level: u32) -> u64 {
    if level <= 1 {
        0
    } else {
        let level = level.min(MAX_LEVEL) as u64;
        level * level * 100
    }
}

pub fn level_from_exp(exp: u64) -> u32 {
    (1..=MAX_LEVEL)
        .rev()
        .find(|level| exp >= level_threshold(*level))
        .unwrap_or(1)
}

/// Threshold of the next level, `None` at the cap.
pub fn exp_for_next_level(level: u32) -> Option<u64> {
    if level >= MAX_LEVEL {
        None
    } else {
        Some(level_threshold(level + 1))
    }
}

/// EXP for collecting `quantity` units of `item`.
pub fn collection_exp(item: &ItemRecord, quantity: u32) -> u64 {
    (item.exp_value.max(0.0) * quantity as f64 * 10.0).floor() as u64
}

/// EXP for selling at `price` while at `hunger` out of `max_hunger`.
pub fn sale_exp(item: &ItemRecord, price: i64, hunger: f64, max_hunger: f64) -> u64 {
    if max_hunger <= 0.0 || price <= 0 {
        return 0;
    }
    let ratio = (hunger / max_hunger).max(0.0);
    (ratio * item.exp_value.max(0.0) * price as f64).floor() as u64
}

/// Track credited when an item of `kind` is sold.
pub fn sale_occupation(kind: ItemKind) -> Option<Occupation> {
    match kind {
        ItemKind::Seed | ItemKind::Raw => Some(Occupation::Provider),
        ItemKind::Ingredient | ItemKind::Meal => Some(Occupation::Chef),
        ItemKind::Equipment => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpGrant {
    pub occupation: Occupation,
    pub gained: u64,
    pub old_level: u32,
    pub new_level: u32,
}

impl ExpGrant {
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

/// Add EXP to an unlocked track. Locked tracks and zero grants are ignored.
pub fn grant_exp(player: &mut PlayerRecord, occupation: Occupation, amount: u64) -> Option<ExpGrant> {
    let track = player.track_mut(occupation);
    if !track.is_unlocked() || amount == 0 {
        return None;
    }
    let old_level = track.level;
    track.exp = track.exp.saturating_add(amount);
    track.level = level_from_exp(track.exp).max(old_level);
    let grant = ExpGrant {
        occupation,
        gained: amount,
        old_level,
        new_level: track.level,
    };
    if grant.leveled_up() {
        log::info!(
            "{} reached {} level {}",
            crate::logutil::escape_log(&player.username),
            occupation,
            grant.new_level
        );
    }
    Some(grant)
}

/// One-time choice of the primary occupation.
pub fn select_primary(player: &mut PlayerRecord, occupation: Occupation) -> Result<(), EconomyError> {
    if let Some(existing) = player.primary_occupation {
        return Err(EconomyError::Conflict(format!(
            "primary occupation already chosen: {}",
            existing
        )));
    }
    player.primary_occupation = Some(occupation);
    let track = player.track_mut(occupation);
    track.level = track.level.max(1);
    Ok(())
}

/// Unlock the track that is not the primary one. Returns the unlocked occupation.
pub fn unlock_secondary(player: &mut PlayerRecord) -> Result<Occupation, EconomyError> {
    let primary = player.primary_occupation.ok_or_else(|| {
        EconomyError::Unauthorized("choose a primary occupation first".into())
    })?;
    let secondary = primary.other();
    if player.track(secondary).is_unlocked() {
        return Err(EconomyError::Conflict(format!("{} is already unlocked", secondary)));
    }
    let primary_level = player.track(primary).level;
    if primary_level < SECOND_OCCUPATION_UNLOCK_LEVEL {
        return Err(EconomyError::Unauthorized(format!(
            "{} level {} required, currently {}",
            primary, SECOND_OCCUPATION_UNLOCK_LEVEL, primary_level
        )));
    }
    player.track_mut(secondary).level = 1;
    Ok(secondary)
}

/// Progress of one track within its current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpProgress {
    pub occupation: Occupation,
    pub level: u32,
    pub exp: u64,
    pub exp_in_level: u64,
    /// EXP between this level's threshold and the next; 0 at the cap.
    pub exp_span: u64,
    pub percent: f64,
    pub max_level: bool,
}

pub fn exp_progress(player: &PlayerRecord, occupation: Occupation) -> ExpProgress {
    let track = player.track(occupation);
    let base = level_threshold(track.level);
    let exp_in_level = track.exp.saturating_sub(base);
    match exp_for_next_level(track.level) {
        Some(next) if track.is_unlocked() => {
            let span = next.saturating_sub(base);
            let percent = if span == 0 {
                0.0
            } else {
                (exp_in_level as f64 / span as f64 * 100.0).min(100.0)
            };
            ExpProgress {
                occupation,
                level: track.level,
                exp: track.exp,
                exp_in_level,
                exp_span: span,
                percent,
                max_level: false,
            }
        }
        Some(_) => ExpProgress {
            occupation,
            level: 0,
            exp: track.exp,
            exp_in_level: 0,
            exp_span: 0,
            percent: 0.0,
            max_level: false,
        },
        None => ExpProgress {
            occupation,
            level: track.level,
            exp: track.exp,
            exp_in_level,
            exp_span: 0,
            percent: 100.0,
            max_level: true,
        },
    }
}
