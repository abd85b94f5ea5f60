//! Lazy hunger decay.
//!
//! Nothing ticks in the background. Hunger is a pure function of the stored
//! value, the time it was stored, and the modifiers in effect, so every action
//! calls [`recompute`] first and persists the result.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ItemRecord, PlayerRecord};
use crate::config::EconomyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HungerTier {
    Fit,
    Normal,
    Hungry,
    Starving,
}

impl HungerTier {
    /// Best band first.
    const BANDS: [HungerTier; 4] = [Self::Fit, Self::Normal, Self::Hungry, Self::Starving];

    /// Production duration multiplier.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Fit => 1.0,
            Self::Normal => 1.2,
            Self::Hungry => 1.5,
            Self::Starving => 2.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fit => "Fit",
            Self::Normal => "Normal",
            Self::Hungry => "Hungry",
            Self::Starving => "Starving",
        }
    }

    /// Move `steps` bands toward Fit.
    pub fn improved_by(self, steps: u8) -> Self {
        let pos = Self::BANDS.iter().position(|t| *t == self).unwrap_or(0);
        Self::BANDS[pos.saturating_sub(steps as usize)]
    }
}

/// Band for `hunger` as a share of `max`.
pub fn tier_for(hunger: f64, max: f64) -> HungerTier {
    let percent = if max > 0.0 { hunger / max * 100.0 } else { 0.0 };
    if percent >= 80.0 {
        HungerTier::Fit
    } else if percent >= 40.0 {
        HungerTier::Normal
    } else if percent >= 20.0 {
        HungerTier::Hungry
    } else {
        HungerTier::Starving
    }
}

/// Max hunger including equipment bonuses.
pub fn effective_max(player: &PlayerRecord, cfg: &EconomyConfig) -> f64 {
    cfg.max_hunger + player.modifiers.max_hunger_bonus.max(0.0)
}

pub fn current_tier(player: &PlayerRecord, cfg: &EconomyConfig) -> HungerTier {
    tier_for(player.hunger, effective_max(player, cfg))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn minutes(span: Duration) -> f64 {
    span.num_milliseconds() as f64 / 60_000.0
}

/// Bring hunger, buff and cooking state up to `now`.
///
/// Returns `false` without touching the record when no time has passed, so
/// repeated calls at the same instant are no-ops.
pub fn recompute(player: &mut PlayerRecord, cfg: &EconomyConfig, now: DateTime<Utc>) -> bool {
    let elapsed = minutes(now - player.hunger_updated_at);
    if elapsed <= 0.0 {
        return false;
    }

    let mut rate = (cfg.decay_per_minute() - player.modifiers.decay_reduction_per_min).max(0.0);
    let buff_active = player.satiety_buff > 0.0 && player.buff_expires_at.is_some_and(|at| now < at);
    if buff_active {
        rate *= 1.0 - player.satiety_buff.clamp(0.0, 1.0);
    }

    let cooking_minutes = player
        .cooking_until
        .map(|until| minutes(until.min(now) - player.hunger_updated_at).clamp(0.0, elapsed))
        .unwrap_or(0.0);
    let cooking_factor = 1.0 - player.modifiers.decay_reduction_pct_while_cooking.clamp(0.0, 1.0);
    let decay = rate * (elapsed - cooking_minutes) + rate * cooking_factor * cooking_minutes;

    let before = player.hunger;
    player.hunger = round2((player.hunger - decay).clamp(0.0, effective_max(player, cfg)));
    player.hunger_updated_at = now;

    if !buff_active {
        player.satiety_buff = 0.0;
        player.buff_expires_at = None;
    }
    if player.cooking_until.is_some_and(|until| until <= now) {
        player.cooking_until = None;
    }

    log::debug!(
        "hunger for {} decayed {:.2} -> {:.2} over {:.2} min",
        crate::logutil::escape_log(&player.username),
        before,
        player.hunger,
        elapsed
    );
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealOutcome {
    pub hunger: f64,
    pub satiety_buff: f64,
    pub buff_expires_at: Option<DateTime<Utc>>,
}

/// Eat `meal`. The caller has already removed it from the inventory.
///
/// A meal with a buff replaces any active buff rather than stacking with it.
pub fn apply_meal(player: &mut PlayerRecord, cfg: &EconomyConfig, meal: &ItemRecord, now: DateTime<Utc>) -> MealOutcome {
    recompute(player, cfg, now);
    let kcal = meal.kcal.unwrap_or(0.0).max(0.0);
    player.hunger = round2((player.hunger + kcal).min(effective_max(player, cfg)));
    player.hunger_updated_at = now;

    let buff_pct = meal.buff_pct.unwrap_or(0.0);
    let buff_mins = meal.buff_mins.unwrap_or(0);
    if buff_pct > 0.0 && buff_mins > 0 {
        let boosted = buff_pct + player.modifiers.satiety_bonus.max(0.0);
        player.satiety_buff = boosted.min(cfg.max_satiety_buff);
        player.buff_expires_at = Some(now + Duration::minutes(buff_mins as i64));
    }

    MealOutcome {
        hunger: player.hunger,
        satiety_buff: player.satiety_buff,
        buff_expires_at: player.buff_expires_at,
    }
}

/// Pull hunger back under the ceiling after a max-hunger bonus goes away.
pub fn clamp_to_max(player: &mut PlayerRecord, cfg: &EconomyConfig) {
    let max = effective_max(player, cfg);
    if player.hunger > max {
        player.hunger = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::content::Catalog;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single().expect("valid time")
    }

    fn player_at(hunger: f64) -> PlayerRecord {
        PlayerRecord::new("cook", start(), hunger, 0)
    }

    #[test]
    fn tiers_follow_percentage_bands() {
        assert_eq!(tier_for(2400.0, 2400.0), HungerTier::Fit);
        assert_eq!(tier_for(1920.0, 2400.0), HungerTier::Fit);
        assert_eq!(tier_for(1919.0, 2400.0), HungerTier::Normal);
        assert_eq!(tier_for(960.0, 2400.0), HungerTier::Normal);
        assert_eq!(tier_for(480.0, 2400.0), HungerTier::Hungry);
        assert_eq!(tier_for(479.99, 2400.0), HungerTier::Starving);
        assert_eq!(HungerTier::Starving.improved_by(1), HungerTier::Hungry);
        assert_eq!(HungerTier::Normal.improved_by(5), HungerTier::Fit);
    }

    #[test]
    fn decay_is_linear_and_idempotent() {
        let cfg = EconomyConfig::default();
        let mut player = player_at(2400.0);
        let later = start() + Duration::minutes(30);

        assert!(recompute(&mut player, &cfg, later));
        assert_eq!(player.hunger, 2000.0);
        let snapshot = player.clone();
        assert!(!recompute(&mut player, &cfg, later));
        assert_eq!(player, snapshot);

        // A clock step backwards is also a no-op.
        assert!(!recompute(&mut player, &cfg, start()));
        assert_eq!(player, snapshot);
    }

    #[test]
    fn hunger_never_drops_below_zero() {
        let cfg = EconomyConfig::default();
        let mut player = player_at(100.0);
        recompute(&mut player, &cfg, start() + Duration::hours(10));
        assert_eq!(player.hunger, 0.0);
    }

    #[test]
    fn active_buff_slows_decay_and_expired_buff_clears() {
        let cfg = EconomyConfig::default();
        let mut player = player_at(2400.0);
        player.satiety_buff = 0.25;
        player.buff_expires_at = Some(start() + Duration::minutes(60));

        recompute(&mut player, &cfg, start() + Duration::minutes(30));
        assert_eq!(player.hunger, 2100.0);
        assert_eq!(player.satiety_buff, 0.25);

        recompute(&mut player, &cfg, start() + Duration::minutes(90));
        assert_eq!(player.satiety_buff, 0.0);
        assert!(player.buff_expires_at.is_none());
        assert_eq!(player.hunger, 1300.0);
    }

    #[test]
    fn meals_clamp_to_max_and_last_buff_wins() {
        let cfg = EconomyConfig::default();
        let catalog = Catalog::standard();
        let mut player = player_at(2000.0);

        let salad = catalog.item("chicken_salad").expect("salad");
        let outcome = apply_meal(&mut player, &cfg, salad, start());
        assert_eq!(outcome.hunger, 2080.0);
        assert_eq!(outcome.satiety_buff, 0.05);

        let mut big = ItemRecord::meal("feast", "Feast", 500.0);
        big.buff_pct = Some(0.02);
        big.buff_mins = Some(10);
        let outcome = apply_meal(&mut player, &cfg, &big, start());
        assert_eq!(outcome.hunger, 2400.0);
        assert_eq!(outcome.satiety_buff, 0.02);
        assert_eq!(outcome.buff_expires_at, Some(start() + Duration::minutes(10)));
    }

    #[test]
    fn cooking_window_decays_at_reduced_rate() {
        let cfg = EconomyConfig::default();
        let mut player = player_at(2400.0);
        player.modifiers.decay_reduction_pct_while_cooking = 0.5;
        player.cooking_until = Some(start() + Duration::minutes(30));

        recompute(&mut player, &cfg, start() + Duration::minutes(60));
        // 30 min at half rate (200) + 30 min at full rate (400).
        assert_eq!(player.hunger, 1800.0);
        assert!(player.cooking_until.is_none());
    }

    #[test]
    fn per_minute_reduction_lowers_the_base_rate() {
        let cfg = EconomyConfig {
            max_hunger: 2400.0,
            game_day_minutes: 240.0,
            ..EconomyConfig::default()
        };
        let mut player = player_at(2400.0);
        player.modifiers.decay_reduction_per_min = 1.5;
        recompute(&mut player, &cfg, start() + Duration::minutes(10));
        assert_eq!(player.hunger, 2315.0);
    }
}
