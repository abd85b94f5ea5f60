//! # Configuration Management Module
//!
//! Loads and validates the TOML configuration used by the `homestead` binary
//! and by anything embedding the economy engine.
//!
//! ## Configuration Structure
//!
//! - [`EconomyConfig`] - hunger, money and modifier caps
//! - [`EquipmentBoxConfig`] - box price and role/slot roll weights
//! - [`StorageConfig`] - sled database location
//! - [`ContentConfig`] - optional JSON item/recipe catalog
//! - [`LoggingConfig`] - log level and optional file sink
//!
//! ## Usage
//!
//! ```rust,no_run
//! use homestead::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("homestead.toml").await?;
//!     let config = Config::load("homestead.toml").await?;
//!     println!("Max hunger: {}", config.economy.max_hunger);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [economy]
//! max_hunger = 2400.0
//! game_day_minutes = 180.0
//! starting_money = 1000
//!
//! [economy.equipment_box]
//! price = 420
//! primary_bias = 0.7
//!
//! [storage]
//! data_dir = "./data"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::economy::EquipmentSlotKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub economy: EconomyConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub content: ContentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomyConfig {
    /// Hunger ceiling in kcal before equipment bonuses.
    #[serde(default = "default_max_hunger")]
    pub max_hunger: f64,
    /// Real minutes in one game day; a full bar drains over one day.
    #[serde(default = "default_game_day_minutes")]
    pub game_day_minutes: f64,
    #[serde(default = "default_starting_money")]
    pub starting_money: i64,
    #[serde(default = "default_max_satiety_buff")]
    pub max_satiety_buff: f64,
    #[serde(default = "default_max_time_reduction")]
    pub max_time_reduction: f64,
    #[serde(default)]
    pub equipment_box: EquipmentBoxConfig,
}

fn default_max_hunger() -> f64 {
    2400.0
}

fn default_game_day_minutes() -> f64 {
    180.0
}

fn default_starting_money() -> i64 {
    1000
}

fn default_max_satiety_buff() -> f64 {
    0.9
}

fn default_max_time_reduction() -> f64 {
    0.9
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            max_hunger: default_max_hunger(),
            game_day_minutes: default_game_day_minutes(),
            starting_money: default_starting_money(),
            max_satiety_buff: default_max_satiety_buff(),
            max_time_reduction: default_max_time_reduction(),
            equipment_box: EquipmentBoxConfig::default(),
        }
    }
}

impl EconomyConfig {
    /// Base hunger decay in kcal per real minute.
    pub fn decay_per_minute(&self) -> f64 {
        self.max_hunger / self.game_day_minutes
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_hunger > 0.0) {
            return Err(anyhow!("economy.max_hunger must be positive"));
        }
        if !(self.game_day_minutes > 0.0) {
            return Err(anyhow!("economy.game_day_minutes must be positive"));
        }
        if self.starting_money < 0 {
            return Err(anyhow!("economy.starting_money cannot be negative"));
        }
        if !(0.0..=1.0).contains(&self.max_satiety_buff) {
            return Err(anyhow!("economy.max_satiety_buff must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.max_time_reduction) {
            return Err(anyhow!("economy.max_time_reduction must be within 0..=1"));
        }
        self.equipment_box.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentBoxConfig {
    #[serde(default = "default_box_price")]
    pub price: i64,
    /// Probability that the rolled role matches the player's primary occupation.
    #[serde(default = "default_primary_bias")]
    pub primary_bias: f64,
    #[serde(default)]
    pub slot_weights: SlotWeights,
}

fn default_box_price() -> i64 {
    420
}

fn default_primary_bias() -> f64 {
    0.7
}

impl Default for EquipmentBoxConfig {
    fn default() -> Self {
        Self {
            price: default_box_price(),
            primary_bias: default_primary_bias(),
            slot_weights: SlotWeights::default(),
        }
    }
}

impl EquipmentBoxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.price <= 0 {
            return Err(anyhow!("economy.equipment_box.price must be positive"));
        }
        if !(0.0..=1.0).contains(&self.primary_bias) {
            return Err(anyhow!("economy.equipment_box.primary_bias must be within 0..=1"));
        }
        if self.slot_weights.total() == 0 {
            return Err(anyhow!("economy.equipment_box.slot_weights cannot all be zero"));
        }
        Ok(())
    }
}

/// Relative weight of each equipment slot in a box roll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotWeights {
    pub head: u32,
    pub upper_body: u32,
    pub lower_body: u32,
    pub arm: u32,
    pub glove: u32,
    pub shoe: u32,
}

impl Default for SlotWeights {
    fn default() -> Self {
        Self {
            head: 14,
            upper_body: 18,
            lower_body: 18,
            arm: 18,
            glove: 16,
            shoe: 16,
        }
    }
}

impl SlotWeights {
    pub fn weight(&self, key: EquipmentSlotKey) -> u32 {
        match key {
            EquipmentSlotKey::Head => self.head,
            EquipmentSlotKey::UpperBody => self.upper_body,
            EquipmentSlotKey::LowerBody => self.lower_body,
            EquipmentSlotKey::Arm => self.arm,
            EquipmentSlotKey::Glove => self.glove,
            EquipmentSlotKey::Shoe => self.shoe,
        }
    }

    pub fn total(&self) -> u32 {
        EquipmentSlotKey::ALL.iter().map(|key| self.weight(*key)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    /// JSON catalog; the built-in catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir cannot be empty"));
        }
        self.economy.validate()
    }

    /// Location of the sled database inside `data_dir`.
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.storage.data_dir).join("economy")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            economy: EconomyConfig::default(),
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            content: ContentConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("homestead.log".to_string()),
            },
        }
    }
}
