//! # Homestead - Real-time Farming and Cooking Economy
//!
//! Homestead is a persistent multiplayer resource economy. Players lose hunger
//! over real time, run timed farming and cooking orders, keep their goods in a
//! small fixed-slot inventory, trade through a peer market and an NPC shop, and
//! level two independent occupations.
//!
//! ## Features
//!
//! - **Lazy Time Model**: hunger decay, buff expiry and order readiness are pure functions of stored timestamps.
//! - **Atomic Actions**: every player action runs as one multi-tree sled transaction.
//! - **Stack-Limited Inventory**: eight slots, all-or-nothing deposits and withdrawals.
//! - **Typed Equipment Effects**: one closed enum of modifiers resolved on equip/unequip.
//! - **Data-Driven Content**: JSON item/recipe catalogs or the built-in standard set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use homestead::config::Config;
//! use homestead::economy::{Economy, Occupation};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("homestead.toml").await?;
//!     let economy = Economy::open(&config)?;
//!
//!     economy.register_player("alice", Utc::now())?;
//!     economy.select_occupation("alice", Occupation::Provider, Utc::now())?;
//!     economy.buy_from_shop("alice", "vegetable_seed", 3, Utc::now())?;
//!     economy.start_farm("alice", "vegetable_seed", 3, Utc::now())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`economy`] - engine, storage, catalog and game rules
//! - [`config`] - configuration management and validation
//! - [`logutil`] - log sanitising and logger setup

pub mod config;
pub mod economy;
pub mod logutil;
