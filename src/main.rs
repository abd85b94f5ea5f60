//! Binary entrypoint for the Homestead CLI.
//!
//! Every gameplay subcommand maps to one economy operation, runs it at the
//! current time, and prints the result as JSON on stdout. Logs go to stderr
//! and, when configured, to the log file.
//!
//! See the library crate docs for module-level details: `homestead::`.
use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use homestead::config::Config;
use homestead::economy::{Economy, EconomyError, EquipmentSlotKey, Occupation, WorkRequest};
use homestead::logutil::init_logging;

#[derive(Parser)]
#[command(name = "homestead")]
#[command(about = "Real-time farming and cooking economy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "homestead.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the database
    Init,
    /// Create a new player
    Register { username: String },
    /// Choose the primary occupation (provider or chef)
    Select { username: String, occupation: Occupation },
    /// Unlock the second occupation once the primary reaches level 5
    UnlockSecond { username: String },
    /// Show hunger, money, levels, inventory and equipment
    Status { username: String },
    /// Eat one meal from an inventory slot
    Eat { username: String, slot: u8 },
    /// Plant seeds
    Farm {
        username: String,
        seed: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Start cooking an unlocked recipe
    Cook { username: String, recipe: String },
    /// Collect one ready work order
    Collect { username: String, order: u64 },
    /// Collect every ready work order
    CollectAll { username: String },
    /// List uncollected work orders
    Orders { username: String },
    /// Equip the item in an inventory slot
    Equip { username: String, slot: u8 },
    /// Unequip an equipment slot (head, upper_body, lower_body, arm, glove, shoe)
    Unequip { username: String, slot: EquipmentSlotKey },
    /// List items from an inventory slot on the market
    Sell {
        username: String,
        slot: u8,
        quantity: u32,
        /// Total price for the whole listing
        price: i64,
    },
    /// Buy a market listing
    BuyListing { username: String, listing: u64 },
    /// Cancel one of your own listings
    CancelListing { username: String, listing: u64 },
    /// Show active market listings
    Listings,
    /// Show what the NPC shop sells to a player
    Shop { username: String },
    /// Buy from the NPC shop
    Buy {
        username: String,
        item: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Show recipes and whether they are unlocked
    Recipes { username: String },
    /// Buy a recipe unlock
    UnlockRecipe { username: String, recipe: String },
    /// Show equipment box odds for a player
    BoxOdds { username: String },
    /// Buy and open an equipment box
    OpenBox { username: String },
}

fn emit<T: Serialize>(result: Result<T, EconomyError>) -> Result<()> {
    match result {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value)
                .map_err(|e| anyhow!("Failed to serialize result: {}", e))?;
            println!("{}", json);
            Ok(())
        }
        Err(e) => Err(anyhow!("{:?}: {}", e.kind(), e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(None, cli.verbose);
        if tokio::fs::metadata(&cli.config).await.is_err() {
            Config::create_default(&cli.config).await?;
            info!("Wrote default configuration to {}", cli.config);
        }
        let config = Config::load(&cli.config).await?;
        tokio::fs::create_dir_all(&config.storage.data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data dir {}: {}", config.storage.data_dir, e))?;
        Economy::open(&config)?;
        println!("Initialized homestead at {}", config.database_path().display());
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(Some(&config.logging), cli.verbose);
    let economy = Economy::open(&config)?;
    let now = Utc::now();

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Register { username } => emit(economy.register_player(&username, now)),
        Commands::Select {
            username,
            occupation,
        } => emit(economy.select_occupation(&username, occupation, now)),
        Commands::UnlockSecond { username } => emit(economy.unlock_second_occupation(&username, now)),
        Commands::Status { username } => emit(economy.player_status(&username, now)),
        Commands::Eat { username, slot } => emit(economy.eat(&username, slot, now)),
        Commands::Farm {
            username,
            seed,
            quantity,
        } => emit(economy.start_work(
            &username,
            &WorkRequest::Farm {
                seed_id: seed,
                quantity,
            },
            now,
        )),
        Commands::Cook { username, recipe } => emit(economy.start_work(
            &username,
            &WorkRequest::Cook { recipe_id: recipe },
            now,
        )),
        Commands::Collect { username, order } => emit(economy.collect_work(&username, order, now)),
        Commands::CollectAll { username } => emit(economy.collect_all_ready(&username, now)),
        Commands::Orders { username } => emit(economy.list_work_orders(&username, now)),
        Commands::Equip { username, slot } => emit(economy.equip(&username, slot, now)),
        Commands::Unequip { username, slot } => emit(economy.unequip(&username, slot, now)),
        Commands::Sell {
            username,
            slot,
            quantity,
            price,
        } => emit(economy.create_listing(&username, slot, quantity, price, now)),
        Commands::BuyListing { username, listing } => emit(economy.buy_listing(&username, listing, now)),
        Commands::CancelListing { username, listing } => {
            emit(economy.cancel_listing(&username, listing, now))
        }
        Commands::Listings => emit(economy.active_listings()),
        Commands::Shop { username } => emit(economy.shop_catalog(&username)),
        Commands::Buy {
            username,
            item,
            quantity,
        } => emit(economy.buy_from_shop(&username, &item, quantity, now)),
        Commands::Recipes { username } => emit(economy.recipe_catalog(&username)),
        Commands::UnlockRecipe { username, recipe } => {
            emit(economy.buy_recipe_unlock(&username, &recipe, now))
        }
        Commands::BoxOdds { username } => emit(economy.equipment_box_odds(&username)),
        Commands::OpenBox { username } => emit(economy.open_equipment_box(&username, now)),
    }
}
