use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{IVec, Transactional};

use super::errors::EconomyError;
use super::types::{
    MarketListing, PlayerRecord, WorkOrder, LISTING_SCHEMA_VERSION, ORDER_SCHEMA_VERSION,
    PLAYER_SCHEMA_VERSION,
};

const TREE_PLAYERS: &str = "economy_players";
const TREE_ORDERS: &str = "economy_orders";
const TREE_LISTINGS: &str = "economy_listings";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct EconomyStoreBuilder {
    path: PathBuf,
    flush_on_commit: bool,
}

impl EconomyStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_on_commit: true,
        }
    }

    /// Skip the fsync after every committed transaction (tests, bulk imports).
    pub fn without_flush(mut self) -> Self {
        self.flush_on_commit = false;
        self
    }

    pub fn open(self) -> Result<EconomyStore, EconomyError> {
        EconomyStore::open_with_options(self.path, self.flush_on_commit)
    }
}

/// Sled-backed persistence for players, work orders and market listings.
pub struct EconomyStore {
    db: sled::Db,
    players: sled::Tree,
    orders: sled::Tree,
    listings: sled::Tree,
    flush_on_commit: bool,
}

fn player_key(username: &str) -> Vec<u8> {
    username.to_ascii_lowercase().into_bytes()
}

fn order_prefix(username: &str) -> Vec<u8> {
    format!("{}:", username.to_ascii_lowercase()).into_bytes()
}

fn order_key(username: &str, id: u64) -> Vec<u8> {
    format!("{}:{:020}", username.to_ascii_lowercase(), id).into_bytes()
}

fn listing_key(id: u64) -> Vec<u8> {
    format!("{:020}", id).into_bytes()
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, EconomyError> {
    Ok(bincode::serialize(value)?)
}

fn deserialize<T: DeserializeOwned>(bytes: &IVec) -> Result<T, EconomyError> {
    Ok(bincode::deserialize::<T>(bytes)?)
}

fn check_schema(entity: &'static str, expected: u8, found: u8) -> Result<(), EconomyError> {
    if expected == found {
        Ok(())
    } else {
        Err(EconomyError::SchemaMismatch {
            entity,
            expected,
            found,
        })
    }
}

fn decode_player(bytes: &IVec) -> Result<PlayerRecord, EconomyError> {
    let record: PlayerRecord = deserialize(bytes)?;
    check_schema("player", PLAYER_SCHEMA_VERSION, record.schema_version)?;
    Ok(record)
}

fn decode_order(bytes: &IVec) -> Result<WorkOrder, EconomyError> {
    let record: WorkOrder = deserialize(bytes)?;
    check_schema("work order", ORDER_SCHEMA_VERSION, record.schema_version)?;
    Ok(record)
}

fn decode_listing(bytes: &IVec) -> Result<MarketListing, EconomyError> {
    let record: MarketListing = deserialize(bytes)?;
    check_schema("listing", LISTING_SCHEMA_VERSION, record.schema_version)?;
    Ok(record)
}

impl EconomyStore {
    /// Open (or create) the economy store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EconomyError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, flush_on_commit: bool) -> Result<Self, EconomyError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let orders = db.open_tree(TREE_ORDERS)?;
        let listings = db.open_tree(TREE_LISTINGS)?;
        Ok(Self {
            db,
            players,
            orders,
            listings,
            flush_on_commit,
        })
    }

    /// Monotonic id for new orders and listings.
    pub fn next_id(&self) -> Result<u64, EconomyError> {
        Ok(self.db.generate_id()?)
    }

    /// Insert or update a player record outside of any transaction.
    pub fn put_player(&self, mut player: PlayerRecord) -> Result<(), EconomyError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        player.touch();
        self.players
            .insert(player_key(&player.username), serialize(&player)?)?;
        self.players.flush()?;
        Ok(())
    }

    /// Fetch a player record by username.
    pub fn get_player(&self, username: &str) -> Result<PlayerRecord, EconomyError> {
        let Some(bytes) = self.players.get(player_key(username))? else {
            return Err(EconomyError::NotFound(format!("player: {}", username)));
        };
        decode_player(&bytes)
    }

    /// List all player usernames currently stored.
    pub fn list_player_ids(&self) -> Result<Vec<String>, EconomyError> {
        let mut ids = Vec::new();
        for entry in self.players.iter() {
            let (key, _) = entry?;
            ids.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(ids)
    }

    pub fn get_order(&self, username: &str, id: u64) -> Result<WorkOrder, EconomyError> {
        let Some(bytes) = self.orders.get(order_key(username, id))? else {
            return Err(EconomyError::NotFound(format!("work order: {}", id)));
        };
        decode_order(&bytes)
    }

    /// Every order a player ever started, oldest id first.
    pub fn list_orders(&self, username: &str) -> Result<Vec<WorkOrder>, EconomyError> {
        let mut orders = Vec::new();
        for entry in self.orders.scan_prefix(order_prefix(username)) {
            let (_, bytes) = entry?;
            orders.push(decode_order(&bytes)?);
        }
        Ok(orders)
    }

    pub fn get_listing(&self, id: u64) -> Result<MarketListing, EconomyError> {
        let Some(bytes) = self.listings.get(listing_key(id))? else {
            return Err(EconomyError::NotFound(format!("listing: {}", id)));
        };
        decode_listing(&bytes)
    }

    /// All listings regardless of status, oldest id first.
    pub fn list_listings(&self) -> Result<Vec<MarketListing>, EconomyError> {
        let mut listings = Vec::new();
        for entry in self.listings.iter() {
            let (_, bytes) = entry?;
            listings.push(decode_listing(&bytes)?);
        }
        Ok(listings)
    }

    /// Run `f` as one serializable transaction over all three trees.
    ///
    /// Domain errors abort with nothing written. Write conflicts re-run `f`, so
    /// it must not consume randomness or other one-shot inputs.
    pub fn transaction<F, R>(&self, f: F) -> Result<R, EconomyError>
    where
        F: Fn(&EconomyTxn<'_>) -> Result<R, EconomyError>,
    {
        let result = (&self.players, &self.orders, &self.listings).transaction(
            |(players, orders, listings)| {
                let txn = EconomyTxn {
                    players,
                    orders,
                    listings,
                };
                f(&txn).map_err(|err| match err {
                    EconomyError::Transaction(inner) => ConflictableTransactionError::from(inner),
                    other => ConflictableTransactionError::Abort(other),
                })
            },
        )?;
        if self.flush_on_commit {
            self.db.flush()?;
        }
        Ok(result)
    }
}

/// Transactional view handed to [`EconomyStore::transaction`] closures.
pub struct EconomyTxn<'a> {
    players: &'a TransactionalTree,
    orders: &'a TransactionalTree,
    listings: &'a TransactionalTree,
}

impl EconomyTxn<'_> {
    pub fn get_player(&self, username: &str) -> Result<PlayerRecord, EconomyError> {
        let Some(bytes) = self.players.get(player_key(username))? else {
            return Err(EconomyError::NotFound(format!("player: {}", username)));
        };
        decode_player(&bytes)
    }

    pub fn player_exists(&self, username: &str) -> Result<bool, EconomyError> {
        Ok(self.players.get(player_key(username))?.is_some())
    }

    pub fn put_player(&self, player: &PlayerRecord) -> Result<(), EconomyError> {
        self.players
            .insert(player_key(&player.username), serialize(player)?)?;
        Ok(())
    }

    pub fn get_order(&self, username: &str, id: u64) -> Result<WorkOrder, EconomyError> {
        let Some(bytes) = self.orders.get(order_key(username, id))? else {
            return Err(EconomyError::NotFound(format!("work order: {}", id)));
        };
        decode_order(&bytes)
    }

    pub fn put_order(&self, order: &WorkOrder) -> Result<(), EconomyError> {
        self.orders
            .insert(order_key(&order.username, order.id), serialize(order)?)?;
        Ok(())
    }

    pub fn get_listing(&self, id: u64) -> Result<MarketListing, EconomyError> {
        let Some(bytes) = self.listings.get(listing_key(id))? else {
            return Err(EconomyError::NotFound(format!("listing: {}", id)));
        };
        decode_listing(&bytes)
    }

    pub fn put_listing(&self, listing: &MarketListing) -> Result<(), EconomyError> {
        self.listings
            .insert(listing_key(listing.id), serialize(listing)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = EconomyStoreBuilder::new(dir.path()).open().expect("store");
        let player = PlayerRecord::new("Farmer", Utc::now(), 2400.0, 100);
        store.put_player(player.clone()).expect("put");

        let fetched = store.get_player("farmer").expect("get");
        assert_eq!(fetched.username, "Farmer");
        assert_eq!(fetched.money, 100);
        assert_eq!(store.list_player_ids().expect("ids"), vec!["farmer".to_string()]);
    }

    #[test]
    fn aborted_transaction_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let store = EconomyStoreBuilder::new(dir.path())
            .without_flush()
            .open()
            .expect("store");
        store
            .put_player(PlayerRecord::new("alice", Utc::now(), 2400.0, 100))
            .expect("put");

        let result: Result<(), EconomyError> = store.transaction(|txn| {
            let mut player = txn.get_player("alice")?;
            player.money = 0;
            txn.put_player(&player)?;
            Err(EconomyError::Conflict("changed my mind".into()))
        });
        assert!(matches!(result, Err(EconomyError::Conflict(_))));
        assert_eq!(store.get_player("alice").expect("get").money, 100);
    }

    #[test]
    fn orders_are_scoped_by_player_prefix() {
        let dir = TempDir::new().expect("tempdir");
        let store = EconomyStoreBuilder::new(dir.path()).open().expect("store");
        let now = Utc::now();
        for (name, id) in [("ann", 1u64), ("anna", 2), ("ann", 3)] {
            let order = WorkOrder {
                id,
                username: name.to_string(),
                work: crate::economy::WorkType::Farm,
                item_id: "vegetable_seed".into(),
                recipe_id: None,
                quantity: 1,
                started_at: now,
                completes_at: now,
                collected: false,
                schema_version: ORDER_SCHEMA_VERSION,
            };
            store.transaction(|txn| txn.put_order(&order)).expect("put");
        }
        let ids: Vec<u64> = store.list_orders("ann").expect("list").iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(store.get_order("anna", 1).is_err());
    }
}
