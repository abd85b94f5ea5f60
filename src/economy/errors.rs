use sled::transaction::{TransactionError, UnabortableTransactionError};
use thiserror::Error;

/// Stable classification of a rejection, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing parameters.
    Validation,
    /// The player lacks the occupation or unlock the action needs.
    Authorization,
    /// Missing slot, order, listing, recipe, player, or an already-terminal entity.
    NotFound,
    /// Insufficient money, items or capacity, not-yet-ready orders, sold listings.
    Conflict,
    /// Storage failures and broken static configuration.
    Internal,
}

/// Errors that can arise while running economy operations against the store.
#[derive(Debug, Error)]
pub enum EconomyError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Storage error or conflict raised inside a running transaction.
    #[error("transaction error: {0}")]
    Transaction(#[from] UnabortableTransactionError),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, catalog files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Rejected input before any state was read.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Occupation locked, recipe locked, or level too low.
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// Returned when fetching a record that is not present (or no longer actionable).
    #[error("not found: {0}")]
    NotFound(String),

    /// Generic state conflict (self-purchase, listing no longer active, duplicates).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Player cannot pay.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    /// Inventory cannot hold the requested quantity.
    #[error("inventory full: no space for {quantity}x {item_id}")]
    InventoryFull { item_id: String, quantity: u32 },

    /// Not enough of an item across all inventory slots.
    #[error("not enough {item_id}: need {needed}, have {available}")]
    MissingIngredient {
        item_id: String,
        needed: u32,
        available: u32,
    },

    /// Work order has not reached its completion time.
    #[error("order {order_id} not ready: {remaining_secs}s remaining")]
    NotReady { order_id: u64, remaining_secs: i64 },

    /// Broken static content or unexpected conditions.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EconomyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_)
            | Self::InsufficientFunds { .. }
            | Self::InventoryFull { .. }
            | Self::MissingIngredient { .. }
            | Self::NotReady { .. } => ErrorKind::Conflict,
            Self::Sled(_)
            | Self::Transaction(_)
            | Self::Bincode(_)
            | Self::Io(_)
            | Self::SchemaMismatch { .. }
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<TransactionError<EconomyError>> for EconomyError {
    fn from(err: TransactionError<EconomyError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => Self::Sled(inner),
        }
    }
}
