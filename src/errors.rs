//! Error types for the numpool betting core
//!
//! Every failure a boundary operation can surface maps onto one of these
//! variants. Mutation sequences either commit fully or not at all, so a
//! caller never needs to distinguish "failed cleanly" from "failed dirty".

use thiserror::Error;

/// Root error type for all core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or out-of-range request data, rejected before any mutation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation not legal for the entity's current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Debit would take the account balance below zero
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    /// Bet targeted a round that is not accepting wagers
    #[error("round {0} is not active")]
    RoundNotActive(String),

    /// Actor is not authorized for the operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Reward code has already been used
    #[error("reward code already redeemed")]
    AlreadyRedeemed,

    /// Reward code is past its expiry
    #[error("reward code expired")]
    Expired,

    /// Transient contention on an entity lock; retried internally with
    /// bounded backoff before being surfaced
    #[error("storage conflict on {0}")]
    StorageConflict(String),

    /// Storage layer failure, fatal to the current call
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<rocksdb::Error> for CoreError {
    fn from(e: rocksdb::Error) -> Self {
        CoreError::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::StorageUnavailable(format!("record codec: {}", e))
    }
}

/// Convenience alias for core results
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InsufficientFunds {
            balance: 5_000,
            required: 10_000,
        };
        assert!(err.to_string().contains("balance 5000"));
        assert!(err.to_string().contains("required 10000"));
    }

    #[test]
    fn test_round_not_active_display() {
        let err = CoreError::RoundNotActive("r-1".to_string());
        assert_eq!(err.to_string(), "round r-1 is not active");
    }
}
