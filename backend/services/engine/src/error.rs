use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::session_types::Side;

/// Error taxonomy for every engine operation. Validation and state
/// conflicts are caller mistakes; cap rejections carry the remaining
/// headroom so the caller can offer a corrected amount; storage errors
/// mean the mutation did not happen.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("bet exceeds per-user cap, {remaining} remaining")]
    UserCapExceeded { remaining: Decimal },

    #[error("bet exceeds {side} pool cap, {remaining} remaining")]
    SideCapExceeded { side: Side, remaining: Decimal },

    #[error("insufficient balance, {balance} available")]
    InsufficientBalance { balance: Decimal },

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::InsufficientBalance { .. } => 402,
            EngineError::NotFound(_) => 404,
            EngineError::StateConflict(_) => 409,
            EngineError::UserCapExceeded { .. } | EngineError::SideCapExceeded { .. } => 422,
            EngineError::Storage(_) => 500,
        }
    }

    /// Headroom still available when a cap rejected the bet.
    pub fn remaining(&self) -> Option<Decimal> {
        match self {
            EngineError::UserCapExceeded { remaining }
            | EngineError::SideCapExceeded { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }
}
