use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::session_types::{BettingSession, Side, SCHEMA_VERSION};

/// One entry of the append-only audit trail on a bet record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetTransaction {
    pub side: Side,
    pub amount: Decimal,
    pub placed_at: DateTime<Utc>,
}

/// One user's accumulated position in one session. The side totals are
/// always the sum of the matching transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub session_id: String,
    pub user_id: String,
    pub left_amount: Decimal,
    pub right_amount: Decimal,
    pub transactions: Vec<BetTransaction>,
    pub schema_version: u32,
}

impl BetRecord {
    pub fn empty(session_id: &str, user_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            left_amount: Decimal::ZERO,
            right_amount: Decimal::ZERO,
            transactions: Vec::new(),
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn total(&self) -> Decimal {
        self.left_amount + self.right_amount
    }

    pub fn amount_on(&self, side: Side) -> Decimal {
        match side {
            Side::Left => self.left_amount,
            Side::Right => self.right_amount,
        }
    }

    pub fn apply(&mut self, side: Side, amount: Decimal, placed_at: DateTime<Utc>) {
        match side {
            Side::Left => self.left_amount += amount,
            Side::Right => self.right_amount += amount,
        }
        self.transactions.push(BetTransaction {
            side,
            amount,
            placed_at,
        });
    }
}

/// Returned by a successful bet placement: the bettor's updated record
/// plus the session with the new pool totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetAccepted {
    pub record: BetRecord,
    pub session: BettingSession,
}
