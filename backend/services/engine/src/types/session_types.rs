use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Bumped whenever the persisted shape of a record changes, so stale
/// store entries fail at deserialization instead of at arithmetic.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Open,
    Frozen,
    Resolved,
}

/// One active wagering round. Pools and bettor counts are mutated only
/// by the session actor; `total_pool` is always derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingSession {
    pub id: String,
    pub question: String,
    pub status: SessionStatus,
    pub left_pool: Decimal,
    pub right_pool: Decimal,
    pub left_bettor_count: u64,
    pub right_bettor_count: u64,
    pub winner: Option<Side>,
    pub service_fee_percent: Decimal,
    pub show_prize_pool: bool,
    pub created_at: DateTime<Utc>,
    pub frozen_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub schema_version: u32,
}

impl BettingSession {
    pub fn new(question: String, show_prize_pool: bool, service_fee_percent: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question,
            status: SessionStatus::Open,
            left_pool: Decimal::ZERO,
            right_pool: Decimal::ZERO,
            left_bettor_count: 0,
            right_bettor_count: 0,
            winner: None,
            service_fee_percent,
            show_prize_pool,
            created_at: Utc::now(),
            frozen_at: None,
            resolved_at: None,
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn total_pool(&self) -> Decimal {
        self.left_pool + self.right_pool
    }

    pub fn pool(&self, side: Side) -> Decimal {
        match side {
            Side::Left => self.left_pool,
            Side::Right => self.right_pool,
        }
    }

    pub fn add_to_pool(&mut self, side: Side, amount: Decimal) {
        match side {
            Side::Left => self.left_pool += amount,
            Side::Right => self.right_pool += amount,
        }
    }

    /// A resolved session is terminal; it can still be read or deleted
    /// but never accepts bets or another resolution.
    pub fn is_terminal(&self) -> bool {
        self.status == SessionStatus::Resolved
    }
}
