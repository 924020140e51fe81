use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::session_types::Side;

/// One winner's computed payout. `net = gross - fee`, where
/// `gross = stake * 2` and the fee is the session's service fee cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub user_id: String,
    pub stake: Decimal,
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

/// The immutable record of a resolution, persisted exactly once when a
/// session resolves. Kept alongside the session so a retried resolve
/// returns this snapshot instead of recomputing payouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSnapshot {
    pub session_id: String,
    pub winner: Side,
    pub winning_pool: Decimal,
    pub losing_pool: Decimal,
    pub total_pool: Decimal,
    pub fee_percent: Decimal,
    pub payouts: Vec<Payout>,
    pub resolved_at: DateTime<Utc>,
    /// Set once every payout credit has landed on the ledger. Absent on
    /// a resolved session, the payouts still have to be applied.
    pub credited_at: Option<DateTime<Utc>>,
    pub schema_version: u32,
}
