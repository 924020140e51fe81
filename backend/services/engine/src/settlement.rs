use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::bet_types::BetRecord;
use crate::types::session_types::{BettingSession, Side, SCHEMA_VERSION};
use crate::types::settlement_types::{Payout, SettlementSnapshot};

/// Pari-mutuel settlement, simple 2x model: every winning stake pays
/// out double, minus the session's service fee; losing stakes forfeit
/// to the house. Pure and deterministic, so retrying a resolution on
/// the same inputs produces the same payouts.
pub fn compute_settlement(
    session: &BettingSession,
    records: &[BetRecord],
    winner: Side,
    resolved_at: DateTime<Utc>,
) -> SettlementSnapshot {
    let two = Decimal::from(2);
    let hundred = Decimal::from(100);

    let mut winning_pool = Decimal::ZERO;
    let mut losing_pool = Decimal::ZERO;
    let mut payouts = Vec::new();

    for record in records {
        let stake = record.amount_on(winner);
        winning_pool += stake;
        losing_pool += record.amount_on(winner.other());

        if stake > Decimal::ZERO {
            let gross = stake * two;
            let fee = gross * session.service_fee_percent / hundred;
            payouts.push(Payout {
                user_id: record.user_id.clone(),
                stake,
                gross,
                fee,
                net: gross - fee,
            });
        }
    }

    // Records arrive in map order; fix a stable order for the audit trail.
    payouts.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    SettlementSnapshot {
        session_id: session.id.clone(),
        winner,
        winning_pool,
        losing_pool,
        total_pool: winning_pool + losing_pool,
        fee_percent: session.service_fee_percent,
        payouts,
        resolved_at,
        credited_at: None,
        schema_version: SCHEMA_VERSION,
    }
}
