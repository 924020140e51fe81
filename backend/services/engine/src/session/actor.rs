use chrono::Utc;
use log::{error, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::ledger::{BalanceLedger, DebitOutcome};
use crate::session::api::SessionEngine;
use crate::session::commands::Command;
use crate::settlement::compute_settlement;
use crate::store::SessionStore;
use crate::types::bet_types::{BetAccepted, BetRecord};
use crate::types::session_types::{BettingSession, SessionStatus, Side};
use crate::types::settlement_types::SettlementSnapshot;

/// Spawns the single-writer session actor and returns its handle.
///
/// One actor serializes every mutating operation, which is what makes
/// the cap checks and pool increments atomic with respect to each
/// other: two in-flight bets are applied one after the other against
/// committed state, never against a stale read. The system keeps at
/// most one non-terminal session, so one actor covers all of them.
pub fn spawn_session_engine(
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    ledger: Arc<dyn BalanceLedger>,
) -> SessionEngine {
    let (tx, mut rx) = mpsc::channel::<Command>(1024);

    tokio::spawn(async move {
        let mut state = match EngineState::hydrate(config, store, ledger).await {
            Ok(state) => state,
            Err((state, e)) => {
                error!("Failed to hydrate session state, starting empty: {}", e);
                state
            }
        };

        while let Some(cmd) = rx.recv().await {
            state.handle(cmd).await;
        }
    });

    SessionEngine::new(tx)
}

struct EngineState {
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    ledger: Arc<dyn BalanceLedger>,
    /// The one session that may be non-terminal, plus its bet records
    /// keyed by user id. Resolved sessions stay here until replaced.
    current: Option<BettingSession>,
    bets: HashMap<String, BetRecord>,
}

impl EngineState {
    fn empty(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        ledger: Arc<dyn BalanceLedger>,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            current: None,
            bets: HashMap::new(),
        }
    }

    async fn hydrate(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        ledger: Arc<dyn BalanceLedger>,
    ) -> Result<Self, (Self, EngineError)> {
        let mut state = Self::empty(config, store, ledger);

        let current_id = match state.store.current_session_id().await {
            Ok(id) => id,
            Err(e) => return Err((state, e)),
        };
        let Some(current_id) = current_id else {
            return Ok(state);
        };

        let session = match state.store.load_session(&current_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!("Current pointer references missing session {}", current_id);
                return Ok(state);
            }
            Err(e) => return Err((state, e)),
        };

        let bettors = match state.store.bettors(&current_id).await {
            Ok(bettors) => bettors,
            Err(e) => return Err((state, e)),
        };
        for user_id in bettors {
            match state.store.load_bet(&current_id, &user_id).await {
                Ok(Some(record)) => {
                    state.bets.insert(user_id, record);
                }
                Ok(None) => warn!(
                    "Bettor {} listed for session {} but no record found",
                    user_id, current_id
                ),
                Err(e) => return Err((state, e)),
            }
        }

        info!(
            "Hydrated session {} ({:?}) with {} bet records",
            session.id,
            session.status,
            state.bets.len()
        );
        state.current = Some(session);
        Ok(state)
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::CreateSession(question, show_prize_pool, reply) => {
                let _ = reply.send(self.create_session(question, show_prize_pool).await);
            }
            Command::PlaceBet(session_id, user_id, side, amount, reply) => {
                let _ = reply.send(self.place_bet(&session_id, &user_id, side, amount).await);
            }
            Command::Freeze(session_id, reply) => {
                let _ = reply.send(self.freeze(&session_id).await);
            }
            Command::Resolve(session_id, winner, reply) => {
                let _ = reply.send(self.resolve(&session_id, winner).await);
            }
            Command::Delete(session_id, reply) => {
                let _ = reply.send(self.delete(&session_id).await);
            }
            Command::SetShowPrizePool(session_id, show, reply) => {
                let _ = reply.send(self.set_show_prize_pool(&session_id, show).await);
            }
            Command::Deposit(user_id, amount, reply) => {
                let _ = reply.send(self.deposit(&user_id, amount).await);
            }
            Command::GetCurrent(reply) => {
                let _ = reply.send(Ok(self.current.clone()));
            }
            Command::GetSession(session_id, reply) => {
                let _ = reply.send(self.get_session(&session_id).await);
            }
            Command::GetUserBets(session_id, user_id, reply) => {
                let _ = reply.send(self.get_user_bets(&session_id, &user_id).await);
            }
            Command::GetAllBets(session_id, reply) => {
                let _ = reply.send(self.get_all_bets(&session_id).await);
            }
            Command::GetHistory(limit, reply) => {
                let _ = reply.send(self.get_history(limit).await);
            }
        }
    }

    fn is_current(&self, session_id: &str) -> bool {
        self.current
            .as_ref()
            .map(|s| s.id == session_id)
            .unwrap_or(false)
    }

    fn current_if(&self, session_id: &str) -> Option<BettingSession> {
        self.current
            .as_ref()
            .filter(|s| s.id == session_id)
            .cloned()
    }

    /// Distinct-user counts, recomputed from the full record set with
    /// `updated` standing in for that user's committed record. Never
    /// incremented, so a user betting both sides is counted once per
    /// side.
    fn recompute_counts(&self, updated: &BetRecord) -> (u64, u64) {
        let mut left = 0;
        let mut right = 0;
        let records = self
            .bets
            .values()
            .filter(|r| r.user_id != updated.user_id)
            .chain(std::iter::once(updated));
        for record in records {
            if record.left_amount > Decimal::ZERO {
                left += 1;
            }
            if record.right_amount > Decimal::ZERO {
                right += 1;
            }
        }
        (left, right)
    }

    async fn create_session(
        &mut self,
        question: String,
        show_prize_pool: bool,
    ) -> Result<BettingSession, EngineError> {
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(EngineError::Validation("question must not be empty".into()));
        }
        if let Some(current) = &self.current {
            if !current.is_terminal() {
                return Err(EngineError::StateConflict(format!(
                    "session {} is still active",
                    current.id
                )));
            }
        } else if let Some(existing_id) = self.store.current_session_id().await? {
            // Hydration can fail and leave the actor empty; the stored
            // pointer stays authoritative for the one-active-session
            // rule.
            if let Some(existing) = self.store.load_session(&existing_id).await? {
                if !existing.is_terminal() {
                    return Err(EngineError::StateConflict(format!(
                        "session {} is still active",
                        existing.id
                    )));
                }
            }
        }

        let session = BettingSession::new(question, show_prize_pool, self.config.service_fee_percent);
        self.store.save_session(&session).await?;
        self.store.set_current_session_id(Some(&session.id)).await?;

        info!("Created session {}: {}", session.id, session.question);
        self.current = Some(session.clone());
        self.bets.clear();
        Ok(session)
    }

    async fn place_bet(
        &mut self,
        session_id: &str,
        user_id: &str,
        side: Side,
        amount: Decimal,
    ) -> Result<BetAccepted, EngineError> {
        let Some(session) = self.current_if(session_id) else {
            // A known but non-current session is terminal by invariant.
            return match self.store.load_session(session_id).await? {
                Some(_) => Err(EngineError::StateConflict("session is not open".into())),
                None => Err(EngineError::NotFound(format!(
                    "session {} not found",
                    session_id
                ))),
            };
        };
        if session.status != SessionStatus::Open {
            return Err(EngineError::StateConflict("session is not open".into()));
        }

        if user_id.trim().is_empty() {
            return Err(EngineError::Validation("user id must not be empty".into()));
        }
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "bet amount must be positive".into(),
            ));
        }

        let previous = self
            .bets
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| BetRecord::empty(session_id, user_id));

        if previous.total() + amount > self.config.user_cap {
            let remaining = (self.config.user_cap - previous.total()).max(Decimal::ZERO);
            return Err(EngineError::UserCapExceeded { remaining });
        }
        if session.pool(side) + amount > self.config.side_cap {
            let remaining = (self.config.side_cap - session.pool(side)).max(Decimal::ZERO);
            return Err(EngineError::SideCapExceeded { side, remaining });
        }

        match self.ledger.debit(user_id, amount).await? {
            DebitOutcome::Debited => {}
            DebitOutcome::Insufficient { balance } => {
                return Err(EngineError::InsufficientBalance { balance });
            }
        }

        let mut record = previous.clone();
        record.apply(side, amount, Utc::now());

        let mut updated = session.clone();
        updated.add_to_pool(side, amount);
        let (left_count, right_count) = self.recompute_counts(&record);
        updated.left_bettor_count = left_count;
        updated.right_bettor_count = right_count;

        if let Err(e) = self.persist_bet(&previous, &record, &updated).await {
            // The stake was already taken; give it back before failing.
            if let Err(refund_err) = self.ledger.credit(user_id, amount).await {
                error!(
                    "Refund of {} to {} failed after store error, manual reconciliation required: {}",
                    amount, user_id, refund_err
                );
            }
            return Err(e);
        }

        info!(
            "Accepted {} bet of {} by {} on session {}",
            side, amount, user_id, session_id
        );
        self.bets.insert(user_id.to_string(), record.clone());
        self.current = Some(updated.clone());
        Ok(BetAccepted {
            record,
            session: updated,
        })
    }

    /// Bet persistence, session last so pools stay authoritative. On a
    /// late failure the record write is rolled back to keep the audit
    /// trail consistent with the pools.
    async fn persist_bet(
        &self,
        previous: &BetRecord,
        record: &BetRecord,
        session: &BettingSession,
    ) -> Result<(), EngineError> {
        self.store.save_bet(record).await?;
        let late = match self.store.add_bettor(&session.id, &record.user_id).await {
            Ok(()) => self.store.save_session(session).await,
            Err(e) => Err(e),
        };
        if let Err(e) = late {
            if let Err(rollback_err) = self.store.save_bet(previous).await {
                error!(
                    "Rollback of bet record for {} failed: {}",
                    record.user_id, rollback_err
                );
            }
            return Err(e);
        }
        Ok(())
    }

    async fn freeze(&mut self, session_id: &str) -> Result<BettingSession, EngineError> {
        let Some(session) = self.current_if(session_id) else {
            return match self.store.load_session(session_id).await? {
                Some(_) => Err(EngineError::StateConflict("session is not open".into())),
                None => Err(EngineError::NotFound(format!(
                    "session {} not found",
                    session_id
                ))),
            };
        };
        if session.status != SessionStatus::Open {
            return Err(EngineError::StateConflict(
                "only an open session can be frozen".into(),
            ));
        }

        let mut updated = session;
        updated.status = SessionStatus::Frozen;
        updated.frozen_at = Some(Utc::now());
        self.store.save_session(&updated).await?;

        info!("Froze session {}", session_id);
        self.current = Some(updated.clone());
        Ok(updated)
    }

    async fn resolve(
        &mut self,
        session_id: &str,
        winner: Side,
    ) -> Result<SettlementSnapshot, EngineError> {
        let session = match self.current_if(session_id) {
            Some(session) => session,
            None => match self.store.load_session(session_id).await? {
                Some(session) => session,
                None => {
                    return Err(EngineError::NotFound(format!(
                        "session {} not found",
                        session_id
                    )))
                }
            },
        };

        match session.status {
            SessionStatus::Open => Err(EngineError::StateConflict(
                "session must be frozen before it can be resolved".into(),
            )),
            SessionStatus::Resolved => {
                // Idempotent retry path: the same winner gets the stored
                // snapshot back, a different winner is a conflict.
                if session.winner != Some(winner) {
                    return Err(EngineError::StateConflict(
                        "session is already resolved with a different winner".into(),
                    ));
                }
                match self.store.load_settlement(session_id).await? {
                    Some(mut snapshot) => {
                        // A crash between the session write and the
                        // credit loop leaves the marker absent; the
                        // retry finishes the payouts from the snapshot.
                        if snapshot.credited_at.is_none() {
                            self.credit_payouts(&mut snapshot).await;
                        }
                        Ok(snapshot)
                    }
                    None => Err(EngineError::Storage(format!(
                        "settlement snapshot missing for resolved session {}",
                        session_id
                    ))),
                }
            }
            SessionStatus::Frozen => self.settle(session, winner).await,
        }
    }

    async fn settle(
        &mut self,
        session: BettingSession,
        winner: Side,
    ) -> Result<SettlementSnapshot, EngineError> {
        // A prior attempt may have persisted the snapshot and then
        // failed before the session write; reuse it so the retry pays
        // out exactly what was first computed.
        let mut snapshot = match self.store.load_settlement(&session.id).await? {
            Some(existing) if existing.winner == winner => existing,
            _ => {
                let records = if self.is_current(&session.id) {
                    self.bets.values().cloned().collect::<Vec<_>>()
                } else {
                    // A frozen session the actor never hydrated; pull
                    // its records straight from the store.
                    let mut loaded = Vec::new();
                    for user_id in self.store.bettors(&session.id).await? {
                        if let Some(record) = self.store.load_bet(&session.id, &user_id).await? {
                            loaded.push(record);
                        }
                    }
                    loaded
                };
                compute_settlement(&session, &records, winner, Utc::now())
            }
        };

        if snapshot.total_pool != session.total_pool() {
            warn!(
                "Settlement pool {} disagrees with session pools {} for {}",
                snapshot.total_pool,
                session.total_pool(),
                session.id
            );
        }

        let mut updated = session;
        updated.status = SessionStatus::Resolved;
        updated.winner = Some(winner);
        updated.resolved_at = Some(snapshot.resolved_at);

        // Remove-then-push keeps a retried resolve from duplicating the
        // history entry. The session write comes last: any failure
        // before it leaves the stored session frozen, and the retry
        // re-runs settlement instead of finding a resolved session with
        // unpaid winners.
        self.store.save_settlement(&snapshot).await?;
        self.store.remove_history(&updated.id).await?;
        self.store.push_history(&updated.id).await?;
        self.store.save_session(&updated).await?;

        if self.is_current(&updated.id) {
            self.current = Some(updated.clone());
        }

        self.credit_payouts(&mut snapshot).await;

        info!(
            "Resolved session {} winner={} payouts={} total_pool={}",
            updated.id,
            winner,
            snapshot.payouts.len(),
            snapshot.total_pool
        );
        Ok(snapshot)
    }

    /// Applies every payout from the snapshot, then stamps
    /// `credited_at` on the stored copy. The marker goes in only after
    /// the whole loop lands, so a resolve retried over an interrupted
    /// run re-credits from the snapshot rather than dropping payouts.
    async fn credit_payouts(&self, snapshot: &mut SettlementSnapshot) {
        let mut all_credited = true;
        for payout in &snapshot.payouts {
            if let Err(e) = self.ledger.credit(&payout.user_id, payout.net).await {
                all_credited = false;
                error!(
                    "Payout credit of {} to {} failed, retry resolving session {}: {}",
                    payout.net, payout.user_id, snapshot.session_id, e
                );
            }
        }
        if !all_credited {
            return;
        }

        snapshot.credited_at = Some(Utc::now());
        if let Err(e) = self.store.save_settlement(snapshot).await {
            error!(
                "Failed to record payout completion for session {}: {}",
                snapshot.session_id, e
            );
        }
    }

    async fn delete(&mut self, session_id: &str) -> Result<(), EngineError> {
        let exists = self.is_current(session_id)
            || self.store.load_session(session_id).await?.is_some();
        if !exists {
            return Err(EngineError::NotFound(format!(
                "session {} not found",
                session_id
            )));
        }

        self.store.delete_bets(session_id).await?;
        self.store.delete_settlement(session_id).await?;
        self.store.remove_history(session_id).await?;
        self.store.delete_session(session_id).await?;

        if self.is_current(session_id) {
            self.store.set_current_session_id(None).await?;
            self.current = None;
            self.bets.clear();
        }

        info!("Deleted session {} and all child records", session_id);
        Ok(())
    }

    async fn deposit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, EngineError> {
        if user_id.trim().is_empty() {
            return Err(EngineError::Validation("user id must not be empty".into()));
        }
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "deposit amount must be positive".into(),
            ));
        }
        self.ledger.credit(user_id, amount).await?;
        self.ledger.balance(user_id).await
    }

    async fn set_show_prize_pool(
        &mut self,
        session_id: &str,
        show: bool,
    ) -> Result<BettingSession, EngineError> {
        let mut session = self.get_session(session_id).await?;
        session.show_prize_pool = show;
        self.store.save_session(&session).await?;
        if self.is_current(session_id) {
            self.current = Some(session.clone());
        }
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> Result<BettingSession, EngineError> {
        if self.is_current(session_id) {
            if let Some(session) = &self.current {
                return Ok(session.clone());
            }
        }
        self.store
            .load_session(session_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("session {} not found", session_id)))
    }

    async fn get_user_bets(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<BetRecord, EngineError> {
        if self.is_current(session_id) {
            return Ok(self
                .bets
                .get(user_id)
                .cloned()
                .unwrap_or_else(|| BetRecord::empty(session_id, user_id)));
        }
        Ok(self
            .store
            .load_bet(session_id, user_id)
            .await?
            .unwrap_or_else(|| BetRecord::empty(session_id, user_id)))
    }

    async fn get_all_bets(&self, session_id: &str) -> Result<Vec<BetRecord>, EngineError> {
        let mut records = if self.is_current(session_id) {
            self.bets.values().cloned().collect::<Vec<_>>()
        } else {
            let mut loaded = Vec::new();
            for user_id in self.store.bettors(session_id).await? {
                if let Some(record) = self.store.load_bet(session_id, &user_id).await? {
                    loaded.push(record);
                }
            }
            loaded
        };
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }

    async fn get_history(&self, limit: usize) -> Result<Vec<BettingSession>, EngineError> {
        let mut sessions = Vec::new();
        for id in self.store.history(limit).await? {
            match self.store.load_session(&id).await? {
                Some(session) => sessions.push(session),
                None => warn!("History references missing session {}", id),
            }
        }
        Ok(sessions)
    }
}
