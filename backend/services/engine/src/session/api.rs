use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};

use crate::error::EngineError;
use crate::session::commands::Command;
use crate::types::bet_types::{BetAccepted, BetRecord};
use crate::types::session_types::{BettingSession, Side};
use crate::types::settlement_types::SettlementSnapshot;

/// Cloneable procedural handle to the session actor. Every mutating
/// call is serialized through the actor's command channel.
#[derive(Clone)]
pub struct SessionEngine {
    pub(crate) tx: mpsc::Sender<Command>,
}

fn engine_gone<T>() -> Result<T, EngineError> {
    Err(EngineError::Storage("session engine unavailable".into()))
}

impl SessionEngine {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    pub async fn create_session(
        &self,
        question: String,
        show_prize_pool: bool,
    ) -> Result<BettingSession, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::CreateSession(question, show_prize_pool, tx))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn place_bet(
        &self,
        session_id: &str,
        user_id: &str,
        side: Side,
        amount: Decimal,
    ) -> Result<BetAccepted, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::PlaceBet(
                session_id.to_string(),
                user_id.to_string(),
                side,
                amount,
                tx,
            ))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn freeze(&self, session_id: &str) -> Result<BettingSession, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Freeze(session_id.to_string(), tx)).await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn resolve(
        &self,
        session_id: &str,
        winner: Side,
    ) -> Result<SettlementSnapshot, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::Resolve(session_id.to_string(), winner, tx))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn delete(&self, session_id: &str) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Delete(session_id.to_string(), tx)).await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn set_show_prize_pool(
        &self,
        session_id: &str,
        show: bool,
    ) -> Result<BettingSession, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::SetShowPrizePool(session_id.to_string(), show, tx))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    /// Credits a deposit onto the ledger and returns the new balance.
    /// Routed through the actor so it cannot race a stake debit on the
    /// same user.
    pub async fn deposit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::Deposit(user_id.to_string(), amount, tx))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn current_session(&self) -> Result<Option<BettingSession>, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::GetCurrent(tx)).await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<BettingSession, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::GetSession(session_id.to_string(), tx))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    /// Returns a zero-valued record when the user has not bet, never an
    /// absent one.
    pub async fn get_user_bets(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<BetRecord, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::GetUserBets(
                session_id.to_string(),
                user_id.to_string(),
                tx,
            ))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn get_all_bets(&self, session_id: &str) -> Result<Vec<BetRecord>, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::GetAllBets(session_id.to_string(), tx))
            .await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }

    pub async fn get_history(&self, limit: usize) -> Result<Vec<BettingSession>, EngineError> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::GetHistory(limit, tx)).await;
        rx.await.unwrap_or_else(|_| engine_gone())
    }
}
