use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

use redis_client::RedisManager;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DebitOutcome {
    Debited,
    Insufficient { balance: Decimal },
}

/// The spendable-balance collaborator. The engine debits stakes when a
/// bet is accepted and credits net payouts at resolution; deposits and
/// withdrawals belong to whoever owns the real ledger.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    async fn balance(&self, user_id: &str) -> Result<Decimal, EngineError>;
    async fn debit(&self, user_id: &str, amount: Decimal) -> Result<DebitOutcome, EngineError>;
    async fn credit(&self, user_id: &str, amount: Decimal) -> Result<(), EngineError>;
}

/// Ledger keeping balances as decimal strings under `balance:{user}`.
/// Every mutation (stake debits, payout credits, deposits) runs on the
/// session actor, so the read-check-write here never races with
/// another writer.
pub struct RedisLedger {
    redis: RedisManager,
}

impl RedisLedger {
    pub fn new(redis: RedisManager) -> Self {
        Self { redis }
    }

    async fn read_balance(&self, user_id: &str) -> Result<Decimal, EngineError> {
        let raw = self
            .redis
            .get(&balance_key(user_id))
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        match raw {
            Some(raw) => raw.parse::<Decimal>().map_err(|_| {
                EngineError::Storage(format!("corrupt balance for user {}", user_id))
            }),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn write_balance(&self, user_id: &str, balance: Decimal) -> Result<(), EngineError> {
        self.redis
            .set(&balance_key(user_id), &balance.to_string())
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }
}

fn balance_key(user_id: &str) -> String {
    format!("balance:{}", user_id)
}

#[async_trait]
impl BalanceLedger for RedisLedger {
    async fn balance(&self, user_id: &str) -> Result<Decimal, EngineError> {
        self.read_balance(user_id).await
    }

    async fn debit(&self, user_id: &str, amount: Decimal) -> Result<DebitOutcome, EngineError> {
        let balance = self.read_balance(user_id).await?;
        if balance < amount {
            return Ok(DebitOutcome::Insufficient { balance });
        }
        self.write_balance(user_id, balance - amount).await?;
        Ok(DebitOutcome::Debited)
    }

    async fn credit(&self, user_id: &str, amount: Decimal) -> Result<(), EngineError> {
        let balance = self.read_balance(user_id).await?;
        self.write_balance(user_id, balance + amount).await
    }
}

/// In-memory ledger for tests and Redis-less runs.
#[derive(Default)]
pub struct MemoryLedger {
    balances: RwLock<HashMap<String, Decimal>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceLedger for MemoryLedger {
    async fn balance(&self, user_id: &str) -> Result<Decimal, EngineError> {
        let guard = self
            .balances
            .read()
            .map_err(|_| EngineError::Storage("ledger poisoned".into()))?;
        Ok(guard.get(user_id).copied().unwrap_or(Decimal::ZERO))
    }

    async fn debit(&self, user_id: &str, amount: Decimal) -> Result<DebitOutcome, EngineError> {
        let mut guard = self
            .balances
            .write()
            .map_err(|_| EngineError::Storage("ledger poisoned".into()))?;
        let balance = guard.entry(user_id.to_string()).or_insert(Decimal::ZERO);
        if *balance < amount {
            return Ok(DebitOutcome::Insufficient { balance: *balance });
        }
        *balance -= amount;
        Ok(DebitOutcome::Debited)
    }

    async fn credit(&self, user_id: &str, amount: Decimal) -> Result<(), EngineError> {
        let mut guard = self
            .balances
            .write()
            .map_err(|_| EngineError::Storage("ledger poisoned".into()))?;
        *guard.entry(user_id.to_string()).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}
