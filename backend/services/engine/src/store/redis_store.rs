use async_trait::async_trait;
use redis_client::RedisManager;

use crate::error::EngineError;
use crate::store::{SessionStore, StoreResult};
use crate::types::bet_types::BetRecord;
use crate::types::session_types::BettingSession;
use crate::types::settlement_types::SettlementSnapshot;

const CURRENT_KEY: &str = "session:current";
const HISTORY_KEY: &str = "sessions:history";

fn session_key(id: &str) -> String {
    format!("session:{}", id)
}

fn bet_key(session_id: &str, user_id: &str) -> String {
    format!("session:{}:bets:{}", session_id, user_id)
}

fn bettors_key(session_id: &str) -> String {
    format!("session:{}:bettors", session_id)
}

fn settlement_key(session_id: &str) -> String {
    format!("session:{}:settlement", session_id)
}

/// Session store backed by Redis. Records are stored as versioned JSON
/// so malformed data fails here, at deserialization, not downstream.
pub struct RedisSessionStore {
    redis: RedisManager,
}

impl RedisSessionStore {
    pub fn new(redis: RedisManager) -> Self {
        Self { redis }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let raw = self
            .redis
            .get(key)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        match raw {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(|e| {
                    EngineError::Storage(format!("corrupt record at {}: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| EngineError::Storage(e.to_string()))?;
        self.redis
            .set(key, &raw)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn current_session_id(&self) -> StoreResult<Option<String>> {
        self.redis
            .get(CURRENT_KEY)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn set_current_session_id(&self, id: Option<&str>) -> StoreResult<()> {
        match id {
            Some(id) => self.redis.set(CURRENT_KEY, id).await,
            None => self.redis.delete(CURRENT_KEY).await,
        }
        .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn load_session(&self, id: &str) -> StoreResult<Option<BettingSession>> {
        self.get_json(&session_key(id)).await
    }

    async fn save_session(&self, session: &BettingSession) -> StoreResult<()> {
        self.set_json(&session_key(&session.id), session).await
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.redis
            .delete(&session_key(id))
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn load_bet(&self, session_id: &str, user_id: &str) -> StoreResult<Option<BetRecord>> {
        self.get_json(&bet_key(session_id, user_id)).await
    }

    async fn save_bet(&self, record: &BetRecord) -> StoreResult<()> {
        self.set_json(&bet_key(&record.session_id, &record.user_id), record)
            .await
    }

    async fn delete_bets(&self, session_id: &str) -> StoreResult<()> {
        let bettors = self.bettors(session_id).await?;
        for user_id in bettors {
            self.redis
                .delete(&bet_key(session_id, &user_id))
                .await
                .map_err(|e| EngineError::Storage(e.to_string()))?;
        }
        self.redis
            .delete(&bettors_key(session_id))
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn add_bettor(&self, session_id: &str, user_id: &str) -> StoreResult<()> {
        self.redis
            .set_add(&bettors_key(session_id), user_id)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn bettors(&self, session_id: &str) -> StoreResult<Vec<String>> {
        self.redis
            .set_members(&bettors_key(session_id))
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn push_history(&self, session_id: &str) -> StoreResult<()> {
        self.redis
            .list_push(HISTORY_KEY, session_id)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn remove_history(&self, session_id: &str) -> StoreResult<()> {
        self.redis
            .list_remove(HISTORY_KEY, session_id)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn history(&self, limit: usize) -> StoreResult<Vec<String>> {
        let stop = if limit == 0 { -1 } else { limit as i64 - 1 };
        self.redis
            .list_range(HISTORY_KEY, 0, stop)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    async fn save_settlement(&self, snapshot: &SettlementSnapshot) -> StoreResult<()> {
        self.set_json(&settlement_key(&snapshot.session_id), snapshot)
            .await
    }

    async fn load_settlement(&self, session_id: &str) -> StoreResult<Option<SettlementSnapshot>> {
        self.get_json(&settlement_key(session_id)).await
    }

    async fn delete_settlement(&self, session_id: &str) -> StoreResult<()> {
        self.redis
            .delete(&settlement_key(session_id))
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }
}
