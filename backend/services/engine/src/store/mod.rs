mod memory_store;
mod redis_store;

pub use memory_store::MemorySessionStore;
pub use redis_store::RedisSessionStore;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::types::bet_types::BetRecord;
use crate::types::session_types::BettingSession;
use crate::types::settlement_types::SettlementSnapshot;

pub type StoreResult<T> = Result<T, EngineError>;

/// Durable storage for sessions, bet records, the bettor set, the
/// settlement snapshot and the history index. The engine actor is the
/// only writer; reads may come from anywhere.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Id of the session the system currently points at, if any.
    async fn current_session_id(&self) -> StoreResult<Option<String>>;
    async fn set_current_session_id(&self, id: Option<&str>) -> StoreResult<()>;

    async fn load_session(&self, id: &str) -> StoreResult<Option<BettingSession>>;
    async fn save_session(&self, session: &BettingSession) -> StoreResult<()>;
    async fn delete_session(&self, id: &str) -> StoreResult<()>;

    async fn load_bet(&self, session_id: &str, user_id: &str) -> StoreResult<Option<BetRecord>>;
    async fn save_bet(&self, record: &BetRecord) -> StoreResult<()>;
    /// Removes every bet record and the bettor set for a session.
    async fn delete_bets(&self, session_id: &str) -> StoreResult<()>;

    async fn add_bettor(&self, session_id: &str, user_id: &str) -> StoreResult<()>;
    async fn bettors(&self, session_id: &str) -> StoreResult<Vec<String>>;

    /// Newest-first index of resolved session ids.
    async fn push_history(&self, session_id: &str) -> StoreResult<()>;
    async fn remove_history(&self, session_id: &str) -> StoreResult<()>;
    async fn history(&self, limit: usize) -> StoreResult<Vec<String>>;

    async fn save_settlement(&self, snapshot: &SettlementSnapshot) -> StoreResult<()>;
    async fn load_settlement(&self, session_id: &str) -> StoreResult<Option<SettlementSnapshot>>;
    async fn delete_settlement(&self, session_id: &str) -> StoreResult<()>;
}
