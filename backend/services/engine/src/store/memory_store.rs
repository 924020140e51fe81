use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::EngineError;
use crate::store::{SessionStore, StoreResult};
use crate::types::bet_types::BetRecord;
use crate::types::session_types::BettingSession;
use crate::types::settlement_types::SettlementSnapshot;

#[derive(Default)]
struct MemoryState {
    current: Option<String>,
    sessions: HashMap<String, BettingSession>,
    bets: HashMap<(String, String), BetRecord>,
    bettors: HashMap<String, Vec<String>>,
    history: Vec<String>,
    settlements: HashMap<String, SettlementSnapshot>,
}

/// In-memory session store, used by the test suite and for running the
/// backend without Redis.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<MemoryState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> StoreResult<T> {
        let guard = self
            .inner
            .read()
            .map_err(|_| EngineError::Storage("memory store poisoned".into()))?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> StoreResult<T> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| EngineError::Storage("memory store poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn current_session_id(&self) -> StoreResult<Option<String>> {
        self.read(|s| s.current.clone())
    }

    async fn set_current_session_id(&self, id: Option<&str>) -> StoreResult<()> {
        self.write(|s| s.current = id.map(str::to_string))
    }

    async fn load_session(&self, id: &str) -> StoreResult<Option<BettingSession>> {
        self.read(|s| s.sessions.get(id).cloned())
    }

    async fn save_session(&self, session: &BettingSession) -> StoreResult<()> {
        self.write(|s| {
            s.sessions.insert(session.id.clone(), session.clone());
        })
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.write(|s| {
            s.sessions.remove(id);
        })
    }

    async fn load_bet(&self, session_id: &str, user_id: &str) -> StoreResult<Option<BetRecord>> {
        self.read(|s| {
            s.bets
                .get(&(session_id.to_string(), user_id.to_string()))
                .cloned()
        })
    }

    async fn save_bet(&self, record: &BetRecord) -> StoreResult<()> {
        self.write(|s| {
            s.bets.insert(
                (record.session_id.clone(), record.user_id.clone()),
                record.clone(),
            );
        })
    }

    async fn delete_bets(&self, session_id: &str) -> StoreResult<()> {
        self.write(|s| {
            s.bets.retain(|(sid, _), _| sid != session_id);
            s.bettors.remove(session_id);
        })
    }

    async fn add_bettor(&self, session_id: &str, user_id: &str) -> StoreResult<()> {
        self.write(|s| {
            let members = s.bettors.entry(session_id.to_string()).or_default();
            if !members.iter().any(|m| m == user_id) {
                members.push(user_id.to_string());
            }
        })
    }

    async fn bettors(&self, session_id: &str) -> StoreResult<Vec<String>> {
        self.read(|s| s.bettors.get(session_id).cloned().unwrap_or_default())
    }

    async fn push_history(&self, session_id: &str) -> StoreResult<()> {
        self.write(|s| s.history.insert(0, session_id.to_string()))
    }

    async fn remove_history(&self, session_id: &str) -> StoreResult<()> {
        self.write(|s| s.history.retain(|id| id != session_id))
    }

    async fn history(&self, limit: usize) -> StoreResult<Vec<String>> {
        self.read(|s| {
            let take = if limit == 0 { s.history.len() } else { limit };
            s.history.iter().take(take).cloned().collect()
        })
    }

    async fn save_settlement(&self, snapshot: &SettlementSnapshot) -> StoreResult<()> {
        self.write(|s| {
            s.settlements
                .insert(snapshot.session_id.clone(), snapshot.clone());
        })
    }

    async fn load_settlement(&self, session_id: &str) -> StoreResult<Option<SettlementSnapshot>> {
        self.read(|s| s.settlements.get(session_id).cloned())
    }

    async fn delete_settlement(&self, session_id: &str) -> StoreResult<()> {
        self.write(|s| {
            s.settlements.remove(session_id);
        })
    }
}
