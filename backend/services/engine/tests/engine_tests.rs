use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wager_engine::error::EngineError;
use wager_engine::ledger::{BalanceLedger, MemoryLedger};
use wager_engine::settlement::compute_settlement;
use wager_engine::store::{MemorySessionStore, SessionStore, StoreResult};
use wager_engine::types::bet_types::BetRecord;
use wager_engine::types::session_types::{BettingSession, SessionStatus, Side};
use wager_engine::types::settlement_types::SettlementSnapshot;
use wager_engine::{spawn_session_engine, EngineConfig, SessionEngine};

struct Harness {
    engine: SessionEngine,
    store: Arc<MemorySessionStore>,
    ledger: Arc<MemoryLedger>,
}

fn spawn(config: EngineConfig) -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let engine = spawn_session_engine(config, store.clone(), ledger.clone());
    Harness {
        engine,
        store,
        ledger,
    }
}

fn default_harness() -> Harness {
    spawn(EngineConfig::default())
}

async fn seed(ledger: &MemoryLedger, users: &[&str], amount: Decimal) {
    for user in users {
        ledger.credit(user, amount).await.unwrap();
    }
}

#[tokio::test]
async fn create_conflicts_while_a_session_is_active() {
    let h = default_harness();

    let first = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    let err = h
        .engine
        .create_session("Another round?".into(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // Freezing is not terminal either.
    h.engine.freeze(&first.id).await.unwrap();
    let err = h
        .engine
        .create_session("Another round?".into(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn create_is_allowed_once_the_previous_session_resolved() {
    let h = default_harness();

    let first = h
        .engine
        .create_session("Round one?".into(), true)
        .await
        .unwrap();
    h.engine.freeze(&first.id).await.unwrap();
    h.engine.resolve(&first.id, Side::Left).await.unwrap();

    let second = h
        .engine
        .create_session("Round two?".into(), true)
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.status, SessionStatus::Open);
}

#[tokio::test]
async fn bets_update_pools_and_distinct_bettor_counts() {
    let h = default_harness();
    seed(&h.ledger, &["alice", "bob"], dec!(100)).await;

    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(2))
        .await
        .unwrap();
    h.engine
        .place_bet(&session.id, "alice", Side::Right, dec!(1))
        .await
        .unwrap();
    let accepted = h
        .engine
        .place_bet(&session.id, "bob", Side::Left, dec!(4))
        .await
        .unwrap();

    let session = accepted.session;
    assert_eq!(session.left_pool, dec!(6));
    assert_eq!(session.right_pool, dec!(1));
    assert_eq!(session.total_pool(), dec!(7));
    // Alice bet both sides but is one distinct bettor per side.
    assert_eq!(session.left_bettor_count, 2);
    assert_eq!(session.right_bettor_count, 1);

    let record = h.engine.get_user_bets(&session.id, "alice").await.unwrap();
    assert_eq!(record.left_amount, dec!(2));
    assert_eq!(record.right_amount, dec!(1));
    assert_eq!(record.transactions.len(), 2);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    let err = h
        .engine
        .place_bet(&session.id, "alice", Side::Left, dec!(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = h
        .engine
        .place_bet(&session.id, "alice", Side::Left, dec!(-3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn user_cap_rejects_with_remaining_headroom() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(6))
        .await
        .unwrap();

    // $6 placed against a $10 cap leaves $4 of headroom.
    let err = h
        .engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::UserCapExceeded { remaining: dec!(4) });

    // The rejected bet left no trace in the pools.
    let session = h.engine.get_session(&session.id).await.unwrap();
    assert_eq!(session.left_pool, dec!(6));
    assert_eq!(h.ledger.balance("alice").await.unwrap(), dec!(94));
}

#[tokio::test]
async fn side_cap_rejects_with_remaining_headroom() {
    let config = EngineConfig {
        user_cap: dec!(500),
        side_cap: dec!(100),
        ..EngineConfig::default()
    };
    let h = spawn(config);
    seed(&h.ledger, &["alice", "bob"], dec!(500)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(70))
        .await
        .unwrap();
    let err = h
        .engine
        .place_bet(&session.id, "bob", Side::Left, dec!(40))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::SideCapExceeded {
            side: Side::Left,
            remaining: dec!(30)
        }
    );

    // The other side has its own cap.
    h.engine
        .place_bet(&session.id, "bob", Side::Right, dec!(40))
        .await
        .unwrap();
}

#[tokio::test]
async fn insufficient_balance_is_rejected_before_pool_mutation() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(2)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    let err = h
        .engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance { balance: dec!(2) });

    let session = h.engine.get_session(&session.id).await.unwrap();
    assert_eq!(session.total_pool(), Decimal::ZERO);
}

#[tokio::test]
async fn lifecycle_ordering_is_enforced() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    // Resolve before freeze is rejected.
    let err = h.engine.resolve(&session.id, Side::Left).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    h.engine.freeze(&session.id).await.unwrap();

    // No bets once frozen, no second freeze.
    let err = h
        .engine
        .place_bet(&session.id, "alice", Side::Left, dec!(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    let err = h.engine.freeze(&session.id).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    h.engine.resolve(&session.id, Side::Left).await.unwrap();

    // Terminal: no bets, no freeze.
    let err = h
        .engine
        .place_bet(&session.id, "alice", Side::Left, dec!(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    let err = h.engine.freeze(&session.id).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn worked_resolution_scenario_pays_winners_and_forfeits_losers() {
    let h = default_harness();
    seed(&h.ledger, &["alice", "bob"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(6))
        .await
        .unwrap();
    h.engine
        .place_bet(&session.id, "bob", Side::Left, dec!(4))
        .await
        .unwrap();
    h.engine
        .place_bet(&session.id, "bob", Side::Right, dec!(3))
        .await
        .unwrap();

    h.engine.freeze(&session.id).await.unwrap();
    let snapshot = h.engine.resolve(&session.id, Side::Left).await.unwrap();

    assert_eq!(snapshot.winning_pool, dec!(10));
    assert_eq!(snapshot.losing_pool, dec!(3));
    assert_eq!(snapshot.total_pool, dec!(13));

    // alice: 100 - 6 + 6*2*(1 - 0.069) = 105.172
    assert_eq!(h.ledger.balance("alice").await.unwrap(), dec!(105.172));
    // bob: 100 - 7 + 4*2*(1 - 0.069) = 100.448; the $3 right stake forfeits.
    assert_eq!(h.ledger.balance("bob").await.unwrap(), dec!(100.448));

    let session = h.engine.get_session(&session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Resolved);
    assert_eq!(session.winner, Some(Side::Left));

    let history = h.engine.get_history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, session.id);
}

#[tokio::test]
async fn retried_resolve_returns_the_stored_snapshot_without_recrediting() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap();
    h.engine.freeze(&session.id).await.unwrap();

    let first = h.engine.resolve(&session.id, Side::Left).await.unwrap();
    let balance_after_first = h.ledger.balance("alice").await.unwrap();

    let second = h.engine.resolve(&session.id, Side::Left).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.ledger.balance("alice").await.unwrap(), balance_after_first);

    // History is not duplicated by the retry either.
    let history = h.engine.get_history(10).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn resolving_with_a_different_winner_is_rejected() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap();
    h.engine.freeze(&session.id).await.unwrap();
    h.engine.resolve(&session.id, Side::Left).await.unwrap();

    let err = h.engine.resolve(&session.id, Side::Right).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    // 100 - 5 + 5*2*(1 - 0.069) = 104.31, unchanged by the rejected retry.
    assert_eq!(h.ledger.balance("alice").await.unwrap(), dec!(104.31));
}

#[tokio::test]
async fn concurrent_bets_cannot_jointly_exceed_the_side_cap() {
    let config = EngineConfig {
        user_cap: dec!(100),
        side_cap: dec!(100),
        ..EngineConfig::default()
    };
    let h = spawn(config);
    seed(&h.ledger, &["alice", "bob"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    let e1 = h.engine.clone();
    let e2 = h.engine.clone();
    let id1 = session.id.clone();
    let id2 = session.id.clone();
    let a = tokio::spawn(async move { e1.place_bet(&id1, "alice", Side::Left, dec!(60)).await });
    let b = tokio::spawn(async move { e2.place_bet(&id2, "bob", Side::Left, dec!(60)).await });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    let rejection = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(
        *rejection,
        EngineError::SideCapExceeded {
            side: Side::Left,
            remaining: dec!(40)
        }
    );

    let session = h.engine.get_session(&session.id).await.unwrap();
    assert_eq!(session.left_pool, dec!(60));
}

#[tokio::test]
async fn concurrent_bets_conserve_the_pool_total() {
    let config = EngineConfig {
        user_cap: dec!(10),
        side_cap: dec!(1000),
        ..EngineConfig::default()
    };
    let h = spawn(config);

    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..25 {
        let user = format!("user-{}", i);
        seed(&h.ledger, &[user.as_str()], dec!(10)).await;
        let engine = h.engine.clone();
        let session_id = session.id.clone();
        let side = if i % 2 == 0 { Side::Left } else { Side::Right };
        handles.push(tokio::spawn(async move {
            engine.place_bet(&session_id, &user, side, dec!(3)).await
        }));
    }

    let mut accepted_total = Decimal::ZERO;
    for handle in handles {
        if let Ok(accepted) = handle.await.unwrap() {
            accepted_total += accepted.record.transactions.last().unwrap().amount;
        }
    }

    let session = h.engine.get_session(&session.id).await.unwrap();
    assert_eq!(session.total_pool(), accepted_total);
    assert_eq!(session.total_pool(), dec!(75));
}

#[tokio::test]
async fn delete_removes_the_session_and_all_child_records() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    h.engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap();
    h.engine.freeze(&session.id).await.unwrap();
    h.engine.resolve(&session.id, Side::Left).await.unwrap();

    h.engine.delete(&session.id).await.unwrap();

    let err = h.engine.get_session(&session.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(h.engine.get_history(10).await.unwrap().is_empty());
    assert!(h.store.load_session(&session.id).await.unwrap().is_none());
    assert!(h
        .store
        .load_bet(&session.id, "alice")
        .await
        .unwrap()
        .is_none());
    assert!(h
        .store
        .load_settlement(&session.id)
        .await
        .unwrap()
        .is_none());
    assert!(h.engine.current_session().await.unwrap().is_none());

    let err = h.engine.delete(&session.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn user_bets_query_returns_a_zero_valued_record_when_absent() {
    let h = default_harness();
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    let record = h
        .engine
        .get_user_bets(&session.id, "nobody")
        .await
        .unwrap();
    assert_eq!(record.left_amount, Decimal::ZERO);
    assert_eq!(record.right_amount, Decimal::ZERO);
    assert!(record.transactions.is_empty());
    assert_eq!(record.user_id, "nobody");
}

#[tokio::test]
async fn engine_rehydrates_session_state_from_the_store() {
    let store = Arc::new(MemorySessionStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    seed(&ledger, &["alice"], dec!(100)).await;

    let engine = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let session = engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    engine
        .place_bet(&session.id, "alice", Side::Left, dec!(4))
        .await
        .unwrap();
    drop(engine);

    let revived = spawn_session_engine(EngineConfig::default(), store, ledger);
    let current = revived.current_session().await.unwrap().unwrap();
    assert_eq!(current.id, session.id);
    assert_eq!(current.left_pool, dec!(4));
    let record = revived.get_user_bets(&session.id, "alice").await.unwrap();
    assert_eq!(record.left_amount, dec!(4));
}

/// Store wrapper that fails selected operations on demand, to exercise
/// the compensating-refund and settlement-retry paths.
struct FlakyStore {
    inner: MemorySessionStore,
    fail_session_writes: AtomicBool,
    fail_history_writes: AtomicBool,
    fail_current_reads: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemorySessionStore::new(),
            fail_session_writes: AtomicBool::new(false),
            fail_history_writes: AtomicBool::new(false),
            fail_current_reads: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn current_session_id(&self) -> StoreResult<Option<String>> {
        if self.fail_current_reads.load(Ordering::SeqCst) {
            return Err(EngineError::Storage("injected read failure".into()));
        }
        self.inner.current_session_id().await
    }
    async fn set_current_session_id(&self, id: Option<&str>) -> StoreResult<()> {
        self.inner.set_current_session_id(id).await
    }
    async fn load_session(&self, id: &str) -> StoreResult<Option<BettingSession>> {
        self.inner.load_session(id).await
    }
    async fn save_session(&self, session: &BettingSession) -> StoreResult<()> {
        if self.fail_session_writes.load(Ordering::SeqCst) {
            return Err(EngineError::Storage("injected write failure".into()));
        }
        self.inner.save_session(session).await
    }
    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_session(id).await
    }
    async fn load_bet(&self, session_id: &str, user_id: &str) -> StoreResult<Option<BetRecord>> {
        self.inner.load_bet(session_id, user_id).await
    }
    async fn save_bet(&self, record: &BetRecord) -> StoreResult<()> {
        self.inner.save_bet(record).await
    }
    async fn delete_bets(&self, session_id: &str) -> StoreResult<()> {
        self.inner.delete_bets(session_id).await
    }
    async fn add_bettor(&self, session_id: &str, user_id: &str) -> StoreResult<()> {
        self.inner.add_bettor(session_id, user_id).await
    }
    async fn bettors(&self, session_id: &str) -> StoreResult<Vec<String>> {
        self.inner.bettors(session_id).await
    }
    async fn push_history(&self, session_id: &str) -> StoreResult<()> {
        if self.fail_history_writes.load(Ordering::SeqCst) {
            return Err(EngineError::Storage("injected write failure".into()));
        }
        self.inner.push_history(session_id).await
    }
    async fn remove_history(&self, session_id: &str) -> StoreResult<()> {
        self.inner.remove_history(session_id).await
    }
    async fn history(&self, limit: usize) -> StoreResult<Vec<String>> {
        self.inner.history(limit).await
    }
    async fn save_settlement(&self, snapshot: &SettlementSnapshot) -> StoreResult<()> {
        self.inner.save_settlement(snapshot).await
    }
    async fn load_settlement(&self, session_id: &str) -> StoreResult<Option<SettlementSnapshot>> {
        self.inner.load_settlement(session_id).await
    }
    async fn delete_settlement(&self, session_id: &str) -> StoreResult<()> {
        self.inner.delete_settlement(session_id).await
    }
}

#[tokio::test]
async fn store_failure_during_bet_refunds_the_debit() {
    let store = Arc::new(FlakyStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    seed(&ledger, &["alice"], dec!(100)).await;

    let engine = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let session = engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    store.fail_session_writes.store(true, Ordering::SeqCst);
    let err = engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));
    store.fail_session_writes.store(false, Ordering::SeqCst);

    // The stake came back and the pools never moved.
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(100));
    let session = engine.get_session(&session.id).await.unwrap();
    assert_eq!(session.total_pool(), Decimal::ZERO);
    let record = engine.get_user_bets(&session.id, "alice").await.unwrap();
    assert_eq!(record.total(), Decimal::ZERO);

    // The same bet succeeds once the store recovers.
    engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap();
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(95));
}

#[tokio::test]
async fn resolve_retried_after_a_history_write_failure_pays_winners() {
    let store = Arc::new(FlakyStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    seed(&ledger, &["alice"], dec!(100)).await;

    let engine = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let session = engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap();
    engine.freeze(&session.id).await.unwrap();

    store.fail_history_writes.store(true, Ordering::SeqCst);
    let err = engine.resolve(&session.id, Side::Left).await.unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));
    store.fail_history_writes.store(false, Ordering::SeqCst);

    // The session write never happened, so nothing was paid out yet.
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(95));
    drop(engine);

    // A fresh process retries the resolution over the same store.
    let revived = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let snapshot = revived.resolve(&session.id, Side::Left).await.unwrap();
    assert!(snapshot.credited_at.is_some());
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(104.31));

    let stored = store.load_session(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Resolved);
    assert_eq!(revived.get_history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn resolve_retry_after_restart_credits_unpaid_winners() {
    let store = Arc::new(MemorySessionStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    seed(&ledger, &["alice"], dec!(100)).await;

    let engine = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let session = engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    engine
        .place_bet(&session.id, "alice", Side::Left, dec!(5))
        .await
        .unwrap();
    engine.freeze(&session.id).await.unwrap();
    drop(engine);

    // Recreate the state a crash between the session write and the
    // credit loop leaves behind: resolved session, stored snapshot, no
    // credited marker, winners unpaid.
    let mut stored = store.load_session(&session.id).await.unwrap().unwrap();
    let record = store.load_bet(&session.id, "alice").await.unwrap().unwrap();
    let snapshot = compute_settlement(&stored, &[record], Side::Left, Utc::now());
    store.save_settlement(&snapshot).await.unwrap();
    store.push_history(&session.id).await.unwrap();
    stored.status = SessionStatus::Resolved;
    stored.winner = Some(Side::Left);
    stored.resolved_at = Some(snapshot.resolved_at);
    store.save_session(&stored).await.unwrap();
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(95));

    let revived = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let first = revived.resolve(&session.id, Side::Left).await.unwrap();
    assert!(first.credited_at.is_some());
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(104.31));

    // A further retry finds the marker and leaves the ledger alone.
    let second = revived.resolve(&session.id, Side::Left).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(ledger.balance("alice").await.unwrap(), dec!(104.31));
}

#[tokio::test]
async fn create_is_refused_when_only_the_store_knows_the_active_session() {
    let store = Arc::new(FlakyStore::new());
    let ledger = Arc::new(MemoryLedger::new());

    let engine = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    let session = engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();
    drop(engine);

    // Hydration fails, so the revived actor starts with no session in
    // memory while the store still holds the open one.
    store.fail_current_reads.store(true, Ordering::SeqCst);
    let revived = spawn_session_engine(EngineConfig::default(), store.clone(), ledger.clone());
    assert!(revived.current_session().await.unwrap().is_none());
    store.fail_current_reads.store(false, Ordering::SeqCst);

    let err = revived
        .create_session("Another round?".into(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    assert_eq!(
        store.current_session_id().await.unwrap().unwrap(),
        session.id
    );
}

#[tokio::test]
async fn deposits_accumulate_and_reject_non_positive_amounts() {
    let h = default_harness();

    assert_eq!(h.engine.deposit("alice", dec!(20)).await.unwrap(), dec!(20));
    assert_eq!(h.engine.deposit("alice", dec!(5)).await.unwrap(), dec!(25));

    let err = h.engine.deposit("alice", dec!(0)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let err = h.engine.deposit("", dec!(5)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(h.ledger.balance("alice").await.unwrap(), dec!(25));
}

#[tokio::test]
async fn concurrent_deposit_and_bet_settle_to_an_exact_balance() {
    let h = default_harness();
    seed(&h.ledger, &["alice"], dec!(100)).await;
    let session = h
        .engine
        .create_session("Will X happen?".into(), true)
        .await
        .unwrap();

    let e1 = h.engine.clone();
    let e2 = h.engine.clone();
    let id = session.id.clone();
    let bet = tokio::spawn(async move { e1.place_bet(&id, "alice", Side::Left, dec!(5)).await });
    let top_up = tokio::spawn(async move { e2.deposit("alice", dec!(20)).await });

    bet.await.unwrap().unwrap();
    top_up.await.unwrap().unwrap();

    assert_eq!(h.ledger.balance("alice").await.unwrap(), dec!(115));
}
