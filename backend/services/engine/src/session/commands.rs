use rust_decimal::Decimal;
use tokio::sync::oneshot;

use crate::error::EngineError;
use crate::types::bet_types::{BetAccepted, BetRecord};
use crate::types::session_types::{BettingSession, Side};
use crate::types::settlement_types::SettlementSnapshot;

pub type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

#[derive(Debug)]
pub enum Command {
    CreateSession(String, bool, Reply<BettingSession>),
    PlaceBet(String, String, Side, Decimal, Reply<BetAccepted>),
    Freeze(String, Reply<BettingSession>),
    Resolve(String, Side, Reply<SettlementSnapshot>),
    Delete(String, Reply<()>),
    SetShowPrizePool(String, bool, Reply<BettingSession>),
    Deposit(String, Decimal, Reply<Decimal>),

    GetCurrent(Reply<Option<BettingSession>>),
    GetSession(String, Reply<BettingSession>),
    GetUserBets(String, String, Reply<BetRecord>),
    GetAllBets(String, Reply<Vec<BetRecord>>),
    GetHistory(usize, Reply<Vec<BettingSession>>),
}
