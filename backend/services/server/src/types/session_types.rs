use serde::Deserialize;
use validator::Validate;
use wager_engine::types::session_types::Side;

fn default_show_prize_pool() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionInput {
    #[validate(length(min = 1, max = 200))]
    pub question: String,
    #[serde(default = "default_show_prize_pool")]
    pub show_prize_pool: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveSessionInput {
    pub winner: Side,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDisplayInput {
    pub show_prize_pool: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}
