use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;
use wager_engine::types::session_types::Side;

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceBetInput {
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
    pub side: Side,
    pub amount: Decimal,
}
