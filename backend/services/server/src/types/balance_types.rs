use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DepositInput {
    pub amount: Decimal,
}
