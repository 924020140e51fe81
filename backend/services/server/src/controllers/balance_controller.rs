use actix_web::{get, post, web, Responder};
use serde_json::json;
use wager_engine::ledger::BalanceLedger;
use wager_engine::SessionEngine;

use crate::types::balance_types::DepositInput;
use crate::utils::responses::{engine_error, ok};

#[get("/balances/{user_id}")]
pub async fn get_balance(
    ledger: web::Data<dyn BalanceLedger>,
    path: web::Path<String>,
) -> impl Responder {
    let user_id = path.into_inner();
    match ledger.balance(&user_id).await {
        Ok(balance) => ok("Balance", json!({ "user_id": user_id, "balance": balance })),
        Err(e) => engine_error(&e),
    }
}

// Deposits go through the engine so the credit is serialized with any
// in-flight stake debit on the same user.
#[post("/balances/{user_id}/deposit")]
pub async fn deposit(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
    body: web::Json<DepositInput>,
) -> impl Responder {
    let user_id = path.into_inner();
    match engine.deposit(&user_id, body.amount).await {
        Ok(balance) => ok("Balance updated", json!({ "user_id": user_id, "balance": balance })),
        Err(e) => engine_error(&e),
    }
}
