use actix_web::{get, post, web, Responder};
use validator::Validate;
use wager_engine::SessionEngine;

use crate::types::bet_types::PlaceBetInput;
use crate::utils::responses::{bad_request, engine_error, ok};

#[post("/sessions/{session_id}/bets")]
pub async fn place_bet(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
    body: web::Json<PlaceBetInput>,
) -> impl Responder {
    if let Err(e) = body.validate() {
        return bad_request(&e.to_string());
    }

    let session_id = path.into_inner();
    match engine
        .place_bet(&session_id, &body.user_id, body.side, body.amount)
        .await
    {
        Ok(accepted) => ok("Bet accepted", accepted),
        Err(e) => engine_error(&e),
    }
}

#[get("/sessions/{session_id}/bets")]
pub async fn get_all_bets(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
) -> impl Responder {
    let session_id = path.into_inner();
    match engine.get_all_bets(&session_id).await {
        Ok(records) => ok("Session bets", records),
        Err(e) => engine_error(&e),
    }
}

#[get("/sessions/{session_id}/bets/{user_id}")]
pub async fn get_user_bets(
    engine: web::Data<SessionEngine>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (session_id, user_id) = path.into_inner();
    match engine.get_user_bets(&session_id, &user_id).await {
        Ok(record) => ok("User bets", record),
        Err(e) => engine_error(&e),
    }
}
