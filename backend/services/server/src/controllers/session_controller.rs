use actix_web::{delete, get, patch, post, web, Responder};
use validator::Validate;
use wager_engine::SessionEngine;

use crate::types::session_types::{
    CreateSessionInput, HistoryQuery, ResolveSessionInput, UpdateDisplayInput,
};
use crate::utils::responses::{bad_request, engine_error, ok};

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[post("/sessions")]
pub async fn create_session(
    engine: web::Data<SessionEngine>,
    body: web::Json<CreateSessionInput>,
) -> impl Responder {
    if let Err(e) = body.validate() {
        return bad_request(&e.to_string());
    }

    match engine
        .create_session(body.question.clone(), body.show_prize_pool)
        .await
    {
        Ok(session) => ok("Session created", session),
        Err(e) => engine_error(&e),
    }
}

#[get("/sessions/current")]
pub async fn get_current_session(engine: web::Data<SessionEngine>) -> impl Responder {
    match engine.current_session().await {
        Ok(session) => ok("Current session", session),
        Err(e) => engine_error(&e),
    }
}

#[get("/sessions/history")]
pub async fn get_history(
    engine: web::Data<SessionEngine>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match engine.get_history(limit).await {
        Ok(sessions) => ok("Session history", sessions),
        Err(e) => engine_error(&e),
    }
}

#[get("/sessions/{session_id}")]
pub async fn get_session(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
) -> impl Responder {
    let session_id = path.into_inner();
    match engine.get_session(&session_id).await {
        Ok(session) => ok("Session", session),
        Err(e) => engine_error(&e),
    }
}

#[post("/sessions/{session_id}/freeze")]
pub async fn freeze_session(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
) -> impl Responder {
    let session_id = path.into_inner();
    match engine.freeze(&session_id).await {
        Ok(session) => ok("Session frozen", session),
        Err(e) => engine_error(&e),
    }
}

#[post("/sessions/{session_id}/resolve")]
pub async fn resolve_session(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
    body: web::Json<ResolveSessionInput>,
) -> impl Responder {
    let session_id = path.into_inner();
    match engine.resolve(&session_id, body.winner).await {
        Ok(snapshot) => ok("Session resolved", snapshot),
        Err(e) => engine_error(&e),
    }
}

#[delete("/sessions/{session_id}")]
pub async fn delete_session(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
) -> impl Responder {
    let session_id = path.into_inner();
    match engine.delete(&session_id).await {
        Ok(()) => ok("Session deleted", serde_json::json!(null)),
        Err(e) => engine_error(&e),
    }
}

#[patch("/sessions/{session_id}/display")]
pub async fn update_display(
    engine: web::Data<SessionEngine>,
    path: web::Path<String>,
    body: web::Json<UpdateDisplayInput>,
) -> impl Responder {
    let session_id = path.into_inner();
    match engine
        .set_show_prize_pool(&session_id, body.show_prize_pool)
        .await
    {
        Ok(session) => ok("Display updated", session),
        Err(e) => engine_error(&e),
    }
}
