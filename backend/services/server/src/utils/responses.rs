use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;
use wager_engine::EngineError;

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": message,
        "data": data
    }))
}

pub fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "status": "error",
        "message": message
    }))
}

/// Maps an engine error onto the JSON envelope. Cap rejections carry
/// the remaining headroom so the client can offer a corrected amount.
pub fn engine_error(err: &EngineError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let data = match err.remaining() {
        Some(remaining) => json!({ "remaining": remaining }),
        None => json!(null),
    };
    HttpResponse::build(status).json(json!({
        "status": "error",
        "message": err.to_string(),
        "data": data
    }))
}
