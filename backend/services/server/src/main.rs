mod controllers;
mod types;
mod utils;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use log::info;
use std::env;
use std::sync::Arc;

use redis_client::RedisManager;
use wager_engine::ledger::{BalanceLedger, RedisLedger};
use wager_engine::store::RedisSessionStore;
use wager_engine::{spawn_session_engine, EngineConfig};

use crate::controllers::balance_controller::{deposit, get_balance};
use crate::controllers::bet_controller::{get_all_bets, get_user_bets, place_bet};
use crate::controllers::session_controller::{
    create_session, delete_session, freeze_session, get_current_session, get_history,
    get_session, resolve_session, update_display,
};

async fn health() -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(r#"{"status": "Ok"}"#)
}

async fn run() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let redis_url =
        env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let redis_manager = RedisManager::init_global(&redis_url)
        .expect("Failed to initialize Redis manager");

    redis_manager
        .connect()
        .await
        .expect("Failed to connect to Redis");

    let store = Arc::new(RedisSessionStore::new(redis_manager.clone()));
    let ledger: Arc<dyn BalanceLedger> = Arc::new(RedisLedger::new(redis_manager.clone()));

    let engine = spawn_session_engine(EngineConfig::from_env(), store, ledger.clone());
    info!("Session engine ready");

    let engine_data = web::Data::new(engine);
    let ledger_data: web::Data<dyn BalanceLedger> = web::Data::from(ledger);

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    info!("Listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(engine_data.clone())
            .app_data(ledger_data.clone())
            .service(create_session)
            .service(get_current_session)
            .service(get_history)
            .service(get_session)
            .service(freeze_session)
            .service(resolve_session)
            .service(delete_session)
            .service(update_display)
            .service(place_bet)
            .service(get_all_bets)
            .service(get_user_bets)
            .service(get_balance)
            .service(deposit)
            .route("/health", web::get().to(health))
    })
    .bind(bind_addr)?
    .run()
    .await
}

fn main() -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");
    runtime.block_on(run())
}
