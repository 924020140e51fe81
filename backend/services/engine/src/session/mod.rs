mod actor;
mod api;
mod commands;

pub use actor::spawn_session_engine;
pub use api::SessionEngine;
