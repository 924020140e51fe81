pub mod config;
pub mod error;
pub mod ledger;
pub mod session;
pub mod settlement;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use error::EngineError;
pub use session::{spawn_session_engine, SessionEngine};
