pub mod bet_types;
pub mod session_types;
pub mod settlement_types;
