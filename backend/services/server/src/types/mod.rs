pub mod balance_types;
pub mod bet_types;
pub mod session_types;
