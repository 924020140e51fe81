pub mod balance_controller;
pub mod bet_controller;
pub mod session_controller;
