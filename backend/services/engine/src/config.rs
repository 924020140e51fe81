use log::warn;
use rust_decimal::Decimal;
use std::env;

/// Wagering limits and the house cut, fixed when the engine is spawned.
/// The fee percent is stamped onto each session at creation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub user_cap: Decimal,
    pub side_cap: Decimal,
    pub service_fee_percent: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_cap: Decimal::new(10, 0),
            side_cap: Decimal::new(100, 0),
            service_fee_percent: Decimal::new(69, 1),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("USER_CAP", &mut config.user_cap);
        override_from_env("SIDE_CAP", &mut config.side_cap);
        override_from_env("SERVICE_FEE_PERCENT", &mut config.service_fee_percent);
        config
    }
}

fn override_from_env(var: &str, target: &mut Decimal) {
    if let Ok(raw) = env::var(var) {
        match raw.parse::<Decimal>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring unparseable {}={}", var, raw),
        }
    }
}
