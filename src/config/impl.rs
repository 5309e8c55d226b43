use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration
///
/// Loads `.env` first (if present), then configuration from the TOML file
/// and `SG`-prefixed environment variables. If neither exists, in-memory
/// defaults are used.
///
/// # Examples
/// ```no_run
/// use shortgate::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    CONFIG.get_or_init(|| {
        dotenvy::dotenv().ok();
        ArcSwap::from_pointee(StaticConfig::load())
    });
}

/// Re-read configuration sources and swap the global instance
///
/// Readers holding an Arc from `get_config()` keep their snapshot;
/// subsequent `get_config()` calls see the new values.
pub fn reload_config() {
    if let Some(cell) = CONFIG.get() {
        cell.store(Arc::new(StaticConfig::load()));
    }
}
