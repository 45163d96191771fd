//! Settings and configuration module
//!
//! Provides unified configuration with:
//! - JSON file loading
//! - `WRITEGUARD_*` environment overrides
//! - Defaults for every field

pub mod settings;

pub use settings::{
    ConfigError, DEFAULT_BASE_URL, DEFAULT_STATE_PATH, DEFAULT_STATUS_TOOL, DEFAULT_USER_AGENT,
    ENV_API_KEY, ENV_BASE_URL, ENV_STATE_PATH, ENV_VERIFY_PATH, GuardConfig,
};
