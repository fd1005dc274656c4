//! Centralized branding constants
//!
//! All product naming comes from this module.
//!
//! # Usage
//!
//! ```rust
//! use pulselink_core::branding;
//!
//! println!("App: {}", branding::DISPLAY_NAME);
//! let var = branding::env_var("PORT"); // "PULSELINK_PORT"
//! ```

/// Human-readable product name.
pub const DISPLAY_NAME: &str = "Pulselink";

/// Machine identifier (used for data directories).
pub const IDENTIFIER: &str = "pulselink";

/// Prefix for rolling log files (e.g. `pulselink.2026-01-22.log`).
pub const LOG_PREFIX: &str = "pulselink";

/// Default port for the HTTP gateway.
pub const DEFAULT_GATEWAY_PORT: u16 = 3180;

/// Prefix shared by all configuration environment variables.
pub const ENV_PREFIX: &str = "PULSELINK_";

/// Default database file name.
pub const DATABASE_FILE: &str = "pulselink.db";

/// Build the full environment variable name for a setting.
///
/// # Example
/// ```
/// assert_eq!(pulselink_core::branding::env_var("MASTER_KEY"), "PULSELINK_MASTER_KEY");
/// ```
pub fn env_var(name: &str) -> String {
    format!("{}{}", ENV_PREFIX, name)
}
