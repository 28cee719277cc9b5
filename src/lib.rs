// Public modules
pub mod board;
pub mod bus;
pub mod config;
pub mod errors;
pub mod plugin;
pub mod readings;

// Re-export commonly used types
pub use board::{BoardDriver, EnviroPhat, PressureUnit};
pub use config::{config_schema, resolve_defaults, PluginConfig};
pub use errors::{DriverError, DriverResult, PluginError, PollResult};
pub use plugin::{plugin_info, Handle, PollAdapter, Restart};
pub use readings::{Channel, Reading};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}
