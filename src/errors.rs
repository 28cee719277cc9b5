use thiserror::Error;

use crate::bus::i2c::I2cError;
use crate::readings::Channel;

/// Error types for the board driver seam
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("I2C communication failed: {0}")]
    I2c(#[from] I2cError),

    #[error("{chip} wrong chip ID: expected {expected:#04x}, got {actual:#04x}")]
    WrongChipId {
        chip: &'static str,
        expected: u8,
        actual: u8,
    },

    #[error("{chip} initialization failed: {reason}")]
    Init { chip: &'static str, reason: String },

    #[error("{chip} not ready: {reason}")]
    NotReady { chip: &'static str, reason: String },
}

/// Errors the host framework sees from the plugin lifecycle.
///
/// Only poll can fail; init, reconfigure and shutdown never error, and
/// malformed configuration degrades instead of raising.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("failed to retrieve {channel} readings: {source}")]
    Retrieval {
        channel: Channel,
        #[source]
        source: DriverError,
    },
}

/// Result type aliases for convenience
pub type DriverResult<T> = Result<T, DriverError>;
pub type PollResult<T> = Result<T, PluginError>;
