use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One independently toggleable sensor capability of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Rgb,
    Magnetometer,
    Accelerometer,
    Weather,
}

impl Channel {
    /// Fixed poll order
    pub const ALL: [Channel; 4] = [
        Channel::Rgb,
        Channel::Magnetometer,
        Channel::Accelerometer,
        Channel::Weather,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Rgb => "rgb",
            Channel::Magnetometer => "magnetometer",
            Channel::Accelerometer => "accelerometer",
            Channel::Weather => "weather",
        }
    }

    /// Configuration option holding this channel's enable flag
    pub fn enable_key(self) -> &'static str {
        match self {
            Channel::Rgb => "rgbSensor",
            Channel::Magnetometer => "magnetometerSensor",
            Channel::Accelerometer => "accelerometerSensor",
            Channel::Weather => "weatherSensor",
        }
    }

    /// Configuration option holding this channel's asset name
    pub fn name_key(self) -> &'static str {
        match self {
            Channel::Rgb => "rgbSensorName",
            Channel::Magnetometer => "magnetometerSensorName",
            Channel::Accelerometer => "accelerometerSensorName",
            Channel::Weather => "weatherSensorName",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RGB light levels scaled against the clear channel
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RgbValues {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Three-axis vector reading (magnetometer counts or acceleration in g)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AxisValues {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Barometric readings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeatherValues {
    /// ISA altitude (m)
    pub altitude: f64,
    /// Temperature (°C)
    pub temperature: f64,
    /// Atmospheric pressure (hPa)
    pub pressure: f64,
}

/// Per-channel numeric payload. Serialized untagged so a record carries the
/// plain field map the host framework expects.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ReadingValues {
    Rgb(RgbValues),
    Axes(AxisValues),
    Weather(WeatherValues),
}

/// One timestamped, keyed record of numeric values for a single channel.
///
/// Ownership transfers to the caller at the end of each poll call; the
/// adapter keeps nothing.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Reading {
    pub asset: String,
    pub timestamp: DateTime<Utc>,
    pub key: Uuid,
    pub readings: ReadingValues,
}

impl Reading {
    /// Create a record with a freshly generated random key.
    pub fn new(asset: String, timestamp: DateTime<Utc>, readings: ReadingValues) -> Self {
        Self {
            asset,
            timestamp,
            key: Uuid::new_v4(),
            readings,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
