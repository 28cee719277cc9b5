use crate::bus::i2c::I2cBus;
use crate::errors::DriverResult;

pub mod bmp280;
pub mod lsm303d;
pub mod tcs3472;

/// Pressure unit accepted by [`BoardDriver::pressure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    Hectopascals,
    Pascals,
}

/// Read operations offered by the Enviro pHAT board.
///
/// Every call is one synchronous bus transaction sequence; implementations
/// hold no cache and never retry. The poll adapter is generic over this
/// trait so tests can substitute a scripted board.
pub trait BoardDriver {
    /// Clear-scaled light levels, 0-255 per component
    fn rgb(&mut self) -> DriverResult<[f64; 3]>;
    /// Raw magnetometer counts
    fn magnetometer(&mut self) -> DriverResult<[f64; 3]>;
    /// Acceleration in g
    fn accelerometer(&mut self) -> DriverResult<[f64; 3]>;
    /// ISA altitude in metres, derived from pressure
    fn altitude(&mut self) -> DriverResult<f64>;
    /// Temperature in °C
    fn temperature(&mut self) -> DriverResult<f64>;
    fn pressure(&mut self, unit: PressureUnit) -> DriverResult<f64>;
}

/// Hardware driver talking to the board's three chips over one I2C bus.
pub struct EnviroPhat {
    bus: I2cBus,
    light: tcs3472::Tcs3472,
    motion: lsm303d::Lsm303d,
    weather: bmp280::Bmp280,
}

impl EnviroPhat {
    pub const DEFAULT_BUS_PATH: &'static str = "/dev/i2c-1";

    /// Opens the bus and brings all three chips into continuous measurement
    /// mode. Fails fast on a missing bus or a wrong chip ID.
    pub fn open(path: &str) -> DriverResult<Self> {
        let mut bus = I2cBus::new(path)?;

        let light = tcs3472::Tcs3472::init(&mut bus)?;
        let motion = lsm303d::Lsm303d::init(&mut bus)?;
        let weather = bmp280::Bmp280::init(&mut bus)?;

        Ok(Self {
            bus,
            light,
            motion,
            weather,
        })
    }
}

impl BoardDriver for EnviroPhat {
    fn rgb(&mut self) -> DriverResult<[f64; 3]> {
        self.light.rgb(&mut self.bus)
    }

    fn magnetometer(&mut self) -> DriverResult<[f64; 3]> {
        self.motion.magnetometer(&mut self.bus)
    }

    fn accelerometer(&mut self) -> DriverResult<[f64; 3]> {
        self.motion.accelerometer(&mut self.bus)
    }

    fn altitude(&mut self) -> DriverResult<f64> {
        self.weather.altitude(&mut self.bus)
    }

    fn temperature(&mut self) -> DriverResult<f64> {
        self.weather.temperature(&mut self.bus)
    }

    fn pressure(&mut self, unit: PressureUnit) -> DriverResult<f64> {
        self.weather.pressure(&mut self.bus, unit)
    }
}
