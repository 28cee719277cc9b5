use crate::bus::i2c::I2cBus;
use crate::errors::{DriverError, DriverResult};

const ADDRESS: u8 = 0x1D;
const CHIP: &str = "lsm303d";

// Register addresses for the LSM303D
const WHO_AM_I: u8 = 0x0F;
const CTRL1: u8 = 0x20;
const CTRL2: u8 = 0x21;
const CTRL5: u8 = 0x24;
const CTRL6: u8 = 0x25;
const CTRL7: u8 = 0x26;
const OUT_X_L_M: u8 = 0x08;
const OUT_X_L_A: u8 = 0x28;

// Multi-byte reads need the sub-address auto-increment bit
const AUTO_INC: u8 = 0x80;

const CHIP_ID: u8 = 0x49;

// Sensitivity for +/- 2 g full scale, g per LSB
const ACCEL_SENSITIVITY_2G: f64 = 0.000061;

/// LSM303D accelerometer/magnetometer combo
pub struct Lsm303d {
    address: u8,
}

impl Lsm303d {
    pub fn init(bus: &mut I2cBus) -> DriverResult<Self> {
        let sensor = Self { address: ADDRESS };

        // Verify device identity
        let mut who_am_i_buf = [0u8; 1];
        bus.read_bytes(sensor.address, WHO_AM_I, &mut who_am_i_buf)?;
        if who_am_i_buf[0] != CHIP_ID {
            return Err(DriverError::WrongChipId {
                chip: CHIP,
                expected: CHIP_ID,
                actual: who_am_i_buf[0],
            });
        }

        // CTRL1: 50 Hz accelerometer ODR, all axes enabled
        bus.write_byte(sensor.address, CTRL1, 0b01010111)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to configure CTRL1: {}", e),
            })?;
        // CTRL2: +/- 2 g full scale
        bus.write_byte(sensor.address, CTRL2, 0b00000000)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to configure CTRL2: {}", e),
            })?;
        // CTRL5: high-resolution magnetometer, 50 Hz ODR
        bus.write_byte(sensor.address, CTRL5, 0b01110000)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to configure CTRL5: {}", e),
            })?;
        // CTRL6: +/- 4 gauss full scale
        bus.write_byte(sensor.address, CTRL6, 0b00100000)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to configure CTRL6: {}", e),
            })?;
        // CTRL7: continuous-conversion magnetometer mode
        bus.write_byte(sensor.address, CTRL7, 0b00000000)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to configure CTRL7: {}", e),
            })?;

        Ok(sensor)
    }

    /// Acceleration in g at the +/- 2 g scale.
    pub fn accelerometer(&self, bus: &mut I2cBus) -> DriverResult<[f64; 3]> {
        let raw = self.read_axes(bus, OUT_X_L_A | AUTO_INC)?;
        Ok(raw.map(|axis| axis as f64 * ACCEL_SENSITIVITY_2G))
    }

    /// Raw magnetometer counts, unscaled.
    pub fn magnetometer(&self, bus: &mut I2cBus) -> DriverResult<[f64; 3]> {
        let raw = self.read_axes(bus, OUT_X_L_M | AUTO_INC)?;
        Ok(raw.map(|axis| axis as f64))
    }

    fn read_axes(&self, bus: &mut I2cBus, reg: u8) -> DriverResult<[i16; 3]> {
        let mut buf = [0u8; 6];
        bus.read_bytes(self.address, reg, &mut buf)?;

        Ok([
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        ])
    }
}
