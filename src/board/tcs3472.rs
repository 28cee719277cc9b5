use std::thread;
use std::time::Duration;

use crate::bus::i2c::I2cBus;
use crate::errors::{DriverError, DriverResult};

const ADDRESS: u8 = 0x29;
const CHIP: &str = "tcs3472";

// Register access goes through the command register; 0xA0 selects
// auto-increment protocol.
const CMD: u8 = 0x80;
const CMD_AUTO_INC: u8 = 0xA0;

const REG_ENABLE: u8 = 0x00;
const REG_ATIME: u8 = 0x01;
const REG_STATUS: u8 = 0x13;
const REG_CDATAL: u8 = 0x14;

const ENABLE_PON: u8 = 0x01;
const ENABLE_AEN: u8 = 0x02;
const STATUS_AVALID: u8 = 0x01;

// 213 -> (256 - 213) * 2.4 ms = 103 ms integration
const ATIME_103MS: u8 = 0xD5;

/// TCS3472 RGBC light sensor
pub struct Tcs3472 {
    address: u8,
}

impl Tcs3472 {
    pub fn init(bus: &mut I2cBus) -> DriverResult<Self> {
        let sensor = Self { address: ADDRESS };

        bus.write_byte(sensor.address, CMD | REG_ATIME, ATIME_103MS)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to set integration time: {}", e),
            })?;
        bus.write_byte(sensor.address, CMD | REG_ENABLE, ENABLE_PON)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to power on: {}", e),
            })?;
        // Datasheet requires 2.4 ms after PON before enabling the ADC
        thread::sleep(Duration::from_millis(3));
        bus.write_byte(sensor.address, CMD | REG_ENABLE, ENABLE_PON | ENABLE_AEN)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to enable ADC: {}", e),
            })?;

        Ok(sensor)
    }

    /// Red, green and blue scaled against the clear channel to 0-255.
    pub fn rgb(&self, bus: &mut I2cBus) -> DriverResult<[f64; 3]> {
        let mut status = [0u8; 1];
        bus.read_bytes(self.address, CMD | REG_STATUS, &mut status)?;
        if status[0] & STATUS_AVALID == 0 {
            return Err(DriverError::NotReady {
                chip: CHIP,
                reason: "integration cycle has not completed".to_string(),
            });
        }

        // Clear, red, green, blue as consecutive little-endian u16 words
        let mut buf = [0u8; 8];
        bus.read_bytes(self.address, CMD_AUTO_INC | REG_CDATAL, &mut buf)?;

        let clear = u16::from_le_bytes([buf[0], buf[1]]);
        let red = u16::from_le_bytes([buf[2], buf[3]]);
        let green = u16::from_le_bytes([buf[4], buf[5]]);
        let blue = u16::from_le_bytes([buf[6], buf[7]]);

        if clear == 0 {
            return Ok([0.0, 0.0, 0.0]);
        }

        let scale = |component: u16| component as f64 / clear as f64 * 255.0;
        Ok([scale(red), scale(green), scale(blue)])
    }
}
