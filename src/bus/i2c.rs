#[cfg(target_os = "linux")]
use i2cdev::core::I2CDevice;
#[cfg(target_os = "linux")]
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};

/// I2C bus error type - platform specific
#[cfg(target_os = "linux")]
pub type I2cError = LinuxI2CError;

#[cfg(not(target_os = "linux"))]
#[derive(Debug)]
pub struct I2cError(String);

#[cfg(not(target_os = "linux"))]
impl std::fmt::Display for I2cError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "I2C not supported on this platform: {}", self.0)
    }
}

#[cfg(not(target_os = "linux"))]
impl std::error::Error for I2cError {}

/// Shared I2C bus for the board's chips. All transfers are synchronous; the
/// slave address is selected per call so one device handle serves every chip.
#[cfg(target_os = "linux")]
pub struct I2cBus {
    device: LinuxI2CDevice,
}

#[cfg(not(target_os = "linux"))]
pub struct I2cBus {
    _phantom: std::marker::PhantomData<()>,
}

#[cfg(target_os = "linux")]
impl I2cBus {
    pub fn new(path: &str) -> Result<Self, I2cError> {
        let device = LinuxI2CDevice::new(path, 0)?;
        Ok(Self { device })
    }

    pub fn read_bytes(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), I2cError> {
        self.device.set_slave_address(address as u16)?;

        if buf.len() == 1 {
            // Use SMBus read byte data for single byte reads
            let byte = self.device.smbus_read_byte_data(reg)?;
            buf[0] = byte;
        } else {
            // Use SMBus block read for multi-byte reads
            let temp_buf = self.device.smbus_read_i2c_block_data(reg, buf.len() as u8)?;
            buf.copy_from_slice(&temp_buf);
        }

        Ok(())
    }

    pub fn write_byte(&mut self, address: u8, reg: u8, byte: u8) -> Result<(), I2cError> {
        self.device.set_slave_address(address as u16)?;
        self.device.smbus_write_byte_data(reg, byte)
    }
}

#[cfg(not(target_os = "linux"))]
impl I2cBus {
    pub fn new(_path: &str) -> Result<Self, I2cError> {
        Err(I2cError("I2C is only supported on Linux".to_string()))
    }

    pub fn read_bytes(&mut self, _address: u8, _reg: u8, _buf: &mut [u8]) -> Result<(), I2cError> {
        Err(I2cError("I2C is only supported on Linux".to_string()))
    }

    pub fn write_byte(&mut self, _address: u8, _reg: u8, _byte: u8) -> Result<(), I2cError> {
        Err(I2cError("I2C is only supported on Linux".to_string()))
    }
}
