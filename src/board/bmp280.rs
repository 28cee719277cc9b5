use crate::board::PressureUnit;
use crate::bus::i2c::I2cBus;
use crate::errors::{DriverError, DriverResult};

const ADDRESS: u8 = 0x77;
const CHIP: &str = "bmp280";

const REG_ID: u8 = 0xD0;
const REG_CALIB: u8 = 0x88;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_DATA: u8 = 0xF7;

const CHIP_ID: u8 = 0x58;

// osrs_t x2, osrs_p x16, normal mode
const CTRL_MEAS_NORMAL: u8 = 0b01010111;

// Standard atmosphere at sea level, Pa
const SEA_LEVEL_PA: f64 = 101325.0;

/// Factory trim values read once at init
#[derive(Debug, Clone)]
struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
}

impl Calibration {
    fn from_registers(buf: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([buf[i], buf[i + 1]]);
        Self {
            dig_t1: u(0),
            dig_t2: s(2),
            dig_t3: s(4),
            dig_p1: u(6),
            dig_p2: s(8),
            dig_p3: s(10),
            dig_p4: s(12),
            dig_p5: s(14),
            dig_p6: s(16),
            dig_p7: s(18),
            dig_p8: s(20),
            dig_p9: s(22),
        }
    }

    /// Datasheet double-precision compensation. Returns (°C, Pa).
    fn compensate(&self, adc_t: i32, adc_p: i32) -> (f64, f64) {
        let var1 = (adc_t as f64 / 16384.0 - self.dig_t1 as f64 / 1024.0) * self.dig_t2 as f64;
        let var2 = (adc_t as f64 / 131072.0 - self.dig_t1 as f64 / 8192.0).powi(2)
            * self.dig_t3 as f64;
        let t_fine = var1 + var2;
        let temperature = t_fine / 5120.0;

        let var1 = t_fine / 2.0 - 64000.0;
        let var2 = var1 * var1 * self.dig_p6 as f64 / 32768.0;
        let var2 = var2 + var1 * self.dig_p5 as f64 * 2.0;
        let var2 = var2 / 4.0 + self.dig_p4 as f64 * 65536.0;
        let var1 =
            (self.dig_p3 as f64 * var1 * var1 / 524288.0 + self.dig_p2 as f64 * var1) / 524288.0;
        let var1 = (1.0 + var1 / 32768.0) * self.dig_p1 as f64;

        if var1 == 0.0 {
            return (temperature, 0.0);
        }

        let p = 1048576.0 - adc_p as f64;
        let p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = self.dig_p9 as f64 * p * p / 2147483648.0;
        let var2 = p * self.dig_p8 as f64 / 32768.0;
        let pressure = p + (var1 + var2 + self.dig_p7 as f64) / 16.0;

        (temperature, pressure)
    }
}

/// BMP280 pressure/temperature sensor
pub struct Bmp280 {
    address: u8,
    calibration: Calibration,
}

impl Bmp280 {
    pub fn init(bus: &mut I2cBus) -> DriverResult<Self> {
        // Verify device identity
        let mut id_buf = [0u8; 1];
        bus.read_bytes(ADDRESS, REG_ID, &mut id_buf)?;
        if id_buf[0] != CHIP_ID {
            return Err(DriverError::WrongChipId {
                chip: CHIP,
                expected: CHIP_ID,
                actual: id_buf[0],
            });
        }

        let mut calib_buf = [0u8; 24];
        bus.read_bytes(ADDRESS, REG_CALIB, &mut calib_buf)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to read calibration registers: {}", e),
            })?;

        bus.write_byte(ADDRESS, REG_CTRL_MEAS, CTRL_MEAS_NORMAL)
            .map_err(|e| DriverError::Init {
                chip: CHIP,
                reason: format!("Failed to enter normal mode: {}", e),
            })?;

        Ok(Self {
            address: ADDRESS,
            calibration: Calibration::from_registers(&calib_buf),
        })
    }

    pub fn temperature(&self, bus: &mut I2cBus) -> DriverResult<f64> {
        let (temperature, _) = self.read_compensated(bus)?;
        Ok(temperature)
    }

    pub fn pressure(&self, bus: &mut I2cBus, unit: PressureUnit) -> DriverResult<f64> {
        let (_, pascals) = self.read_compensated(bus)?;
        Ok(match unit {
            PressureUnit::Hectopascals => pascals / 100.0,
            PressureUnit::Pascals => pascals,
        })
    }

    /// Altitude above the standard sea-level atmosphere, in metres.
    pub fn altitude(&self, bus: &mut I2cBus) -> DriverResult<f64> {
        let (_, pascals) = self.read_compensated(bus)?;
        Ok(44330.0 * (1.0 - (pascals / SEA_LEVEL_PA).powf(0.1903)))
    }

    fn read_compensated(&self, bus: &mut I2cBus) -> DriverResult<(f64, f64)> {
        // press msb/lsb/xlsb then temp msb/lsb/xlsb, both 20-bit left-aligned
        let mut buf = [0u8; 6];
        bus.read_bytes(self.address, REG_DATA, &mut buf)?;

        let adc_p = (((buf[0] as u32) << 16 | (buf[1] as u32) << 8 | buf[2] as u32) >> 4) as i32;
        let adc_t = (((buf[3] as u32) << 16 | (buf[4] as u32) << 8 | buf[5] as u32) >> 4) as i32;

        Ok(self.calibration.compensate(adc_t, adc_p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from the BMP280 datasheet, section 3.12
    fn datasheet_calibration() -> Calibration {
        Calibration {
            dig_t1: 27504,
            dig_t2: 26435,
            dig_t3: -1000,
            dig_p1: 36477,
            dig_p2: -10685,
            dig_p3: 3024,
            dig_p4: 2855,
            dig_p5: 140,
            dig_p6: -7,
            dig_p7: 15500,
            dig_p8: -14600,
            dig_p9: 6000,
        }
    }

    #[test]
    fn test_compensation_matches_datasheet_example() {
        let calib = datasheet_calibration();
        let (temperature, pressure) = calib.compensate(519888, 415148);

        assert!((temperature - 25.08).abs() < 0.01, "got {temperature}");
        assert!((pressure - 100653.27).abs() < 1.0, "got {pressure}");
    }

    #[test]
    fn test_compensation_guards_division_by_zero() {
        let calib = Calibration {
            dig_p1: 0,
            ..datasheet_calibration()
        };
        let (_, pressure) = calib.compensate(519888, 415148);
        assert_eq!(pressure, 0.0);
    }

    #[test]
    fn test_calibration_word_layout_is_little_endian() {
        let mut buf = [0u8; 24];
        buf[0] = 0x70; // dig_T1 low byte
        buf[1] = 0x6B; // dig_T1 high byte -> 0x6B70 = 27504
        buf[16] = 0xF9; // dig_P6 -> -7
        buf[17] = 0xFF;

        let calib = Calibration::from_registers(&buf);
        assert_eq!(calib.dig_t1, 27504);
        assert_eq!(calib.dig_p6, -7);
    }
}
