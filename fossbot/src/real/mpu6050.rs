// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::i2c::{Write, WriteRead};
use std::fmt::Debug;

use crate::control::{Accelerometer, Axis, ControlError, HardwareError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default I2C address of the MPU6050.
pub const DEFAULT_ADDRESS: u8 = 0x68;

const REG_PWR_MGMT_1: u8 = 0x6b;
const REG_ACCEL_XOUT_H: u8 = 0x3b;
const REG_GYRO_XOUT_H: u8 = 0x43;

/// LSB per g at the default +-2g range.
const ACCEL_SCALE: f64 = 16_384.0;

/// LSB per degree/second at the default +-250 deg/s range.
const GYRO_SCALE: f64 = 131.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// MPU6050 accelerometer and gyroscope on an I2C bus.
pub struct Mpu6050<I> {
    i2c: I,
    address: u8,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I, E> Mpu6050<I>
where
    I: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Wake the device up and return it.
    pub fn new(mut i2c: I, address: u8) -> Result<Self, ControlError> {
        i2c.write(address, &[REG_PWR_MGMT_1, 0]).map_err(bus_error)?;
        Ok(Self { i2c, address })
    }

    fn read_word(&mut self, reg: u8) -> Result<i16, ControlError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(bus_error)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl<I, E> Accelerometer for Mpu6050<I>
where
    I: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Units: g
    fn get_acceleration(&mut self, axis: Axis) -> Result<f64, ControlError> {
        let raw = self.read_word(REG_ACCEL_XOUT_H + axis_offset(axis))?;
        Ok(raw as f64 / ACCEL_SCALE)
    }

    /// Units: degrees/second
    fn get_gyro(&mut self, axis: Axis) -> Result<f64, ControlError> {
        let raw = self.read_word(REG_GYRO_XOUT_H + axis_offset(axis))?;
        Ok(raw as f64 / GYRO_SCALE)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn axis_offset(axis: Axis) -> u8 {
    match axis {
        Axis::X => 0,
        Axis::Y => 2,
        Axis::Z => 4,
    }
}

fn bus_error<E: Debug>(e: E) -> ControlError {
    HardwareError::Bus {
        device: "MPU6050",
        msg: format!("{:?}", e),
    }
    .into()
}
