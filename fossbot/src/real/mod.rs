//! # Real backend
//!
//! Drives the physical FossBot on a Raspberry Pi. Each capability is implemented over the
//! `embedded-hal` traits so the drivers can be exercised away from the robot, and the Pi
//! peripherals are only wired up in [`rpi`] when building for an ARM Linux target.
//!
//! Floor and light sensors are read through an MCP3008 ADC, the IMU is an MPU6050 on I2C, the
//! motors are driven through an L298N and the wheel encoders are counted from GPIO interrupts.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod gpio;
pub mod mcp3008;
pub mod motor;
pub mod mpu6050;
pub mod odometer;
pub mod ultrasonic;

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
mod rpi;

#[cfg(test)]
pub(crate) mod fake;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{fmt::Debug, rc::Rc};

use crate::{
    audio::AudioPlayer,
    control::{
        Accelerometer, AnalogueReader, Color, ControlError, HardwareError, Motor, NoiseDetector,
        Odometer, RgbLed, UltrasonicSensor,
    },
    params::RobotParams,
    robot::{Backend, BackendKind, RobotError, SENSOR_SCALE},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The peripherals of a physical FossBot.
pub struct RealParts {
    pub left_motor: Box<dyn Motor>,
    pub right_motor: Box<dyn Motor>,
    pub left_odometer: Box<dyn Odometer>,
    pub right_odometer: Box<dyn Odometer>,
    pub ultrasonic: Box<dyn UltrasonicSensor>,
    pub adc: Box<dyn AnalogueReader>,
    pub imu: Box<dyn Accelerometer>,
    pub led: Box<dyn RgbLed>,
    pub noise: Box<dyn NoiseDetector>,
}

pub struct RealBackend {
    params: Rc<RobotParams>,
    parts: RealParts,
    audio: AudioPlayer,
    released: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open the peripherals of the robot this program runs on.
#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub fn open(params: Rc<RobotParams>) -> Result<RealBackend, RobotError> {
    let parts = rpi::open(&params)?;
    Ok(RealBackend::new(params, parts))
}

/// Open the peripherals of the robot this program runs on.
#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
pub fn open(_params: Rc<RobotParams>) -> Result<RealBackend, RobotError> {
    Err(ControlError::from(HardwareError::Unavailable(
        "the real FossBot can only be driven from a Raspberry Pi".into(),
    ))
    .into())
}

/// Map a pin driver error into a [`ControlError`] naming the pin.
pub(crate) fn pin_error<E: Debug>(pin: &'static str) -> impl Fn(E) -> ControlError {
    move |e| {
        HardwareError::Pin {
            pin,
            msg: format!("{:?}", e),
        }
        .into()
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RealBackend {
    pub fn new(params: Rc<RobotParams>, parts: RealParts) -> Self {
        let audio = AudioPlayer::new(&params.audio);
        Self {
            params,
            parts,
            audio,
            released: false,
        }
    }

    /// Position of a floor sensor id in the configured order.
    fn floor_index(&self, id: u8) -> Result<usize, RobotError> {
        self.params.floor_sensors.index_of(id).ok_or_else(|| {
            RobotError::InvalidArgument(format!(
                "no floor sensor with id {}, expected one of {:?}",
                id,
                self.params.floor_sensors.as_array()
            ))
        })
    }
}

impl Backend for RealBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Real
    }

    fn left_motor(&mut self) -> &mut dyn Motor {
        self.parts.left_motor.as_mut()
    }

    fn right_motor(&mut self) -> &mut dyn Motor {
        self.parts.right_motor.as_mut()
    }

    fn left_odometer(&mut self) -> &mut dyn Odometer {
        self.parts.left_odometer.as_mut()
    }

    fn right_odometer(&mut self) -> &mut dyn Odometer {
        self.parts.right_odometer.as_mut()
    }

    fn ultrasonic(&mut self) -> &mut dyn UltrasonicSensor {
        self.parts.ultrasonic.as_mut()
    }

    fn imu(&mut self) -> &mut dyn Accelerometer {
        self.parts.imu.as_mut()
    }

    fn rgb_led(&mut self) -> &mut dyn RgbLed {
        self.parts.led.as_mut()
    }

    fn noise_detector(&mut self) -> &mut dyn NoiseDetector {
        self.parts.noise.as_mut()
    }

    /// Units: 0-1024 sensor scale
    fn floor_sensor(&mut self, id: u8) -> Result<f64, RobotError> {
        let channel = self.params.hardware.floor_channels[self.floor_index(id)?];
        let reading = self.parts.adc.get_reading(channel)? * SENSOR_SCALE;
        debug!("Floor sensor {} (channel {}) reading {:.1}", id, channel, reading);
        Ok(reading)
    }

    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError> {
        let threshold = self.params.line_thresholds.as_array()[self.floor_index(id)?];
        Ok(self.floor_sensor(id)? >= threshold)
    }

    fn light_reading(&mut self) -> Result<f64, RobotError> {
        Ok(self.parts.adc.get_reading(self.params.hardware.light_channel)?)
    }

    fn play_sound(&mut self, id: u32) -> Result<(), RobotError> {
        self.audio.play(id).map_err(RobotError::Audio)
    }

    fn exit(&mut self) -> Result<(), RobotError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let left = self.parts.left_motor.stop();
        let right = self.parts.right_motor.stop();
        if let Err(e) = self.parts.led.set_on(Color::Closed) {
            warn!("Could not switch the LED off: {}", e);
        }
        left?;
        right?;

        info!("Real FossBot released");
        Ok(())
    }
}
