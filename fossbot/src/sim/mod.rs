//! # Simulated backend
//!
//! A FossBot living in the simulator. Every capability is a scene object reached through the
//! [`SessionLink`], which is opened when the backend is built and closed when it exits.
//!
//! The simulator also answers a few state queries with no physical counterpart (collisions,
//! bounds and orientation), which are only available on a `FossBot<SimBackend>`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod control;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{cell::RefCell, rc::Rc};

pub use self::control::*;
use crate::{
    audio::AudioPlayer,
    control::{
        Accelerometer, AnalogueReader, Motor, NoiseDetector, Odometer, RgbLed, UltrasonicSensor,
    },
    link::{ConnectOptions, LinkError, SessionLink, SharedLink, Transport},
    params::RobotParams,
    robot::{Backend, BackendKind, FossBot, RobotError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Floor reading of a simulated sensor over the line.
pub const ON_LINE_READING: f64 = 0.1;

/// Tolerance when comparing a floor reading with [`ON_LINE_READING`].
const ON_LINE_TOLERANCE: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimBackend {
    params: Rc<RobotParams>,
    link: SharedLink,
    left_motor: SimMotor,
    right_motor: SimMotor,
    left_odometer: SimOdometer,
    right_odometer: SimOdometer,
    ultrasonic: SimUltrasonic,
    analogue: SimAnalogue,
    imu: SimImu,
    led: SimLed,
    noise: SimNoiseDetector,
    audio: AudioPlayer,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimBackend {
    /// Connect to the simulator through the given transport.
    pub fn connect(
        params: Rc<RobotParams>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, RobotError> {
        let sim = &params.simulation;
        let opts = ConnectOptions {
            host: sim.host.clone(),
            port: sim.port,
            timeout_ms: sim.connect_timeout_ms,
            retry_ms: sim.retry_ms,
            ..Default::default()
        };

        let link = SessionLink::open(transport, opts).map_err(RobotError::Connection)?;

        Ok(Self::with_link(params, link))
    }

    /// Build the backend over an already connected link.
    pub fn with_link(params: Rc<RobotParams>, link: SessionLink) -> Self {
        let link = Rc::new(RefCell::new(link));
        let sim = &params.simulation;
        let obj = |name: &str| SimObject::new(link.clone(), name);

        let steps = params.odometer.steps_per_revolution;

        Self {
            left_motor: SimMotor::new(obj(&sim.left_motor_name), params.motor_left_speed),
            right_motor: SimMotor::new(obj(&sim.right_motor_name), params.motor_right_speed),
            left_odometer: SimOdometer::new(obj(&sim.left_motor_name), steps),
            right_odometer: SimOdometer::new(obj(&sim.right_motor_name), steps),
            ultrasonic: SimUltrasonic(obj(&sim.ultrasonic_name)),
            analogue: SimAnalogue(obj(&sim.sensor_array_name)),
            imu: SimImu(obj(&sim.imu_name)),
            led: SimLed(obj(&sim.led_name)),
            noise: SimNoiseDetector(obj(&sim.noise_name)),
            audio: AudioPlayer::new(&params.audio),
            link: link.clone(),
            params: params.clone(),
        }
    }

    /// The session link shared by the capabilities.
    pub fn link(&self) -> &SharedLink {
        &self.link
    }

    /// True if the robot's body collides with another collidable object.
    pub fn check_collision(&mut self) -> Result<bool, RobotError> {
        let target = &self.params.simulation.body_name;
        let r = self
            .link
            .borrow_mut()
            .call_until_delivered(target, "check_collision", &[])
            .map_err(query_error)?;

        Ok(r.ints.first().map_or(false, |&c| c > 0))
    }

    /// True if the robot is on the floor.
    pub fn check_in_bounds(&mut self) -> Result<bool, RobotError> {
        let sim = &self.params.simulation;
        let floor_path = format!("/{}", sim.floor_name);
        let r = self
            .link
            .borrow_mut()
            .call_until_delivered(&sim.fossbot_name, "check_in_bounds", &[&floor_path])
            .map_err(query_error)?;

        Ok(r.ints.first().map_or(false, |&c| c > 0))
    }

    /// True if the robot still has its initial orientation.
    pub fn check_orientation(&mut self) -> Result<bool, RobotError> {
        let target = &self.params.simulation.fossbot_name;
        let r = self
            .link
            .borrow_mut()
            .call_until_delivered(target, "check_orientation", &[])
            .map_err(query_error)?;

        Ok(r.ints.first().map_or(false, |&c| c > 0))
    }

    /// Put the robot back on its wheels.
    pub fn reset_orientation(&mut self) -> Result<(), RobotError> {
        let target = &self.params.simulation.fossbot_name;
        self.link
            .borrow_mut()
            .call_until_delivered(target, "reset_orientation", &[])
            .map_err(query_error)?;

        info!("Orientation reset");
        Ok(())
    }

    fn is_floor_sensor(&self, id: u8) -> bool {
        self.params.floor_sensors.index_of(id).is_some()
    }
}

impl Backend for SimBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn left_motor(&mut self) -> &mut dyn Motor {
        &mut self.left_motor
    }

    fn right_motor(&mut self) -> &mut dyn Motor {
        &mut self.right_motor
    }

    fn left_odometer(&mut self) -> &mut dyn Odometer {
        &mut self.left_odometer
    }

    fn right_odometer(&mut self) -> &mut dyn Odometer {
        &mut self.right_odometer
    }

    fn ultrasonic(&mut self) -> &mut dyn UltrasonicSensor {
        &mut self.ultrasonic
    }

    fn imu(&mut self) -> &mut dyn Accelerometer {
        &mut self.imu
    }

    fn rgb_led(&mut self) -> &mut dyn RgbLed {
        &mut self.led
    }

    fn noise_detector(&mut self) -> &mut dyn NoiseDetector {
        &mut self.noise
    }

    fn floor_sensor(&mut self, id: u8) -> Result<f64, RobotError> {
        if !self.is_floor_sensor(id) {
            warn!("Floor sensor id {} is out of bounds, reading 0", id);
            return Ok(0.0);
        }
        Ok(self.analogue.get_reading(id)?)
    }

    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError> {
        if !self.is_floor_sensor(id) {
            warn!("Floor sensor id {} is out of bounds, not on line", id);
            return Ok(false);
        }
        let reading = self.analogue.get_reading(id)?;
        Ok((reading - ON_LINE_READING).abs() < ON_LINE_TOLERANCE)
    }

    fn light_reading(&mut self) -> Result<f64, RobotError> {
        let id = self.params.simulation.light_sensor_id;
        Ok(self.analogue.get_reading(id)?)
    }

    fn play_sound(&mut self, id: u32) -> Result<(), RobotError> {
        self.audio.play(id).map_err(RobotError::Audio)
    }

    fn exit(&mut self) -> Result<(), RobotError> {
        if self.link.borrow_mut().close() {
            info!("Simulated FossBot released");
        } else {
            debug!("Simulated FossBot already released");
        }
        Ok(())
    }
}

impl FossBot<SimBackend> {
    /// True if the robot collides with another collidable object.
    ///
    /// Blocks until the simulator answers.
    pub fn check_collision(&mut self) -> Result<bool, RobotError> {
        self.backend_mut().check_collision()
    }

    /// True if the robot is on the floor.
    ///
    /// Blocks until the simulator answers.
    pub fn check_in_bounds(&mut self) -> Result<bool, RobotError> {
        self.backend_mut().check_in_bounds()
    }

    /// True if the robot still has its initial orientation.
    ///
    /// Blocks until the simulator answers.
    pub fn check_orientation(&mut self) -> Result<bool, RobotError> {
        self.backend_mut().check_orientation()
    }

    /// Reset the robot's orientation, for instance after it flipped over.
    ///
    /// Blocks until the simulator answers.
    pub fn reset_orientation(&mut self) -> Result<(), RobotError> {
        self.backend_mut().reset_orientation()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The state queries only fail when the link is not connected.
fn query_error(e: LinkError) -> RobotError {
    RobotError::Control(e.into())
}
