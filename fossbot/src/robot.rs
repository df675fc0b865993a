//! # Robot
//!
//! The [`Robot`] trait is the command surface of a FossBot. Application code only ever holds a
//! `Box<dyn Robot>` (or `&mut dyn Robot`) and never needs to know which backend drives it.
//!
//! The trait is implemented once by [`FossBot`], which is generic over a [`Backend`] providing the
//! capabilities of the physical, simulated or dummy robot. The motion controller and the decision
//! rules are shared by every backend, only the floor, light, audio and release policies differ.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{fmt, rc::Rc, str::FromStr, thread, time::Duration};

use crate::{
    control::{
        Accelerometer, Axis, Color, ControlError, Direction, Motor, NoiseDetector, Odometer,
        RgbLed, UltrasonicSensor,
    },
    dummy::DummyBackend,
    link::{LinkError, ZmqTransport},
    motion::{self, MotionGuard},
    params::{ParamsError, RobotParams},
    real,
    sim::SimBackend,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Scale of the light and floor sensors as exposed to application code.
pub const SENSOR_SCALE: f64 = 1024.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Commands accepted by every FossBot.
pub trait Robot {
    /// The backend driving this robot.
    fn kind(&self) -> BackendKind;

    /// Parameters the robot was built with.
    fn params(&self) -> &RobotParams;

    /// Start moving in the given direction until stopped.
    fn just_move(&mut self, direction: Direction) -> Result<(), RobotError>;

    /// Move `dist` centimeters in the given direction.
    ///
    /// Moving zero centimeters does nothing. The call returns once both wheels have covered the
    /// distance and the motors have been stopped.
    fn move_distance(&mut self, dist: f64, direction: Direction) -> Result<(), RobotError>;

    /// Same as [`Robot::move_distance`], bounded by the given guard.
    fn move_distance_guarded(
        &mut self,
        dist: f64,
        direction: Direction,
        guard: &MotionGuard,
    ) -> Result<(), RobotError>;

    /// Start rotating in place until stopped, 0 is counterclockwise and 1 clockwise.
    fn just_rotate(&mut self, dir_id: i64) -> Result<(), RobotError>;

    /// Rotate 90 degrees in place, 0 is counterclockwise and 1 clockwise.
    fn rotate_90(&mut self, dir_id: i64) -> Result<(), RobotError>;

    /// Same as [`Robot::rotate_90`], bounded by the given guard.
    fn rotate_90_guarded(&mut self, dir_id: i64, guard: &MotionGuard) -> Result<(), RobotError>;

    /// Stop both motors and reset both odometers.
    fn stop(&mut self) -> Result<(), RobotError>;

    /// Set the speed of both motors.
    ///
    /// Units: percent (0-100)
    fn set_motor_speed(&mut self, left: u8, right: u8) -> Result<(), RobotError>;

    /// Point both motors forward without starting them.
    fn reset_dir(&mut self) -> Result<(), RobotError>;

    /// Distance to the closest obstacle.
    ///
    /// Units: centimeters
    fn get_distance(&mut self) -> Result<f64, RobotError>;

    /// True if an obstacle is at or closer than the configured `sensor_distance`.
    fn check_for_obstacle(&mut self) -> Result<bool, RobotError>;

    /// Reading of a floor sensor.
    fn get_floor_sensor(&mut self, id: u8) -> Result<f64, RobotError>;

    /// True if the floor sensor is over the line.
    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError>;

    fn get_acceleration(&mut self, axis: Axis) -> Result<f64, RobotError>;

    fn get_gyroscope(&mut self, axis: Axis) -> Result<f64, RobotError>;

    fn rgb_set_color(&mut self, color: Color) -> Result<(), RobotError>;

    /// Light level on a 0-1024 scale.
    fn get_light_sensor(&mut self) -> Result<f64, RobotError>;

    /// True if the light level is below the configured `light_sensor` threshold.
    fn check_for_dark(&mut self) -> Result<bool, RobotError>;

    fn get_noise_detection(&mut self) -> Result<bool, RobotError>;

    /// Play one of the bundled sounds. Unknown ids are ignored.
    fn play_sound(&mut self, id: u32) -> Result<(), RobotError>;

    /// Release the robot. Calling this more than once does nothing.
    fn exit(&mut self) -> Result<(), RobotError>;

    /// Block the calling thread.
    ///
    /// Units: seconds
    fn wait(&mut self, seconds: f64) -> Result<(), RobotError> {
        let duration = Duration::try_from_secs_f64(seconds).map_err(|_| {
            RobotError::InvalidArgument(format!("cannot wait for {} seconds", seconds))
        })?;
        thread::sleep(duration);
        Ok(())
    }

    fn move_forward(&mut self) -> Result<(), RobotError> {
        self.just_move(Direction::Forward)
    }

    fn move_reverse(&mut self) -> Result<(), RobotError> {
        self.just_move(Direction::Reverse)
    }

    fn move_forward_distance(&mut self, dist: f64) -> Result<(), RobotError> {
        self.move_distance(dist, Direction::Forward)
    }

    fn move_reverse_distance(&mut self, dist: f64) -> Result<(), RobotError> {
        self.move_distance(dist, Direction::Reverse)
    }

    /// Move forward by the configured `default_step`.
    fn move_forward_default(&mut self) -> Result<(), RobotError> {
        let step = self.params().default_step;
        self.move_distance(step, Direction::Forward)
    }

    /// Move backwards by the configured `default_step`.
    fn move_reverse_default(&mut self) -> Result<(), RobotError> {
        let step = self.params().default_step;
        self.move_distance(step, Direction::Reverse)
    }

    fn rotate_clockwise(&mut self) -> Result<(), RobotError> {
        self.just_rotate(1)
    }

    fn rotate_counterclockwise(&mut self) -> Result<(), RobotError> {
        self.just_rotate(0)
    }

    fn rotate_clockwise_90(&mut self) -> Result<(), RobotError> {
        self.rotate_90(1)
    }

    fn rotate_counterclockwise_90(&mut self) -> Result<(), RobotError> {
        self.rotate_90(0)
    }
}

/// Capabilities and policies a FossBot is built on.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn left_motor(&mut self) -> &mut dyn Motor;

    fn right_motor(&mut self) -> &mut dyn Motor;

    fn left_odometer(&mut self) -> &mut dyn Odometer;

    fn right_odometer(&mut self) -> &mut dyn Odometer;

    fn ultrasonic(&mut self) -> &mut dyn UltrasonicSensor;

    fn imu(&mut self) -> &mut dyn Accelerometer;

    fn rgb_led(&mut self) -> &mut dyn RgbLed;

    fn noise_detector(&mut self) -> &mut dyn NoiseDetector;

    /// Reading of a floor sensor, on the backend's own scale.
    fn floor_sensor(&mut self, id: u8) -> Result<f64, RobotError>;

    /// Whether the floor sensor is over the line.
    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError>;

    /// Raw light sensor reading in the range [0, 1].
    fn light_reading(&mut self) -> Result<f64, RobotError>;

    fn play_sound(&mut self, id: u32) -> Result<(), RobotError>;

    /// Release the backend's resources, must be idempotent.
    fn exit(&mut self) -> Result<(), RobotError>;

    /// Guard applied to bounded motions started without one.
    fn default_guard(&self) -> MotionGuard {
        MotionGuard::unbounded()
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A FossBot driven by the backend `B`.
pub struct FossBot<B: Backend> {
    backend: B,
    params: Rc<RobotParams>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The backends a FossBot can be driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The physical robot on a Raspberry Pi
    Real,

    /// A robot in the simulator, reached through the session link
    Simulated,

    /// A robot without I/O returning synthetic readings
    Dummy,
}

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not connect to the simulator: {0}")]
    Connection(LinkError),

    #[error("Capability error: {0}")]
    Control(#[from] ControlError),

    #[error("The motion did not complete before its timeout")]
    Timeout,

    #[error("The motion was cancelled")]
    Cancelled,

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Could not play sound: {0}")]
    Audio(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<B: Backend> FossBot<B> {
    /// Build a robot over the given backend, applying the default motor speeds.
    pub fn new(mut backend: B, params: Rc<RobotParams>) -> Result<Self, RobotError> {
        params.are_valid()?;

        backend.left_motor().set_speed(params.motor_left_speed)?;
        backend.right_motor().set_speed(params.motor_right_speed)?;

        info!("{} FossBot ready", backend.kind());

        Ok(Self { backend, params })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: Backend> Robot for FossBot<B> {
    fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    fn params(&self) -> &RobotParams {
        &self.params
    }

    fn just_move(&mut self, direction: Direction) -> Result<(), RobotError> {
        motion::just_move(&mut self.backend, direction)
    }

    fn move_distance(&mut self, dist: f64, direction: Direction) -> Result<(), RobotError> {
        let guard = self.backend.default_guard();
        motion::move_distance(&mut self.backend, dist, direction, &guard)
    }

    fn move_distance_guarded(
        &mut self,
        dist: f64,
        direction: Direction,
        guard: &MotionGuard,
    ) -> Result<(), RobotError> {
        motion::move_distance(&mut self.backend, dist, direction, guard)
    }

    fn just_rotate(&mut self, dir_id: i64) -> Result<(), RobotError> {
        motion::just_rotate(&mut self.backend, dir_id).map(|_| ())
    }

    fn rotate_90(&mut self, dir_id: i64) -> Result<(), RobotError> {
        let guard = self.backend.default_guard();
        motion::rotate_90(&mut self.backend, dir_id, self.params.rotate_90, &guard)
    }

    fn rotate_90_guarded(&mut self, dir_id: i64, guard: &MotionGuard) -> Result<(), RobotError> {
        motion::rotate_90(&mut self.backend, dir_id, self.params.rotate_90, guard)
    }

    fn stop(&mut self) -> Result<(), RobotError> {
        motion::stop(&mut self.backend)
    }

    fn set_motor_speed(&mut self, left: u8, right: u8) -> Result<(), RobotError> {
        for speed in [left, right].iter() {
            if *speed > 100 {
                return Err(RobotError::InvalidArgument(format!(
                    "motor speed must be between 0 and 100 percent, found {}",
                    speed
                )));
            }
        }

        self.backend.left_motor().set_speed(left)?;
        self.backend.right_motor().set_speed(right)?;
        Ok(())
    }

    fn reset_dir(&mut self) -> Result<(), RobotError> {
        self.backend.left_motor().dir_control(Direction::Forward)?;
        self.backend.right_motor().dir_control(Direction::Forward)?;
        Ok(())
    }

    fn get_distance(&mut self) -> Result<f64, RobotError> {
        Ok(self.backend.ultrasonic().get_distance()?)
    }

    fn check_for_obstacle(&mut self) -> Result<bool, RobotError> {
        let distance = self.get_distance()?;
        debug!("Obstacle distance {:.2} cm", distance);
        Ok(distance <= self.params.sensor_distance)
    }

    fn get_floor_sensor(&mut self, id: u8) -> Result<f64, RobotError> {
        self.backend.floor_sensor(id)
    }

    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError> {
        self.backend.check_on_line(id)
    }

    fn get_acceleration(&mut self, axis: Axis) -> Result<f64, RobotError> {
        Ok(self.backend.imu().get_acceleration(axis)?)
    }

    fn get_gyroscope(&mut self, axis: Axis) -> Result<f64, RobotError> {
        Ok(self.backend.imu().get_gyro(axis)?)
    }

    fn rgb_set_color(&mut self, color: Color) -> Result<(), RobotError> {
        Ok(self.backend.rgb_led().set_on(color)?)
    }

    fn get_light_sensor(&mut self) -> Result<f64, RobotError> {
        Ok(self.backend.light_reading()? * SENSOR_SCALE)
    }

    fn check_for_dark(&mut self) -> Result<bool, RobotError> {
        let raw = self.backend.light_reading()?;
        Ok(raw < self.params.light_sensor / SENSOR_SCALE)
    }

    fn get_noise_detection(&mut self) -> Result<bool, RobotError> {
        Ok(self.backend.noise_detector().detect_noise()?)
    }

    fn play_sound(&mut self, id: u32) -> Result<(), RobotError> {
        self.backend.play_sound(id)
    }

    fn exit(&mut self) -> Result<(), RobotError> {
        self.backend.exit()
    }
}

impl<B: Backend> Drop for FossBot<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.exit() {
            warn!("Could not release the {} FossBot: {}", self.backend.kind(), e);
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::Real => "real",
            BackendKind::Simulated => "simulated",
            BackendKind::Dummy => "dummy",
        };
        f.write_str(s)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "real" => Ok(BackendKind::Real),
            "sim" | "simulated" => Ok(BackendKind::Simulated),
            "dummy" => Ok(BackendKind::Dummy),
            _ => Err(format!(
                "unknown backend {:?}, expected one of real, sim, dummy",
                s
            )),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a FossBot driven by the given backend.
///
/// A simulated robot connects to the simulator before returning, failing with
/// [`RobotError::Connection`] if no session can be opened.
pub fn open(kind: BackendKind, params: RobotParams) -> Result<Box<dyn Robot>, RobotError> {
    params.are_valid()?;
    let params = Rc::new(params);

    info!("Opening {} FossBot", kind);

    let robot: Box<dyn Robot> = match kind {
        BackendKind::Real => Box::new(FossBot::new(real::open(params.clone())?, params)?),
        BackendKind::Simulated => Box::new(FossBot::new(
            SimBackend::connect(params.clone(), Box::new(ZmqTransport::new()))?,
            params,
        )?),
        BackendKind::Dummy => Box::new(FossBot::new(DummyBackend::new(params.clone()), params)?),
    };

    Ok(robot)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        motion::CancelToken,
        testing::{Event, RecordingBackend, Side},
    };

    fn robot(rate_cm: f64, rate_steps: i64) -> FossBot<RecordingBackend> {
        FossBot::new(
            RecordingBackend::new(rate_cm, rate_steps),
            Rc::new(RobotParams::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_default_speeds_applied() {
        let bot = robot(1.0, 1);
        let w = bot.backend().world();
        assert_eq!(w.left.state.speed, 65);
        assert_eq!(w.right.state.speed, 65);
    }

    #[test]
    fn test_move_zero_distance_is_noop() {
        let mut bot = robot(1.0, 1);
        bot.backend().clear_events();

        bot.move_distance(0.0, Direction::Forward).unwrap();
        assert!(bot.backend().world().events.is_empty());
    }

    #[test]
    fn test_move_invalid_distance() {
        let mut bot = robot(1.0, 1);
        bot.backend().clear_events();

        assert!(matches!(
            bot.move_distance(-3.0, Direction::Forward),
            Err(RobotError::InvalidArgument(_))
        ));
        assert!(bot.move_distance(f64::NAN, Direction::Reverse).is_err());
        assert!(bot.backend().world().events.is_empty());
    }

    #[test]
    fn test_move_distance_reaches_target_on_both_wheels() {
        for &(dist, left_rate, right_rate) in [(10.0, 1.0, 1.0), (7.5, 0.5, 2.0), (0.1, 3.0, 0.25)]
            .iter()
        {
            let mut bot = robot(1.0, 1);
            bot.backend_mut().set_rates(left_rate, right_rate);
            bot.backend().clear_events();

            bot.move_distance(dist, Direction::Reverse).unwrap();

            let w = bot.backend().world();
            assert!(w.max_distance(Side::Left) >= dist);
            assert!(w.max_distance(Side::Right) >= dist);
            assert_eq!(w.count(|e| matches!(e, Event::Stop(Side::Left))), 1);
            assert_eq!(w.count(|e| matches!(e, Event::Stop(Side::Right))), 1);
            assert_eq!(
                w.count(|e| matches!(e, Event::Start(_, Direction::Reverse))),
                2
            );
            assert!(!w.left.state.enabled && !w.right.state.enabled);
        }
    }

    #[test]
    fn test_rotate_90_directions_and_end_state() {
        for &(dir_id, left, right) in [
            (0, Direction::Reverse, Direction::Forward),
            (1, Direction::Forward, Direction::Reverse),
        ]
        .iter()
        {
            let mut bot = robot(1.0, 5);
            bot.backend().clear_events();

            bot.rotate_90(dir_id).unwrap();

            let w = bot.backend().world();
            assert_eq!(w.events[2], Event::Start(Side::Left, left));
            assert_eq!(w.events[3], Event::Start(Side::Right, right));
            assert!(w.max_steps(Side::Left) > 14 && w.max_steps(Side::Right) > 14);
            assert!(!w.left.state.enabled && !w.right.state.enabled);
            assert_eq!(w.left.steps, 0);
            assert_eq!(w.right.steps, 0);
            assert_eq!(w.left.distance, 0.0);
        }
    }

    #[test]
    fn test_rotate_90_invalid_id() {
        let mut bot = robot(1.0, 1);
        bot.backend().clear_events();

        for &id in [2, -1, 90].iter() {
            assert!(matches!(
                bot.rotate_90(id),
                Err(RobotError::InvalidArgument(_))
            ));
        }
        assert!(bot.backend().world().events.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut bot = robot(1.0, 1);
        bot.move_forward().unwrap();
        bot.stop().unwrap();
        bot.stop().unwrap();

        let w = bot.backend().world();
        assert!(!w.left.state.enabled && !w.right.state.enabled);
        assert_eq!(w.left.steps, 0);
    }

    #[test]
    fn test_guard_timeout_stops_motors() {
        // Wheels which never move
        let mut bot = robot(0.0, 0);
        bot.backend().clear_events();

        let guard = MotionGuard::with_timeout(Duration::from_millis(20));
        assert!(matches!(
            bot.move_distance_guarded(5.0, Direction::Forward, &guard),
            Err(RobotError::Timeout)
        ));
        assert!(matches!(
            bot.rotate_90_guarded(1, &guard),
            Err(RobotError::Timeout)
        ));

        let w = bot.backend().world();
        assert_eq!(w.count(|e| matches!(e, Event::Stop(Side::Left))), 2);
        assert!(!w.left.state.enabled && !w.right.state.enabled);
    }

    #[test]
    fn test_guard_cancel_and_complete() {
        let mut bot = robot(0.0, 0);

        let token = CancelToken::new();
        token.cancel();
        let guard = MotionGuard::unbounded().cancelled_by(token);
        assert!(matches!(
            bot.move_distance_guarded(5.0, Direction::Forward, &guard),
            Err(RobotError::Cancelled)
        ));

        let guard = MotionGuard::completing_after(Duration::from_millis(5));
        bot.move_distance_guarded(5.0, Direction::Forward, &guard)
            .unwrap();
        assert!(!bot.backend().world().left.state.enabled);
    }

    #[test]
    fn test_obstacle_threshold() {
        let mut bot = robot(1.0, 1);
        assert_eq!(bot.params().sensor_distance, 15.0);

        bot.backend_mut().set_obstacle_distance(15.0);
        assert!(bot.check_for_obstacle().unwrap());

        bot.backend_mut().set_obstacle_distance(16.0);
        assert!(!bot.check_for_obstacle().unwrap());
    }

    #[test]
    fn test_light_and_dark() {
        let mut params = RobotParams::default();
        params.light_sensor = 512.0;
        let mut bot = FossBot::new(RecordingBackend::new(1.0, 1), Rc::new(params)).unwrap();

        bot.backend_mut().set_light(0.4);
        assert!(bot.check_for_dark().unwrap());
        assert!((bot.get_light_sensor().unwrap() - 409.6).abs() < 1e-9);

        bot.backend_mut().set_light(0.5);
        assert!(!bot.check_for_dark().unwrap());
    }

    #[test]
    fn test_motor_speed_validation() {
        let mut bot = robot(1.0, 1);
        assert!(matches!(
            bot.set_motor_speed(50, 101),
            Err(RobotError::InvalidArgument(_))
        ));
        bot.set_motor_speed(30, 40).unwrap();

        let w = bot.backend().world();
        assert_eq!(w.left.state.speed, 30);
        assert_eq!(w.right.state.speed, 40);
    }

    #[test]
    fn test_default_step_moves() {
        let mut bot = robot(1.0, 1);
        bot.move_forward_default().unwrap();
        assert!(bot.backend().world().max_distance(Side::Left) >= 15.0);
    }

    #[test]
    fn test_wait_rejects_negative() {
        let mut bot = robot(1.0, 1);
        assert!(bot.wait(-1.0).is_err());
        bot.wait(0.0).unwrap();
    }

    #[test]
    fn test_wait_rejects_unrepresentable() {
        let mut bot = robot(1.0, 1);
        assert!(matches!(bot.wait(1e30), Err(RobotError::InvalidArgument(_))));
        assert!(matches!(bot.wait(f64::NAN), Err(RobotError::InvalidArgument(_))));
        assert!(matches!(
            bot.wait(f64::INFINITY),
            Err(RobotError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_exit_twice() {
        let mut bot = robot(1.0, 1);
        bot.exit().unwrap();
        bot.exit().unwrap();
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("sim".parse::<BackendKind>().unwrap(), BackendKind::Simulated);
        assert_eq!("Dummy".parse::<BackendKind>().unwrap(), BackendKind::Dummy);
        assert!("webots".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_open_dummy() {
        let mut bot = open(BackendKind::Dummy, RobotParams::default()).unwrap();
        assert_eq!(bot.kind(), BackendKind::Dummy);
        assert!(!bot.check_on_line(9).unwrap());
        bot.exit().unwrap();
    }

    #[test]
    fn test_open_rejects_invalid_params() {
        let mut params = RobotParams::default();
        params.motor_left_speed = 200;
        assert!(matches!(
            open(BackendKind::Dummy, params),
            Err(RobotError::InvalidParams(_))
        ));
    }
}
