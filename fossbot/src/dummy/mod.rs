//! # Dummy backend
//!
//! A FossBot without any I/O. Actions are only logged and every reading is drawn at random, which
//! makes the backend useful to exercise application code away from the robot and the simulator.
//!
//! Step counts are uniform in [`STEP_RANGE`], every other reading is uniform in `[0, 1)` and noise
//! detection is a coin flip.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{cell::RefCell, ops::RangeInclusive, rc::Rc, time::Duration};

use crate::{
    control::{
        Accelerometer, Axis, Color, ControlError, Direction, Motor, MotorState, NoiseDetector,
        Odometer, RgbLed, UltrasonicSensor,
    },
    motion::MotionGuard,
    params::RobotParams,
    robot::{Backend, BackendKind, RobotError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Range of the synthetic odometer step counts.
pub const STEP_RANGE: RangeInclusive<i64> = -1000..=1000;

/// Floor readings below this value are over the line.
const ON_LINE_BELOW: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

type SharedRng = Rc<RefCell<SmallRng>>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct DummyBackend {
    params: Rc<RobotParams>,
    rng: SharedRng,
    left_motor: DummyMotor,
    right_motor: DummyMotor,
    left_odometer: DummyOdometer,
    right_odometer: DummyOdometer,
    sensors: DummySensors,
}

pub struct DummyMotor {
    name: &'static str,
    state: MotorState,
}

pub struct DummyOdometer {
    name: &'static str,
    rng: SharedRng,
}

/// Every other dummy capability.
pub struct DummySensors {
    rng: SharedRng,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DummyBackend {
    pub fn new(params: Rc<RobotParams>) -> Self {
        let rng = if params.dummy.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(params.dummy.seed)
        };
        let rng = Rc::new(RefCell::new(rng));

        info!("Dummy FossBot created");

        Self {
            left_motor: DummyMotor::new("left", params.motor_left_speed),
            right_motor: DummyMotor::new("right", params.motor_right_speed),
            left_odometer: DummyOdometer {
                name: "left",
                rng: rng.clone(),
            },
            right_odometer: DummyOdometer {
                name: "right",
                rng: rng.clone(),
            },
            sensors: DummySensors { rng: rng.clone() },
            rng,
            params,
        }
    }

    fn unit(&self) -> f64 {
        self.rng.borrow_mut().gen::<f64>()
    }
}

impl Backend for DummyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
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
        &mut self.sensors
    }

    fn imu(&mut self) -> &mut dyn Accelerometer {
        &mut self.sensors
    }

    fn rgb_led(&mut self) -> &mut dyn RgbLed {
        &mut self.sensors
    }

    fn noise_detector(&mut self) -> &mut dyn NoiseDetector {
        &mut self.sensors
    }

    fn floor_sensor(&mut self, id: u8) -> Result<f64, RobotError> {
        if self.params.floor_sensors.index_of(id).is_none() {
            warn!("No floor sensor with id {}, reading 0", id);
            return Ok(0.0);
        }
        let reading = self.unit();
        debug!("Floor sensor {} reading {:.3}", id, reading);
        Ok(reading)
    }

    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError> {
        if self.params.floor_sensors.index_of(id).is_none() {
            warn!("No floor sensor with id {}, not on line", id);
            return Ok(false);
        }
        Ok(self.unit() < ON_LINE_BELOW)
    }

    fn light_reading(&mut self) -> Result<f64, RobotError> {
        Ok(self.unit())
    }

    fn play_sound(&mut self, id: u32) -> Result<(), RobotError> {
        match crate::audio::sound_file(id) {
            Some(f) => info!("Dummy FossBot plays {}", f),
            None => debug!("No sound with id {}", id),
        }
        Ok(())
    }

    fn exit(&mut self) -> Result<(), RobotError> {
        debug!("Dummy FossBot released");
        Ok(())
    }

    fn default_guard(&self) -> MotionGuard {
        MotionGuard::completing_after(Duration::from_millis(self.params.dummy.motion_window_ms))
    }
}

impl DummyMotor {
    fn new(name: &'static str, speed: u8) -> Self {
        Self {
            name,
            state: MotorState::stopped(speed),
        }
    }
}

impl Motor for DummyMotor {
    fn set_speed(&mut self, speed: u8) -> Result<(), ControlError> {
        if speed > 100 {
            return Err(ControlError::InvalidArgument(format!(
                "motor speed must be between 0 and 100 percent, found {}",
                speed
            )));
        }
        self.state.speed = speed;
        debug!("Dummy {} motor speed {}%", self.name, speed);
        Ok(())
    }

    fn dir_control(&mut self, direction: Direction) -> Result<(), ControlError> {
        self.state.direction = direction;
        debug!("Dummy {} motor direction {}", self.name, direction);
        Ok(())
    }

    fn start(&mut self, direction: Direction) -> Result<(), ControlError> {
        self.state.direction = direction;
        self.state.enabled = true;
        debug!(
            "Dummy {} motor moving {} at {}%",
            self.name, direction, self.state.speed
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ControlError> {
        self.state.enabled = false;
        debug!("Dummy {} motor stopped", self.name);
        Ok(())
    }

    fn state(&self) -> MotorState {
        self.state
    }
}

impl Odometer for DummyOdometer {
    fn reset(&mut self) -> Result<(), ControlError> {
        debug!("Dummy {} odometer reset", self.name);
        Ok(())
    }

    fn get_steps(&mut self) -> Result<i64, ControlError> {
        Ok(self.rng.borrow_mut().gen_range(STEP_RANGE))
    }

    fn get_revolutions(&mut self) -> Result<f64, ControlError> {
        Ok(self.rng.borrow_mut().gen::<f64>())
    }

    fn get_distance(&mut self) -> Result<f64, ControlError> {
        Ok(self.rng.borrow_mut().gen::<f64>())
    }
}

impl UltrasonicSensor for DummySensors {
    fn get_distance(&mut self) -> Result<f64, ControlError> {
        Ok(self.rng.borrow_mut().gen::<f64>())
    }
}

impl Accelerometer for DummySensors {
    fn get_acceleration(&mut self, _axis: Axis) -> Result<f64, ControlError> {
        Ok(self.rng.borrow_mut().gen::<f64>())
    }

    fn get_gyro(&mut self, _axis: Axis) -> Result<f64, ControlError> {
        Ok(self.rng.borrow_mut().gen::<f64>())
    }
}

impl RgbLed for DummySensors {
    fn set_on(&mut self, color: Color) -> Result<(), ControlError> {
        debug!("Dummy LED {}", color);
        Ok(())
    }
}

impl NoiseDetector for DummySensors {
    fn detect_noise(&mut self) -> Result<bool, ControlError> {
        Ok(self.rng.borrow_mut().gen_bool(0.5))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::robot::{FossBot, Robot};
    use std::time::Instant;

    fn dummy() -> FossBot<DummyBackend> {
        let mut params = RobotParams::default();
        params.dummy.seed = 42;
        let params = Rc::new(params);
        FossBot::new(DummyBackend::new(params.clone()), params).unwrap()
    }

    #[test]
    fn test_readings_stay_in_range() {
        let mut bot = dummy();

        for _ in 0..1000 {
            let d = bot.get_distance().unwrap();
            assert!((0.0..1.0).contains(&d));

            let f = bot.get_floor_sensor(1).unwrap();
            assert!((0.0..1.0).contains(&f));
            bot.check_on_line(2).unwrap();

            let l = bot.get_light_sensor().unwrap();
            assert!((0.0..1024.0).contains(&l));
            bot.check_for_dark().unwrap();
            bot.check_for_obstacle().unwrap();

            for axis in [Axis::X, Axis::Y, Axis::Z].iter() {
                assert!((0.0..1.0).contains(&bot.get_acceleration(*axis).unwrap()));
                assert!((0.0..1.0).contains(&bot.get_gyroscope(*axis).unwrap()));
            }
            bot.get_noise_detection().unwrap();

            let b = bot.backend_mut();
            assert!(STEP_RANGE.contains(&b.left_odometer().get_steps().unwrap()));
            let r = b.right_odometer().get_revolutions().unwrap();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_invalid_floor_ids_default() {
        let mut bot = dummy();
        assert!(!bot.check_on_line(0).unwrap());
        assert!(!bot.check_on_line(4).unwrap());
        assert_eq!(bot.get_floor_sensor(200).unwrap(), 0.0);
    }

    #[test]
    fn test_actions_never_fail() {
        let mut bot = dummy();
        bot.move_forward().unwrap();
        bot.rotate_clockwise().unwrap();
        bot.stop().unwrap();
        bot.rgb_set_color(Color::Cyan).unwrap();
        bot.play_sound(6).unwrap();
        bot.play_sound(99).unwrap();
        bot.reset_dir().unwrap();
        assert!(!bot.backend_mut().left_motor().state().enabled);
    }

    #[test]
    fn test_bounded_motions_complete() {
        let mut bot = dummy();

        let start = Instant::now();
        bot.move_forward_distance(1000.0).unwrap();
        bot.rotate_counterclockwise_90().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));

        assert!(!bot.backend_mut().right_motor().state().enabled);
    }

    #[test]
    fn test_seeded_readings_repeat() {
        let mut a = dummy();
        let mut b = dummy();
        for _ in 0..10 {
            assert_eq!(a.get_distance().unwrap(), b.get_distance().unwrap());
        }
    }

    #[test]
    fn test_exit_twice() {
        let mut bot = dummy();
        bot.exit().unwrap();
        bot.exit().unwrap();
    }
}
