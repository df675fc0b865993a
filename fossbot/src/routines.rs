//! # Routines
//!
//! Ready made behaviours written only against the [`Robot`] trait, so that they run unmodified on
//! every backend.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use std::{fmt, str::FromStr};

use crate::{
    control::{Axis, Color},
    motion::CancelToken,
    robot::{Robot, RobotError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Speed of both motors in the second leg of the self test.
///
/// Units: percent
const SELF_TEST_SPEED: u8 = 50;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The routines the executable can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    /// Drive forward for a while, then stop.
    Drive,

    /// Exercise every operation of the robot once.
    SelfTest,

    /// Follow a dark line until interrupted.
    FollowLine,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Readings gathered by [`self_test`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestReport {
    pub light: f64,
    pub dark: bool,
    pub distance: f64,
    pub obstacle: bool,
    pub gyro_x: f64,
    pub accel_x: f64,

    /// Reading and on-line state of the middle, right and left floor sensors
    pub floor: [(f64, bool); 3],
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Drive forward for `seconds`, then stop.
pub fn drive(robot: &mut dyn Robot, seconds: f64) -> Result<(), RobotError> {
    robot.move_forward()?;
    let waited = robot.wait(seconds);
    robot.stop()?;
    waited
}

/// Follow a line using the three floor sensors.
///
/// Drives forward while the middle sensor sees the line and turns towards the side sensor that
/// does otherwise. Runs until the token, if any, is cancelled.
pub fn follow_line(robot: &mut dyn Robot, cancel: Option<&CancelToken>) -> Result<(), RobotError> {
    let ids = robot.params().floor_sensors;
    info!("Following the line");

    while !cancel.map_or(false, |c| c.is_cancelled()) {
        if robot.check_on_line(ids.middle)? {
            robot.move_forward()?;
        } else if robot.check_on_line(ids.right)? {
            robot.rotate_counterclockwise()?;
        } else if robot.check_on_line(ids.left)? {
            robot.rotate_clockwise()?;
        }
    }

    info!("Line following cancelled");
    robot.stop()
}

/// Walk through the robot's operations, logging every reading.
///
/// `pause_s` is the time waited between the steps of the test.
pub fn self_test(robot: &mut dyn Robot, pause_s: f64) -> Result<SelfTestReport, RobotError> {
    let params = robot.params().clone();

    info!("Self test: moving {} cm", params.default_step);
    robot.move_forward_default()?;
    robot.wait(pause_s)?;

    info!("Self test: moving at {}%", SELF_TEST_SPEED);
    robot.set_motor_speed(SELF_TEST_SPEED, SELF_TEST_SPEED)?;
    robot.move_forward_default()?;
    robot.wait(pause_s)?;
    robot.set_motor_speed(params.motor_left_speed, params.motor_right_speed)?;

    info!("Self test: rotating");
    robot.rotate_clockwise_90()?;
    robot.rotate_counterclockwise_90()?;
    robot.wait(pause_s)?;

    let ids = params.floor_sensors.as_array();
    let mut floor = [(0.0, false); 3];
    for (slot, id) in floor.iter_mut().zip(ids.iter()) {
        *slot = (robot.get_floor_sensor(*id)?, robot.check_on_line(*id)?);
    }

    let report = SelfTestReport {
        light: robot.get_light_sensor()?,
        dark: robot.check_for_dark()?,
        distance: robot.get_distance()?,
        obstacle: robot.check_for_obstacle()?,
        gyro_x: robot.get_gyroscope(Axis::X)?,
        accel_x: robot.get_acceleration(Axis::X)?,
        floor,
    };

    info!("Light sensor: {:.1}, dark: {}", report.light, report.dark);
    info!(
        "Ultrasonic distance: {:.1} cm, obstacle: {}",
        report.distance, report.obstacle
    );
    info!("Gyroscope x: {:.3}", report.gyro_x);
    info!("Acceleration x: {:.3}", report.accel_x);
    for (name, (reading, on_line)) in ["Middle", "Right", "Left"].iter().zip(report.floor.iter()) {
        info!("{} floor sensor: {:.3}, on line: {}", name, reading, on_line);
    }

    info!("Self test: LED");
    robot.rgb_set_color(Color::Red)?;
    robot.wait(2.0 * pause_s)?;
    robot.rgb_set_color(Color::Closed)?;

    info!("Self test complete");
    Ok(report)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for Routine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "drive" => Ok(Routine::Drive),
            "self-test" => Ok(Routine::SelfTest),
            "follow-line" => Ok(Routine::FollowLine),
            _ => Err(format!(
                "unknown routine \"{}\", expected drive, self-test or follow-line",
                s
            )),
        }
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Routine::Drive => "drive",
            Routine::SelfTest => "self-test",
            Routine::FollowLine => "follow-line",
        };
        write!(f, "{}", s)
    }
}
