//! # Actuator and sensor capabilities
//!
//! Each capability of the robot is a narrow trait implemented once per backend. The motion
//! controller only ever talks to these traits.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::link::LinkError;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A wheel motor.
pub trait Motor {
    /// Set the speed immediately.
    ///
    /// Units: percent (0-100)
    fn set_speed(&mut self, speed: u8) -> Result<(), ControlError>;

    /// Change the direction of the motor without starting it.
    fn dir_control(&mut self, direction: Direction) -> Result<(), ControlError>;

    /// Start the motor at its current speed in the given direction.
    fn start(&mut self, direction: Direction) -> Result<(), ControlError>;

    /// Stop the motor.
    fn stop(&mut self) -> Result<(), ControlError>;

    /// The last commanded state of the motor.
    fn state(&self) -> MotorState;
}

/// A wheel encoder.
pub trait Odometer {
    /// Reset the step count and travelled distance to zero.
    fn reset(&mut self) -> Result<(), ControlError>;

    /// Number of encoder steps since the last reset.
    fn get_steps(&mut self) -> Result<i64, ControlError>;

    /// Number of wheel revolutions since the last reset.
    fn get_revolutions(&mut self) -> Result<f64, ControlError>;

    /// Distance travelled since the last reset.
    ///
    /// Units: centimeters
    fn get_distance(&mut self) -> Result<f64, ControlError>;
}

/// Ultrasonic rangefinder.
pub trait UltrasonicSensor {
    /// Distance to the closest obstacle.
    ///
    /// Units: centimeters
    fn get_distance(&mut self) -> Result<f64, ControlError>;
}

/// Analogue to digital converter the floor and light sensors are read through.
pub trait AnalogueReader {
    /// Reading of the given channel, in the range [0, 1].
    fn get_reading(&mut self, channel: u8) -> Result<f64, ControlError>;
}

/// Accelerometer and gyroscope.
pub trait Accelerometer {
    fn get_acceleration(&mut self, axis: Axis) -> Result<f64, ControlError>;

    fn get_gyro(&mut self, axis: Axis) -> Result<f64, ControlError>;
}

/// RGB status LED.
pub trait RgbLed {
    /// Set the LED to the given color, [`Color::Closed`] turns it off.
    fn set_on(&mut self, color: Color) -> Result<(), ControlError>;
}

/// Microphone based noise detector.
pub trait NoiseDetector {
    fn detect_noise(&mut self) -> Result<bool, ControlError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Commanded state of a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorState {
    pub direction: Direction,
    pub enabled: bool,

    /// Units: percent (0-100)
    pub speed: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction a motor (or the robot) is driven in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Direction of an in-place rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Counterclockwise,
    Clockwise,
}

/// Axis of the accelerometer and gyroscope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Colors the RGB LED can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
    White,
    Violet,
    Cyan,
    Yellow,
    Closed,
}

/// Errors raised by a capability.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Simulator link error: {0}")]
    Link(#[from] LinkError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors raised by the physical peripherals.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Could not drive pin {pin}: {msg}")]
    Pin { pin: &'static str, msg: String },

    #[error("Bus transfer with the {device} failed: {msg}")]
    Bus { device: &'static str, msg: String },

    #[error("Could not acquire {0}")]
    Unavailable(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorState {
    /// A stopped motor facing forward at the given speed.
    pub fn stopped(speed: u8) -> Self {
        Self {
            direction: Direction::Forward,
            enabled: false,
            speed,
        }
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

impl Rotation {
    /// Parse the integer rotation id used by the command surface, 0 for counterclockwise and 1
    /// for clockwise.
    pub fn from_id(dir_id: i64) -> Option<Self> {
        match dir_id {
            0 => Some(Rotation::Counterclockwise),
            1 => Some(Rotation::Clockwise),
            _ => None,
        }
    }

    /// Directions of the (left, right) motors needed to rotate this way.
    pub fn wheel_directions(&self) -> (Direction, Direction) {
        match self {
            Rotation::Counterclockwise => (Direction::Reverse, Direction::Forward),
            Rotation::Clockwise => (Direction::Forward, Direction::Reverse),
        }
    }
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::White => "white",
            Color::Violet => "violet",
            Color::Cyan => "cyan",
            Color::Yellow => "yellow",
            Color::Closed => "closed",
        }
    }

    /// Which of the (red, green, blue) channels are lit for this color.
    pub fn channels(&self) -> [bool; 3] {
        match self {
            Color::Red => [true, false, false],
            Color::Green => [false, true, false],
            Color::Blue => [false, false, true],
            Color::White => [true, true, true],
            Color::Violet => [true, false, true],
            Color::Cyan => [false, true, true],
            Color::Yellow => [true, true, false],
            Color::Closed => [false, false, false],
        }
    }
}

impl FromStr for Direction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            _ => Err(ControlError::InvalidArgument(format!(
                "unknown direction {:?}",
                s
            ))),
        }
    }
}

impl FromStr for Axis {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(ControlError::InvalidArgument(format!("unknown axis {:?}", s))),
        }
    }
}

impl FromStr for Color {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let color = match s.to_ascii_lowercase().as_str() {
            "red" => Color::Red,
            "green" => Color::Green,
            "blue" => Color::Blue,
            "white" => Color::White,
            "violet" => Color::Violet,
            "cyan" => Color::Cyan,
            "yellow" => Color::Yellow,
            "closed" => Color::Closed,
            _ => {
                return Err(ControlError::InvalidArgument(format!(
                    "unknown color {:?}",
                    s
                )))
            }
        };
        Ok(color)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rotation_ids() {
        assert_eq!(Rotation::from_id(0), Some(Rotation::Counterclockwise));
        assert_eq!(Rotation::from_id(1), Some(Rotation::Clockwise));
        assert_eq!(Rotation::from_id(2), None);
        assert_eq!(Rotation::from_id(-1), None);

        assert_eq!(
            Rotation::Counterclockwise.wheel_directions(),
            (Direction::Reverse, Direction::Forward)
        );
        assert_eq!(
            Rotation::Clockwise.wheel_directions(),
            (Direction::Forward, Direction::Reverse)
        );
    }

    #[test]
    fn test_parsing() {
        assert_eq!("Forward".parse::<Direction>().unwrap(), Direction::Forward);
        assert_eq!("z".parse::<Axis>().unwrap(), Axis::Z);
        assert_eq!("closed".parse::<Color>().unwrap(), Color::Closed);
        assert!("purple".parse::<Color>().is_err());
        assert!("all".parse::<Axis>().is_err());
    }

    #[test]
    fn test_color_channels() {
        assert_eq!(Color::Closed.channels(), [false; 3]);
        assert_eq!(Color::Violet.channels(), [true, false, true]);
    }
}
