//! # Robot parameters
//!
//! Calibration and wiring parameters for a FossBot. The parameters are loaded once from a TOML
//! file before the robot is built and are never modified afterwards.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters shared by every backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotParams {
    // ---- CALIBRATION ----
    /// Distance at or below which an obstacle is reported.
    ///
    /// Units: centimeters
    pub sensor_distance: f64,

    /// Default speed of the left motor.
    ///
    /// Units: percent (0-100)
    pub motor_left_speed: u8,

    /// Default speed of the right motor.
    ///
    /// Units: percent (0-100)
    pub motor_right_speed: u8,

    /// Distance moved by the `*_default` movement commands.
    ///
    /// Units: centimeters
    pub default_step: f64,

    /// Light level below which it is considered dark.
    ///
    /// Units: 0-1024 light sensor scale
    pub light_sensor: f64,

    /// Number of odometer steps both wheels must exceed for a 90 degree rotation.
    pub rotate_90: i64,

    /// Identifiers of the three floor (line) sensors.
    #[serde(default)]
    pub floor_sensors: FloorSensorIds,

    /// On-line calibration of the physical floor sensors.
    #[serde(default)]
    pub line_thresholds: LineThresholds,

    #[serde(default)]
    pub odometer: OdometerParams,

    #[serde(default)]
    pub simulation: SimParams,

    #[serde(default)]
    pub hardware: HardwareParams,

    #[serde(default)]
    pub audio: AudioParams,

    #[serde(default)]
    pub dummy: DummyParams,
}

/// Identifiers of the floor sensors, as passed to `get_floor_sensor` and `check_on_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FloorSensorIds {
    pub middle: u8,
    pub right: u8,
    pub left: u8,
}

/// Reading (0-1024 scale) at or above which a physical floor sensor is over the line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LineThresholds {
    pub middle: f64,
    pub right: f64,
    pub left: f64,
}

/// Wheel odometry geometry.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OdometerParams {
    /// Encoder steps per full wheel revolution
    pub steps_per_revolution: u32,

    /// Units: centimeters
    pub wheel_diameter_cm: f64,
}

/// Parameters of the simulated backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Host of the simulator's remote API server
    pub host: String,

    /// Port of the simulator's remote API server
    pub port: u16,

    /// Handshake timeout
    ///
    /// Units: milliseconds
    pub connect_timeout_ms: i32,

    /// Interval between connection retries
    ///
    /// Units: milliseconds
    pub retry_ms: i32,

    pub left_motor_name: String,
    pub right_motor_name: String,
    pub ultrasonic_name: String,
    pub sensor_array_name: String,
    pub imu_name: String,
    pub led_name: String,
    pub noise_name: String,

    /// Name of the robot body, used for collision checks
    pub body_name: String,

    /// Name of the robot model, used for bounds and orientation checks
    pub fossbot_name: String,

    /// Name of the floor the robot is driving on
    pub floor_name: String,

    /// Analogue channel of the simulated light sensor
    pub light_sensor_id: u8,
}

/// Wiring of the physical robot (BCM pin numbers).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareParams {
    pub left_motor: MotorPins,
    pub right_motor: MotorPins,

    /// Encoder input of the left wheel
    pub left_odometer_pin: u8,

    /// Encoder input of the right wheel
    pub right_odometer_pin: u8,

    pub ultrasonic_trigger_pin: u8,
    pub ultrasonic_echo_pin: u8,

    /// Red, green and blue LED pins
    pub rgb_pins: [u8; 3],

    pub noise_pin: u8,

    /// MCP3008 channel of the light sensor
    pub light_channel: u8,

    /// MCP3008 channels of the middle, right and left floor sensors
    pub floor_channels: [u8; 3],

    /// I2C address of the MPU6050
    pub imu_address: u8,

    /// Frequency of the software PWM driving the motors
    ///
    /// Units: hertz
    pub pwm_frequency_hz: f64,
}

/// Pins driving an L298N motor channel.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MotorPins {
    pub enable: u8,
    pub in1: u8,
    pub in2: u8,
}

/// Sound playback configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    /// Executable used to play sound files
    pub player: String,

    /// Directory containing the sound files
    pub sound_dir: String,
}

/// Parameters of the dummy backend.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DummyParams {
    /// Seed of the random readings, 0 seeds from entropy
    pub seed: u64,

    /// Wall-clock window after which a bounded motion is considered complete.
    ///
    /// Units: milliseconds
    pub motion_window_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Motor speed must be between 0 and 100 percent, found {0}")]
    InvalidSpeed(u8),

    #[error("Floor sensor ids must be unique, found {0:?}")]
    NonUniqueFloorSensorIds(FloorSensorIds),

    #[error("Parameter {0} must be a finite, non-negative number")]
    Negative(&'static str),

    #[error("Odometer must have at least one step per revolution")]
    NoOdometerSteps,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotParams {
    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        for speed in [self.motor_left_speed, self.motor_right_speed].iter() {
            if *speed > 100 {
                return Err(ParamsError::InvalidSpeed(*speed));
            }
        }

        let ids = self.floor_sensors.as_array();
        if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
            return Err(ParamsError::NonUniqueFloorSensorIds(self.floor_sensors));
        }

        let non_negative = [
            ("sensor_distance", self.sensor_distance),
            ("default_step", self.default_step),
            ("light_sensor", self.light_sensor),
            ("rotate_90", self.rotate_90 as f64),
            ("odometer.wheel_diameter_cm", self.odometer.wheel_diameter_cm),
        ];
        for (name, value) in non_negative.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(ParamsError::Negative(name));
            }
        }

        if self.odometer.steps_per_revolution == 0 {
            return Err(ParamsError::NoOdometerSteps);
        }

        Ok(())
    }
}

impl Default for RobotParams {
    fn default() -> Self {
        Self {
            sensor_distance: 15.0,
            motor_left_speed: 65,
            motor_right_speed: 65,
            default_step: 15.0,
            light_sensor: 700.0,
            rotate_90: 14,
            floor_sensors: FloorSensorIds::default(),
            line_thresholds: LineThresholds::default(),
            odometer: OdometerParams::default(),
            simulation: SimParams::default(),
            hardware: HardwareParams::default(),
            audio: AudioParams::default(),
            dummy: DummyParams::default(),
        }
    }
}

impl FloorSensorIds {
    /// The ids in `[middle, right, left]` order.
    pub fn as_array(&self) -> [u8; 3] {
        [self.middle, self.right, self.left]
    }

    /// Position of the id in `[middle, right, left]` order, or `None` if it is not configured.
    pub fn index_of(&self, id: u8) -> Option<usize> {
        self.as_array().iter().position(|&i| i == id)
    }
}

impl Default for FloorSensorIds {
    fn default() -> Self {
        Self {
            middle: 1,
            right: 2,
            left: 3,
        }
    }
}

impl LineThresholds {
    /// The thresholds in `[middle, right, left]` order.
    pub fn as_array(&self) -> [f64; 3] {
        [self.middle, self.right, self.left]
    }
}

impl Default for LineThresholds {
    fn default() -> Self {
        Self {
            middle: 500.0,
            right: 500.0,
            left: 500.0,
        }
    }
}

impl OdometerParams {
    /// Distance covered by one encoder step.
    ///
    /// Units: centimeters
    pub fn step_distance_cm(&self) -> f64 {
        std::f64::consts::PI * self.wheel_diameter_cm / self.steps_per_revolution as f64
    }
}

impl Default for OdometerParams {
    fn default() -> Self {
        Self {
            steps_per_revolution: 20,
            wheel_diameter_cm: 6.65,
        }
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 19999,
            connect_timeout_ms: 5000,
            retry_ms: 5,
            left_motor_name: "left_motor".into(),
            right_motor_name: "right_motor".into(),
            ultrasonic_name: "ultrasonic_sensor".into(),
            sensor_array_name: "floor_sensors".into(),
            imu_name: "accelerometer".into(),
            led_name: "led_rgb".into(),
            noise_name: "noise_detector".into(),
            body_name: "fossbot_body".into(),
            fossbot_name: "fossbot".into(),
            floor_name: "Floor".into(),
            light_sensor_id: 0,
        }
    }
}

impl Default for HardwareParams {
    fn default() -> Self {
        Self {
            left_motor: MotorPins {
                enable: 25,
                in1: 23,
                in2: 24,
            },
            right_motor: MotorPins {
                enable: 17,
                in1: 27,
                in2: 22,
            },
            left_odometer_pin: 5,
            right_odometer_pin: 6,
            ultrasonic_trigger_pin: 21,
            ultrasonic_echo_pin: 20,
            rgb_pins: [16, 19, 26],
            noise_pin: 4,
            light_channel: 0,
            floor_channels: [1, 2, 3],
            imu_address: 0x68,
            pwm_frequency_hz: 100.0,
        }
    }
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            player: "mpg123".into(),
            sound_dir: "soundfx".into(),
        }
    }
}

impl Default for DummyParams {
    fn default() -> Self {
        Self {
            seed: 0,
            motion_window_ms: 100,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = r#"
        sensor_distance = 15.0
        motor_left_speed = 65
        motor_right_speed = 60
        default_step = 15.0
        light_sensor = 512.0
        rotate_90 = 14
    "#;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let p: RobotParams = util::params::from_str(MINIMAL).unwrap();

        assert_eq!(p.motor_right_speed, 60);
        assert_eq!(p.floor_sensors, FloorSensorIds::default());
        assert_eq!(p.simulation.port, 19999);
        assert_eq!(p.simulation.host, "127.0.0.1");
        assert_eq!(p.audio.player, "mpg123");
        assert!(p.are_valid().is_ok());
    }

    #[test]
    fn test_partial_section_override() {
        let src = format!("{}\n[simulation]\nfossbot_name = \"bot\"\n", MINIMAL);
        let p: RobotParams = util::params::from_str(&src).unwrap();

        assert_eq!(p.simulation.fossbot_name, "bot");
        assert_eq!(p.simulation.left_motor_name, "left_motor");
    }

    #[test]
    fn test_validation() {
        let mut p = RobotParams::default();
        p.motor_left_speed = 120;
        assert!(matches!(p.are_valid(), Err(ParamsError::InvalidSpeed(120))));

        let mut p = RobotParams::default();
        p.floor_sensors.left = p.floor_sensors.middle;
        assert!(matches!(
            p.are_valid(),
            Err(ParamsError::NonUniqueFloorSensorIds(_))
        ));

        let mut p = RobotParams::default();
        p.sensor_distance = -1.0;
        assert!(matches!(
            p.are_valid(),
            Err(ParamsError::Negative("sensor_distance"))
        ));

        let mut p = RobotParams::default();
        p.light_sensor = f64::NAN;
        assert!(matches!(
            p.are_valid(),
            Err(ParamsError::Negative("light_sensor"))
        ));

        let mut p = RobotParams::default();
        p.odometer.wheel_diameter_cm = f64::INFINITY;
        assert!(matches!(
            p.are_valid(),
            Err(ParamsError::Negative("odometer.wheel_diameter_cm"))
        ));
    }

    #[test]
    fn test_nan_in_file_is_rejected() {
        let text = MINIMAL.replace("sensor_distance = 15.0", "sensor_distance = nan");
        let p: RobotParams = util::params::from_str(&text).unwrap();
        assert!(p.sensor_distance.is_nan());
        assert!(p.are_valid().is_err());
    }

    #[test]
    fn test_shipped_params_file() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("params")
            .join("fossbot.toml");
        let p: RobotParams = util::params::load_path(path).unwrap();

        assert!(p.are_valid().is_ok());
        assert_eq!(p.hardware.left_motor.enable, 25);
        assert_eq!(p.hardware.imu_address, 0x68);
        assert_eq!(p.line_thresholds.as_array(), [500.0; 3]);
    }

    #[test]
    fn test_step_distance() {
        let o = OdometerParams {
            steps_per_revolution: 10,
            wheel_diameter_cm: 10.0,
        };
        assert!((o.step_distance_cm() - std::f64::consts::PI).abs() < 1e-12);
    }
}
