//! Simulated capabilities, each one a thin wrapper issuing scripted calls on a scene object.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use crate::{
    control::{
        Accelerometer, AnalogueReader, Axis, Color, ControlError, Direction, Motor, MotorState,
        NoiseDetector, Odometer, RgbLed, UltrasonicSensor,
    },
    link::{ScriptResult, ScriptResultExt, SharedLink},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A scene object reached through the session link.
pub struct SimObject {
    link: SharedLink,
    name: String,
}

pub struct SimMotor {
    obj: SimObject,
    state: MotorState,
}

pub struct SimOdometer {
    obj: SimObject,
    steps_per_revolution: u32,
}

pub struct SimUltrasonic(pub SimObject);

pub struct SimAnalogue(pub SimObject);

pub struct SimImu(pub SimObject);

pub struct SimLed(pub SimObject);

pub struct SimNoiseDetector(pub SimObject);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimObject {
    pub fn new(link: SharedLink, name: &str) -> Self {
        Self {
            link,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(
        &self,
        function: &str,
        ints: &[i32],
        strings: &[&str],
    ) -> Result<ScriptResult, ControlError> {
        trace!("{}.{}({:?}, {:?})", self.name, function, ints, strings);
        Ok(self
            .link
            .borrow_mut()
            .call_args(&self.name, function, ints, strings)?)
    }

    fn call_float(&self, function: &str, ints: &[i32], strings: &[&str]) -> Result<f64, ControlError> {
        Ok(self
            .call(function, ints, strings)?
            .first_float(&self.name, function)?)
    }

    fn call_int(&self, function: &str) -> Result<i32, ControlError> {
        Ok(self.call(function, &[], &[])?.first_int(&self.name, function)?)
    }
}

impl SimMotor {
    pub fn new(obj: SimObject, speed: u8) -> Self {
        Self {
            obj,
            state: MotorState::stopped(speed),
        }
    }
}

impl Motor for SimMotor {
    fn set_speed(&mut self, speed: u8) -> Result<(), ControlError> {
        if speed > 100 {
            return Err(ControlError::InvalidArgument(format!(
                "motor speed must be between 0 and 100 percent, found {}",
                speed
            )));
        }
        self.obj.call("set_speed", &[speed as i32], &[])?;
        self.state.speed = speed;
        Ok(())
    }

    fn dir_control(&mut self, direction: Direction) -> Result<(), ControlError> {
        self.obj.call("dir_control", &[], &[direction.as_str()])?;
        self.state.direction = direction;
        Ok(())
    }

    fn start(&mut self, direction: Direction) -> Result<(), ControlError> {
        self.obj
            .call("move", &[self.state.speed as i32], &[direction.as_str()])?;
        self.state.direction = direction;
        self.state.enabled = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ControlError> {
        self.obj.call("stop", &[], &[])?;
        self.state.enabled = false;
        Ok(())
    }

    fn state(&self) -> MotorState {
        self.state
    }
}

impl SimOdometer {
    pub fn new(obj: SimObject, steps_per_revolution: u32) -> Self {
        Self {
            obj,
            steps_per_revolution,
        }
    }
}

impl Odometer for SimOdometer {
    fn reset(&mut self) -> Result<(), ControlError> {
        self.obj.call("reset", &[], &[])?;
        Ok(())
    }

    fn get_steps(&mut self) -> Result<i64, ControlError> {
        Ok(self.obj.call_int("get_steps")? as i64)
    }

    fn get_revolutions(&mut self) -> Result<f64, ControlError> {
        Ok(self.get_steps()? as f64 / self.steps_per_revolution as f64)
    }

    fn get_distance(&mut self) -> Result<f64, ControlError> {
        self.obj.call_float("get_distance", &[], &[])
    }
}

impl UltrasonicSensor for SimUltrasonic {
    fn get_distance(&mut self) -> Result<f64, ControlError> {
        self.0.call_float("get_distance", &[], &[])
    }
}

impl AnalogueReader for SimAnalogue {
    fn get_reading(&mut self, channel: u8) -> Result<f64, ControlError> {
        self.0.call_float("get_reading", &[channel as i32], &[])
    }
}

impl Accelerometer for SimImu {
    fn get_acceleration(&mut self, axis: Axis) -> Result<f64, ControlError> {
        self.0.call_float("get_acceleration", &[], &[axis.as_str()])
    }

    fn get_gyro(&mut self, axis: Axis) -> Result<f64, ControlError> {
        self.0.call_float("get_gyro", &[], &[axis.as_str()])
    }
}

impl RgbLed for SimLed {
    fn set_on(&mut self, color: Color) -> Result<(), ControlError> {
        self.0.call("set_color", &[], &[color.as_str()])?;
        Ok(())
    }
}

impl NoiseDetector for SimNoiseDetector {
    fn detect_noise(&mut self) -> Result<bool, ControlError> {
        Ok(self.0.call_int("detect_noise")? > 0)
    }
}
