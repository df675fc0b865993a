// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{digital::v2::OutputPin, PwmPin};
use log::trace;
use std::fmt::Debug;

use super::pin_error;
use crate::control::{ControlError, Direction, Motor, MotorState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A motor driven by one channel of an L298N H-bridge.
///
/// The enable pin carries the PWM setting the speed, the two input pins set the direction.
pub struct HalMotor<P, A, B> {
    name: &'static str,
    enable: P,
    in1: A,
    in2: B,
    state: MotorState,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P, A, B> HalMotor<P, A, B>
where
    P: PwmPin<Duty = f64>,
    A: OutputPin,
    B: OutputPin,
    A::Error: Debug,
    B::Error: Debug,
{
    /// Create a stopped motor pointing forward.
    pub fn new(name: &'static str, mut enable: P, in1: A, in2: B, speed: u8) -> Self {
        enable.disable();
        Self {
            name,
            enable,
            in1,
            in2,
            state: MotorState::stopped(speed.min(100)),
        }
    }

    fn duty(&self) -> f64 {
        self.enable.get_max_duty() * self.state.speed as f64 / 100.0
    }

    fn set_direction_pins(&mut self, direction: Direction) -> Result<(), ControlError> {
        let name = self.name;
        match direction {
            Direction::Forward => {
                self.in1.set_high().map_err(pin_error(name))?;
                self.in2.set_low().map_err(pin_error(name))?;
            }
            Direction::Reverse => {
                self.in1.set_low().map_err(pin_error(name))?;
                self.in2.set_high().map_err(pin_error(name))?;
            }
        }
        Ok(())
    }
}

impl<P, A, B> Motor for HalMotor<P, A, B>
where
    P: PwmPin<Duty = f64>,
    A: OutputPin,
    B: OutputPin,
    A::Error: Debug,
    B::Error: Debug,
{
    fn set_speed(&mut self, speed: u8) -> Result<(), ControlError> {
        if speed > 100 {
            return Err(ControlError::InvalidArgument(format!(
                "motor speed must be between 0 and 100 percent, found {}",
                speed
            )));
        }

        self.state.speed = speed;
        let duty = self.duty();
        self.enable.set_duty(duty);
        trace!("{} motor duty {:.2}", self.name, duty);

        Ok(())
    }

    fn dir_control(&mut self, direction: Direction) -> Result<(), ControlError> {
        self.set_direction_pins(direction)?;
        self.state.direction = direction;
        Ok(())
    }

    fn start(&mut self, direction: Direction) -> Result<(), ControlError> {
        self.dir_control(direction)?;

        let duty = self.duty();
        self.enable.set_duty(duty);
        self.enable.enable();
        self.state.enabled = true;

        Ok(())
    }

    fn stop(&mut self) -> Result<(), ControlError> {
        self.enable.disable();
        self.state.enabled = false;
        Ok(())
    }

    fn state(&self) -> MotorState {
        self.state
    }
}
