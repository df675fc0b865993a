// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::digital::v2::{InputPin, OutputPin};
use log::debug;
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

use super::pin_error;
use crate::control::{ControlError, UltrasonicSensor};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Speed of sound.
///
/// Units: centimeters/second
const SPEED_OF_SOUND_CM_S: f64 = 34_300.0;

/// Distance reported when no echo is received.
///
/// Units: centimeters
pub const MAX_RANGE_CM: f64 = 400.0;

/// Length of the trigger pulse.
const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Longest wait for each edge of the echo pulse.
const ECHO_TIMEOUT: Duration = Duration::from_millis(30);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// HC-SR04 ultrasonic rangefinder.
pub struct HcSr04<T, E> {
    trigger: T,
    echo: E,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T, E> HcSr04<T, E>
where
    T: OutputPin,
    E: InputPin,
    T::Error: Debug,
    E::Error: Debug,
{
    pub fn new(trigger: T, echo: E) -> Self {
        Self { trigger, echo }
    }

    /// Wait for the echo pin to reach the given level, returning the instant it did.
    fn wait_for(&self, high: bool) -> Result<Option<Instant>, ControlError> {
        let start = Instant::now();
        while self.echo.is_high().map_err(pin_error("ultrasonic echo"))? != high {
            if start.elapsed() > ECHO_TIMEOUT {
                return Ok(None);
            }
        }
        Ok(Some(Instant::now()))
    }
}

impl<T, E> UltrasonicSensor for HcSr04<T, E>
where
    T: OutputPin,
    E: InputPin,
    T::Error: Debug,
    E::Error: Debug,
{
    fn get_distance(&mut self) -> Result<f64, ControlError> {
        self.trigger
            .set_high()
            .map_err(pin_error("ultrasonic trigger"))?;
        let pulse_start = Instant::now();
        while pulse_start.elapsed() < TRIGGER_PULSE {}
        self.trigger
            .set_low()
            .map_err(pin_error("ultrasonic trigger"))?;

        let rise = match self.wait_for(true)? {
            Some(t) => t,
            None => {
                debug!("No ultrasonic echo");
                return Ok(MAX_RANGE_CM);
            }
        };
        let fall = match self.wait_for(false)? {
            Some(t) => t,
            None => return Ok(MAX_RANGE_CM),
        };

        let dist = fall.duration_since(rise).as_secs_f64() * SPEED_OF_SOUND_CM_S / 2.0;
        Ok(dist.min(MAX_RANGE_CM))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::real::fake::{FakeInput, FakeOutput};

    #[test]
    fn test_no_echo_reads_max_range() {
        let trigger = FakeOutput::default();
        let mut us = HcSr04::new(trigger.clone(), FakeInput::with_levels(&[false]));

        assert_eq!(us.get_distance().unwrap(), MAX_RANGE_CM);
        assert!(!trigger.is_set_high());
    }

    #[test]
    fn test_short_echo() {
        let echo = FakeInput::with_levels(&[false, false, true, true, false]);
        let mut us = HcSr04::new(FakeOutput::default(), echo);

        let d = us.get_distance().unwrap();
        assert!(d >= 0.0 && d < MAX_RANGE_CM);
    }
}
