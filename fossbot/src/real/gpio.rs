// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::digital::v2::{InputPin, OutputPin};
use std::fmt::Debug;

use super::pin_error;
use crate::control::{Color, ControlError, NoiseDetector, RgbLed};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Common cathode RGB LED on three GPIO pins.
pub struct GpioRgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
}

/// Sound sensor module with a digital output.
pub struct GpioNoiseDetector<P> {
    pin: P,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R, G, B> GpioRgbLed<R, G, B> {
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self { red, green, blue }
    }
}

impl<R, G, B> RgbLed for GpioRgbLed<R, G, B>
where
    R: OutputPin,
    G: OutputPin,
    B: OutputPin,
    R::Error: Debug,
    G::Error: Debug,
    B::Error: Debug,
{
    fn set_on(&mut self, color: Color) -> Result<(), ControlError> {
        let [r, g, b] = color.channels();
        set_level(&mut self.red, r).map_err(pin_error("red LED"))?;
        set_level(&mut self.green, g).map_err(pin_error("green LED"))?;
        set_level(&mut self.blue, b).map_err(pin_error("blue LED"))?;
        Ok(())
    }
}

impl<P> GpioNoiseDetector<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P> NoiseDetector for GpioNoiseDetector<P>
where
    P: InputPin,
    P::Error: Debug,
{
    fn detect_noise(&mut self) -> Result<bool, ControlError> {
        self.pin.is_high().map_err(pin_error("noise detector"))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn set_level<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), P::Error> {
    match high {
        true => pin.set_high(),
        false => pin.set_low(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::real::fake::{FakeInput, FakeOutput};

    #[test]
    fn test_led_colors() {
        let (r, g, b) = (
            FakeOutput::default(),
            FakeOutput::default(),
            FakeOutput::default(),
        );
        let mut led = GpioRgbLed::new(r.clone(), g.clone(), b.clone());

        led.set_on(Color::Yellow).unwrap();
        assert!(r.is_set_high() && g.is_set_high() && !b.is_set_high());

        led.set_on(Color::Closed).unwrap();
        assert!(!r.is_set_high() && !g.is_set_high() && !b.is_set_high());
    }

    #[test]
    fn test_noise() {
        let mut n = GpioNoiseDetector::new(FakeInput::with_levels(&[true, false]));
        assert!(n.detect_noise().unwrap());
        assert!(!n.detect_noise().unwrap());
    }
}
