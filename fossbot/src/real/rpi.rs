//! Raspberry Pi wiring of the real FossBot peripherals.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use rppal::{
    gpio::{Gpio, OutputPin, Trigger},
    i2c::I2c,
    spi::{Bus, Mode, SlaveSelect, Spi},
};
use std::fmt::Display;

use super::{
    gpio::{GpioNoiseDetector, GpioRgbLed},
    mcp3008::Mcp3008,
    motor::HalMotor,
    mpu6050::Mpu6050,
    odometer::{StepCounter, StepOdometer},
    ultrasonic::HcSr04,
    RealParts,
};
use crate::{
    control::{ControlError, HardwareError},
    params::{MotorPins, RobotParams},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Clock speed of the MCP3008 SPI bus.
///
/// Units: hertz
const ADC_CLOCK_HZ: u32 = 1_350_000;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Claim the Pi's peripherals and build the robot's parts from them.
pub(super) fn open(params: &RobotParams) -> Result<RealParts, ControlError> {
    let hw = &params.hardware;
    let gpio = Gpio::new().map_err(unavailable("GPIO"))?;

    let output = |pin: u8| -> Result<OutputPin, ControlError> {
        Ok(gpio
            .get(pin)
            .map_err(unavailable(&format!("GPIO pin {}", pin)))?
            .into_output())
    };

    let motor = |name: &'static str, pins: &MotorPins, speed: u8| {
        let mut enable = output(pins.enable)?;
        enable
            .set_pwm_frequency(hw.pwm_frequency_hz, 0.0)
            .map_err(unavailable(name))?;
        Ok::<_, ControlError>(HalMotor::new(
            name,
            enable,
            output(pins.in1)?,
            output(pins.in2)?,
            speed,
        ))
    };

    let odometer = |pin: u8| -> Result<StepOdometer, ControlError> {
        let counter = StepCounter::new();
        let mut input = gpio
            .get(pin)
            .map_err(unavailable(&format!("GPIO pin {}", pin)))?
            .into_input();
        let c = counter.clone();
        input
            .set_async_interrupt(Trigger::RisingEdge, move |_| c.step())
            .map_err(unavailable(&format!("odometer interrupt on pin {}", pin)))?;
        Ok(StepOdometer::new(counter, params.odometer).with_source(input))
    };

    let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, ADC_CLOCK_HZ, Mode::Mode0)
        .map_err(unavailable("SPI0"))?;
    let i2c = I2c::new().map_err(unavailable("I2C"))?;

    let parts = RealParts {
        left_motor: Box::new(motor("left motor", &hw.left_motor, params.motor_left_speed)?),
        right_motor: Box::new(motor(
            "right motor",
            &hw.right_motor,
            params.motor_right_speed,
        )?),
        left_odometer: Box::new(odometer(hw.left_odometer_pin)?),
        right_odometer: Box::new(odometer(hw.right_odometer_pin)?),
        ultrasonic: Box::new(HcSr04::new(
            output(hw.ultrasonic_trigger_pin)?,
            gpio.get(hw.ultrasonic_echo_pin)
                .map_err(unavailable("ultrasonic echo"))?
                .into_input(),
        )),
        adc: Box::new(Mcp3008::new(spi)),
        imu: Box::new(Mpu6050::new(i2c, hw.imu_address)?),
        led: Box::new(GpioRgbLed::new(
            output(hw.rgb_pins[0])?,
            output(hw.rgb_pins[1])?,
            output(hw.rgb_pins[2])?,
        )),
        noise: Box::new(GpioNoiseDetector::new(
            gpio.get(hw.noise_pin)
                .map_err(unavailable("noise detector"))?
                .into_input(),
        )),
    };

    info!("Raspberry Pi peripherals initialised");

    Ok(parts)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn unavailable<E: Display>(what: &str) -> impl Fn(E) -> ControlError + '_ {
    move |e| HardwareError::Unavailable(format!("{}: {}", what, e)).into()
}
