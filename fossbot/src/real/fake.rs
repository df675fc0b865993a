//! Fake peripherals standing in for the Raspberry Pi ones.

use embedded_hal::{
    blocking::{
        i2c::{Write, WriteRead},
        spi::Transfer,
    },
    digital::v2::{InputPin, OutputPin},
    PwmPin,
};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    convert::Infallible,
    rc::Rc,
};

#[derive(Debug, Clone, Default)]
pub struct FakeOutput(Rc<Cell<bool>>);

#[derive(Debug, Clone, Default)]
pub struct FakePwm {
    enabled: Rc<Cell<bool>>,
    duty: Rc<Cell<f64>>,
}

/// Input pin replaying a sequence of levels, then holding the last one.
#[derive(Debug, Clone, Default)]
pub struct FakeInput(Rc<RefCell<VecDeque<bool>>>);

/// SPI bus answering every transfer with the same bytes.
#[derive(Debug, Clone, Default)]
pub struct FakeSpi {
    pub reply: Rc<RefCell<Vec<u8>>>,
    pub sent: Rc<RefCell<Vec<Vec<u8>>>>,
}

/// I2C bus answering reads from a register map.
#[derive(Debug, Clone, Default)]
pub struct FakeI2c {
    pub registers: Rc<RefCell<Vec<u8>>>,
    pub writes: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
}

impl FakeOutput {
    pub fn is_set_high(&self) -> bool {
        self.0.get()
    }
}

impl OutputPin for FakeOutput {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

impl FakePwm {
    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn duty(&self) -> f64 {
        self.duty.get()
    }
}

impl PwmPin for FakePwm {
    type Duty = f64;

    fn disable(&mut self) {
        self.enabled.set(false);
    }

    fn enable(&mut self) {
        self.enabled.set(true);
    }

    fn get_duty(&self) -> f64 {
        self.duty.get()
    }

    fn get_max_duty(&self) -> f64 {
        1.0
    }

    fn set_duty(&mut self, duty: f64) {
        self.duty.set(duty);
    }
}

impl FakeInput {
    pub fn with_levels(levels: &[bool]) -> Self {
        Self(Rc::new(RefCell::new(levels.iter().copied().collect())))
    }

    fn next(&self) -> bool {
        let mut levels = self.0.borrow_mut();
        if levels.len() > 1 {
            levels.pop_front().unwrap_or(false)
        } else {
            levels.front().copied().unwrap_or(false)
        }
    }
}

impl InputPin for FakeInput {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.next())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.next())
    }
}

impl Transfer<u8> for FakeSpi {
    type Error = Infallible;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        self.sent.borrow_mut().push(words.to_vec());
        let reply = self.reply.borrow();
        for (w, r) in words.iter_mut().zip(reply.iter()) {
            *w = *r;
        }
        Ok(words)
    }
}

impl Write for FakeI2c {
    type Error = Infallible;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.writes.borrow_mut().push((address, bytes.to_vec()));
        Ok(())
    }
}

impl WriteRead for FakeI2c {
    type Error = Infallible;

    fn write_read(
        &mut self,
        _address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let start = bytes.first().copied().unwrap_or(0) as usize;
        let regs = self.registers.borrow();
        for (i, b) in buffer.iter_mut().enumerate() {
            *b = regs.get(start + i).copied().unwrap_or(0);
        }
        Ok(())
    }
}
