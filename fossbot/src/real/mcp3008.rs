// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::spi::Transfer;
use std::fmt::Debug;

use crate::control::{AnalogueReader, ControlError, HardwareError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of single ended channels.
pub const NUM_CHANNELS: u8 = 8;

/// Largest value of a 10 bit conversion.
const MAX_VALUE: f64 = 1023.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// MCP3008 10 bit ADC on an SPI bus.
pub struct Mcp3008<S> {
    spi: S,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<S> Mcp3008<S>
where
    S: Transfer<u8>,
    S::Error: Debug,
{
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Raw 10 bit conversion of a channel.
    pub fn read_raw(&mut self, channel: u8) -> Result<u16, ControlError> {
        if channel >= NUM_CHANNELS {
            return Err(ControlError::InvalidArgument(format!(
                "the MCP3008 has no channel {}",
                channel
            )));
        }

        // Start bit, single ended mode and channel, then clock out the result
        let mut buf = [1, (8 + channel) << 4, 0];
        let r = self.spi.transfer(&mut buf).map_err(|e| HardwareError::Bus {
            device: "MCP3008",
            msg: format!("{:?}", e),
        })?;

        Ok((((r[1] & 3) as u16) << 8) | r[2] as u16)
    }
}

impl<S> AnalogueReader for Mcp3008<S>
where
    S: Transfer<u8>,
    S::Error: Debug,
{
    fn get_reading(&mut self, channel: u8) -> Result<f64, ControlError> {
        Ok(self.read_raw(channel)? as f64 / MAX_VALUE)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::real::fake::FakeSpi;

    #[test]
    fn test_conversion() {
        let spi = FakeSpi::default();
        *spi.reply.borrow_mut() = vec![0, 0b1111_1110, 0xff];
        let mut adc = Mcp3008::new(spi.clone());

        assert_eq!(adc.read_raw(3).unwrap(), 0x2ff);
        assert_eq!(spi.sent.borrow()[0], vec![1, 0xb0, 0]);

        *spi.reply.borrow_mut() = vec![0, 3, 0xff];
        assert_eq!(adc.get_reading(0).unwrap(), 1.0);

        assert!(matches!(
            adc.get_reading(8),
            Err(ControlError::InvalidArgument(_))
        ));
    }
}
