//! Si4060 Command Transport
//!
//! The Si4060 speaks a command/response protocol over SPI: a command frame
//! is clocked out under one chip-select assertion, and the response is
//! collected later with `READ_CMD_BUFF`, whose first byte is the
//! clear-to-send (CTS) marker.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Error as _, SpiBus};

use crate::types::{RadioError, RadioResult};

/// `READ_CMD_BUFF` command
pub const READ_CMD_BUFF: u8 = 0x44;

/// CTS marker returned by `READ_CMD_BUFF` when the chip is ready
pub const CTS_READY: u8 = 0xFF;

/// Frame-level access to the chip
pub trait CommandBus {
    /// Clock out one command frame
    ///
    /// # Errors
    ///
    /// Returns a bus or pin error if the frame could not be sent.
    fn send(&mut self, frame: &[u8]) -> RadioResult<()>;

    /// Issue one `READ_CMD_BUFF`
    ///
    /// Returns `true` when CTS was asserted, in which case `response` has
    /// been filled with the bytes following the marker.
    ///
    /// # Errors
    ///
    /// Returns a bus or pin error if the poll could not be performed.
    fn poll_cts(&mut self, response: &mut [u8]) -> RadioResult<bool>;
}

/// [`CommandBus`] over a blocking SPI bus with a manually driven NSEL line
pub struct SpiCommandBus<SPI, CS> {
    spi: SPI,
    nsel: CS,
}

impl<SPI: SpiBus, CS: OutputPin> SpiCommandBus<SPI, CS> {
    /// Wrap a bus and chip select, deselecting the chip
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::Pin`] if NSEL cannot be driven high.
    pub fn new(spi: SPI, mut nsel: CS) -> RadioResult<Self> {
        nsel.set_high().map_err(|_| RadioError::Pin)?;
        Ok(Self { spi, nsel })
    }

    /// Release the bus and pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.nsel)
    }

    /// Run `op` with NSEL asserted, deasserting it even if `op` fails
    fn selected<T>(&mut self, op: impl FnOnce(&mut SPI) -> Result<T, SPI::Error>) -> RadioResult<T> {
        self.nsel.set_low().map_err(|_| RadioError::Pin)?;
        let result = op(&mut self.spi).and_then(|value| self.spi.flush().map(|()| value));
        self.nsel.set_high().map_err(|_| RadioError::Pin)?;
        result.map_err(|e| RadioError::Bus(e.kind()))
    }
}

impl<SPI: SpiBus, CS: OutputPin> CommandBus for SpiCommandBus<SPI, CS> {
    fn send(&mut self, frame: &[u8]) -> RadioResult<()> {
        self.selected(|spi| spi.write(frame))
    }

    fn poll_cts(&mut self, response: &mut [u8]) -> RadioResult<bool> {
        self.selected(|spi| {
            spi.write(&[READ_CMD_BUFF])?;
            let mut cts = [0u8];
            spi.read(&mut cts)?;
            if cts[0] != CTS_READY {
                return Ok(false);
            }
            if !response.is_empty() {
                spi.read(response)?;
            }
            Ok(true)
        })
    }
}
