//! MAX31855K thermocouple-to-digital converter.
//!
//! One conversion is a 32-bit big-endian frame clocked out on MISO while
//! CS is asserted:
//!
//! ```text
//!  31            18 17 16 15          4  3  2   1   0
//! ┌────────────────┬──┬──┬─────────────┬──┬───┬───┬──┐
//! │ HJ  (s14, .25) │0 │F │ CJ (s12,1/16)│0 │SCV│SCG│OC│
//! └────────────────┴──┴──┴─────────────┴──┴───┴───┴──┘
//! ```
//!
//! The chip-select handling belongs to the `SpiDevice` implementation.

use embedded_hal::spi::SpiDevice;
use log::debug;

use crate::app::ports::ThermocouplePort;
use crate::error::ThermocoupleError;

/// Hot-junction resolution in °C per LSB.
pub const HJ_RESOLUTION_C: f32 = 0.25;
/// Cold-junction resolution in °C per LSB.
pub const CJ_RESOLUTION_C: f32 = 0.0625;

const FAULT_BIT: u32 = 1 << 16;
const SCV_BIT: u32 = 1 << 2;
const SCG_BIT: u32 = 1 << 1;
const OC_BIT: u32 = 1;

/// A decoded, fault-free conversion frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(u32);

impl Frame {
    /// Check a raw frame for converter faults.
    pub fn decode(raw: u32) -> Result<Self, ThermocoupleError> {
        if raw == 0 {
            return Err(ThermocoupleError::AllZeros);
        }
        if raw & FAULT_BIT != 0 {
            return Err(if raw & SCV_BIT != 0 {
                ThermocoupleError::ShortToSupply
            } else if raw & SCG_BIT != 0 {
                ThermocoupleError::ShortToGround
            } else if raw & OC_BIT != 0 {
                ThermocoupleError::OpenCircuit
            } else {
                // Fault flag without a cause bit: treat the link as broken.
                ThermocoupleError::TransferFailure
            });
        }
        Ok(Self(raw))
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Cold-junction compensated thermocouple temperature (°C).
    pub fn hot_junction_c(self) -> f32 {
        // Arithmetic shift sign-extends the 14-bit field.
        let counts = (self.0 as i32) >> 18;
        counts as f32 * HJ_RESOLUTION_C
    }

    /// Internal reference-junction temperature (°C).
    pub fn cold_junction_c(self) -> f32 {
        let counts = ((self.0 << 16) as i32) >> 20;
        counts as f32 * CJ_RESOLUTION_C
    }
}

/// MAX31855K on an SPI bus.
pub struct Max31855<SPI> {
    spi: SPI,
    last: Option<Frame>,
}

impl<SPI: SpiDevice> Max31855<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi, last: None }
    }

    /// Clock out one conversion and check it for faults.
    pub fn read_frame(&mut self) -> Result<Frame, ThermocoupleError> {
        let mut buf = [0u8; 4];
        self.spi
            .read(&mut buf)
            .map_err(|_| ThermocoupleError::TransferFailure)?;
        let frame = Frame::decode(u32::from_be_bytes(buf)).inspect_err(|e| {
            debug!("max31855: fault in frame {:#010x}: {}", u32::from_be_bytes(buf), e.name());
        })?;
        self.last = Some(frame);
        Ok(frame)
    }

    /// Last fault-free frame, if any.
    pub fn last_frame(&self) -> Option<Frame> {
        self.last
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> ThermocouplePort for Max31855<SPI>
where
    SPI: SpiDevice + Send,
{
    fn read_temperature(&mut self) -> Result<f32, ThermocoupleError> {
        self.read_frame().map(Frame::hot_junction_c)
    }
}
