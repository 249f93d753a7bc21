use crate::mssp::mode_from_number;
use crate::{SpiError, SpiResult};
use embedded_hal::spi::Mode;
use spimode_config::DeviceConfig;

/// Something wired to the SCK/SDO/SDI/CS lines.
pub trait SpiTarget: std::fmt::Debug + Send {
    /// Clock mode the device samples in. `None` for passive wiring that
    /// does not care about clock edges.
    fn mode(&self) -> Option<Mode> {
        None
    }

    fn set_selected(&mut self, _selected: bool) {}

    /// One SCK period. `clocked` is false when no clock reaches the device.
    /// Returns the level the device drives on SDI.
    fn transfer_bit(&mut self, mosi: bool, clocked: bool) -> bool;
}

/// SDO tied to SDI.
#[derive(Debug, Default)]
pub struct Loopback;

impl SpiTarget for Loopback {
    fn transfer_bit(&mut self, mosi: bool, _clocked: bool) -> bool {
        mosi
    }
}

/// Shift-register slave. While selected it shifts out the last complete
/// byte it received and shifts in the new one; a released line floats high.
#[derive(Debug)]
pub struct ShiftEcho {
    mode: Mode,
    selected: bool,
    out: u8,
    incoming: u8,
    bits: u8,
    last_received: u8,
}

impl ShiftEcho {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            selected: false,
            out: 0xFF,
            incoming: 0,
            bits: 0,
            last_received: 0xFF,
        }
    }

    pub fn last_received(&self) -> u8 {
        self.last_received
    }
}

impl SpiTarget for ShiftEcho {
    fn mode(&self) -> Option<Mode> {
        Some(self.mode)
    }

    fn set_selected(&mut self, selected: bool) {
        if selected && !self.selected {
            self.out = self.last_received;
            self.incoming = 0;
            self.bits = 0;
        }
        self.selected = selected;
    }

    fn transfer_bit(&mut self, mosi: bool, clocked: bool) -> bool {
        if !self.selected || !clocked {
            return true;
        }
        let miso = self.out & 0x80 != 0;
        self.out <<= 1;
        self.incoming = (self.incoming << 1) | mosi as u8;
        self.bits += 1;
        if self.bits == 8 {
            self.last_received = self.incoming;
            self.out = self.incoming;
            self.incoming = 0;
            self.bits = 0;
        }
        miso
    }
}

pub fn from_config(config: &DeviceConfig) -> SpiResult<Box<dyn SpiTarget>> {
    match config {
        DeviceConfig::Loopback => Ok(Box::new(Loopback)),
        DeviceConfig::Echo { mode } => {
            let mode = mode_from_number(*mode).ok_or(SpiError::InvalidMode(*mode))?;
            Ok(Box::new(ShiftEcho::new(mode)))
        }
    }
}
