use crate::mssp::{decode_sck, samples_on_rising_edge};
use crate::peripherals::device::{self, Loopback, SpiTarget};
use crate::peripherals::interrupts::Interrupts;
use crate::peripherals::mssp::Mssp;
use crate::peripherals::oscillator::Oscillator;
use crate::peripherals::port::PortC;
use crate::peripherals::pps::Pps;
use crate::peripherals::trace::PinTrace;
use crate::peripherals::Peripheral;
use crate::registers::{Pir3, PortPins};
use crate::{Register, RegisterInterface, SpiResult};
use embedded_hal::spi::Polarity;
use fugit::HertzU32;
use spimode_config::DeviceConfig;
use std::mem;

/// Register file of the simulated part plus whatever hangs off its SPI pins.
///
/// Every register access advances time by one tick. While MSSP1 is
/// shifting, each tick moves one bit, so a transfer completes eight
/// accesses after SSP1BUF was written.
#[derive(Debug)]
pub struct SimulatedBus {
    pub oscillator: Oscillator,
    pub pps: Pps,
    pub port_c: PortC,
    pub mssp: Mssp,
    pub interrupts: Interrupts,
    pub trace: PinTrace,
    device: Box<dyn SpiTarget>,
    ticks: u64,
    // last level of each latch-driven output, for edge detection
    driven: (PortPins, PortPins),
    // one-bit delay lines used when the device samples on the other edge
    delayed_mosi: bool,
    delayed_miso: bool,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::with_device(Box::new(Loopback))
    }

    pub fn with_device(device: Box<dyn SpiTarget>) -> Self {
        let port_c = PortC::new();
        let driven = port_c.driven();
        Self {
            oscillator: Oscillator::new(),
            pps: Pps::new(),
            port_c,
            mssp: Mssp::new(),
            interrupts: Interrupts::new(),
            trace: PinTrace::default(),
            device,
            ticks: 0,
            driven,
            delayed_mosi: true,
            delayed_miso: true,
        }
    }

    pub fn from_config(config: &DeviceConfig, trace_capacity: Option<usize>) -> SpiResult<Self> {
        let mut bus = Self::with_device(device::from_config(config)?);
        if let Some(capacity) = trace_capacity {
            bus.trace = PinTrace::new(capacity);
        }
        Ok(bus)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn device(&self) -> &dyn SpiTarget {
        self.device.as_ref()
    }

    fn peripheral(&self, reg: Register) -> &dyn Peripheral {
        match reg {
            Register::Osccon1 | Register::Oscfrq => &self.oscillator,
            Register::Rc3pps | Register::Rc5pps | Register::Ssp1datpps => &self.pps,
            Register::Trisc | Register::Anselc | Register::Portc => &self.port_c,
            Register::Ssp1add | Register::Ssp1stat | Register::Ssp1con1 | Register::Ssp1buf => {
                &self.mssp
            }
            Register::Pir3 => &self.interrupts,
        }
    }

    fn peripheral_mut(&mut self, reg: Register) -> &mut dyn Peripheral {
        match reg {
            Register::Osccon1 | Register::Oscfrq => &mut self.oscillator,
            Register::Rc3pps | Register::Rc5pps | Register::Ssp1datpps => &mut self.pps,
            Register::Trisc | Register::Anselc | Register::Portc => &mut self.port_c,
            Register::Ssp1add | Register::Ssp1stat | Register::Ssp1con1 | Register::Ssp1buf => {
                &mut self.mssp
            }
            Register::Pir3 => &mut self.interrupts,
        }
    }

    /// Register value without side effects and without advancing time.
    pub fn peek(&self, reg: Register) -> SpiResult<u8> {
        self.peripheral(reg).peek(reg)
    }

    pub fn read_address(&mut self, addr: u16) -> SpiResult<u8> {
        self.read(Register::from_address(addr)?)
    }

    pub fn write_address(&mut self, addr: u16, value: u8) -> SpiResult<()> {
        self.write(Register::from_address(addr)?, value)
    }

    pub fn system_clock(&self) -> Option<HertzU32> {
        self.oscillator.system_clock()
    }

    pub fn sck_frequency(&self) -> Option<HertzU32> {
        let con1 = self.mssp.peek(Register::Ssp1con1).ok()?;
        let add = self.mssp.peek(Register::Ssp1add).ok()?;
        decode_sck(self.system_clock(), con1, add)
    }

    /// Puts every block back to its reset state. The attached device and
    /// the trace are kept.
    pub fn reset(&mut self) {
        self.oscillator.reset();
        self.pps.reset();
        self.port_c.reset();
        self.mssp.reset();
        self.interrupts.reset();
        self.sync_outputs();
    }

    /// Instruction cycles (FOSC/4) needed to cover `ns`, rounded up.
    fn instruction_cycles(&self, ns: u32) -> u64 {
        let Some(fosc) = self.system_clock() else {
            return 0;
        };
        let fcy = u64::from(fosc.to_Hz() / 4);
        (u64::from(ns) * fcy).div_ceil(1_000_000_000)
    }

    fn tick(&mut self) {
        self.ticks += 1;

        if !self.mssp.is_enabled() {
            return;
        }
        let Some(mosi) = self.mssp.mosi_bit() else {
            return;
        };

        let master_mode = self.mssp.mode();
        let sck_out = self.pps.sck_routed() && self.port_c.is_output(PortPins::SCK);
        let sdo_out = self.pps.sdo_routed() && self.port_c.is_output(PortPins::SDO);
        let mosi_line = if sdo_out { mosi } else { true };

        let skewed = self
            .device
            .mode()
            .is_some_and(|m| samples_on_rising_edge(m) != samples_on_rising_edge(master_mode));

        let device_in = if skewed {
            mem::replace(&mut self.delayed_mosi, mosi_line)
        } else {
            mosi_line
        };
        let device_out = self.device.transfer_bit(device_in, sck_out);
        let miso_line = if skewed {
            mem::replace(&mut self.delayed_miso, device_out)
        } else {
            device_out
        };

        if sck_out {
            let idle = master_mode.polarity == Polarity::IdleHigh;
            self.trace.record(self.ticks, PortPins::SCK, !idle);
            self.trace.record(self.ticks, PortPins::SCK, idle);
        }

        self.port_c.drive_external(PortPins::SDI, miso_line);
        let sdi_visible = self.pps.sdi_routed()
            && !self.port_c.is_output(PortPins::SDI)
            && self.port_c.is_digital(PortPins::SDI);
        let sdi = sdi_visible && miso_line;

        if self.mssp.clock_bit(sdi).is_some() {
            self.interrupts.raise(Pir3::SSP1IF);
        }
    }

    /// Records latch-driven pin changes and tells the device about
    /// chip-select edges.
    fn sync_outputs(&mut self) {
        let (outputs, levels) = self.port_c.driven();
        let (prev_outputs, prev_levels) = self.driven;
        let overridden = self.pps.overridden_pins();

        for pin in (outputs | prev_outputs).difference(overridden).iter() {
            let was = prev_outputs.contains(pin) && prev_levels.contains(pin);
            let now = outputs.contains(pin) && levels.contains(pin);
            let became_output = outputs.contains(pin) && !prev_outputs.contains(pin);
            if was != now || became_output {
                self.trace.record(self.ticks, pin, now);
            }
        }

        let cs_active = outputs.contains(PortPins::CHIP_SELECT)
            && !levels.contains(PortPins::CHIP_SELECT);
        let was_active = prev_outputs.contains(PortPins::CHIP_SELECT)
            && !prev_levels.contains(PortPins::CHIP_SELECT);
        if cs_active != was_active {
            tracing::debug!("CS: {}", if cs_active { "selected" } else { "released" });
            self.device.set_selected(cs_active);
        }

        self.driven = (outputs, levels);
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterInterface for SimulatedBus {
    fn read(&mut self, reg: Register) -> SpiResult<u8> {
        self.tick();
        self.peripheral_mut(reg).read(reg)
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        self.tick();
        let was_busy = self.mssp.is_busy();
        self.peripheral_mut(reg).write(reg, value)?;

        match reg {
            Register::Trisc | Register::Portc => self.sync_outputs(),
            Register::Ssp1buf if !was_busy && self.mssp.is_busy() => {
                self.delayed_mosi = true;
                self.delayed_miso = true;
            }
            _ => {}
        }
        Ok(())
    }

    /// Advances time by one tick per instruction cycle.
    fn delay_ns(&mut self, ns: u32) -> SpiResult<()> {
        for _ in 0..self.instruction_cycles(ns) {
            self.tick();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::device::ShiftEcho;
    use embedded_hal::spi::MODE_1;

    #[test]
    fn test_every_register_dispatches_to_its_owner() {
        let bus = SimulatedBus::new();
        for reg in Register::ALL {
            assert!(bus.peripheral(reg).owns(reg), "{} misrouted", reg);
        }
    }

    #[test]
    fn test_access_advances_time() {
        let mut bus = SimulatedBus::new();
        bus.read(Register::Portc).unwrap();
        bus.write(Register::Ssp1add, 3).unwrap();
        assert_eq!(bus.ticks(), 2);
        // peek is free
        bus.peek(Register::Ssp1add).unwrap();
        assert_eq!(bus.ticks(), 2);
    }

    #[test]
    fn test_delay_counts_instruction_cycles() {
        let mut bus = SimulatedBus::new();
        // 1 MHz out of reset, so one instruction cycle is 4 us
        bus.delay_ns(10_000).unwrap();
        assert_eq!(bus.ticks(), 3);

        bus.write(Register::Oscfrq, 0x08).unwrap();
        bus.write(Register::Osccon1, 0x60).unwrap();
        let start = bus.ticks();
        bus.delay_ns(1_000).unwrap();
        assert_eq!(bus.ticks() - start, 16);
    }

    #[test]
    fn test_from_config_attaches_device() {
        let config = DeviceConfig::Echo { mode: 1 };
        let bus = SimulatedBus::from_config(&config, Some(8)).unwrap();
        assert_eq!(bus.device().mode(), Some(MODE_1));
        let bus = SimulatedBus::with_device(Box::new(ShiftEcho::new(MODE_1)));
        assert_eq!(bus.device().mode(), Some(MODE_1));
        assert_eq!(SimulatedBus::new().device().mode(), None);
        assert!(matches!(
            SimulatedBus::from_config(&DeviceConfig::Echo { mode: 4 }, None),
            Err(crate::SpiError::InvalidMode(4))
        ));
    }
}
