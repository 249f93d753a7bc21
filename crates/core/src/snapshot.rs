use crate::bus::SimulatedBus;
use crate::mssp::{decode_mode, mode_number};
use crate::wait::WaitStrategy;
use crate::{Register, SpiSession};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every register of the simulated part, keyed by name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub registers: BTreeMap<String, u8>,
}

impl RegisterSnapshot {
    pub fn capture(bus: &SimulatedBus) -> Self {
        let registers = Register::ALL
            .iter()
            .filter_map(|&reg| bus.peek(reg).ok().map(|v| (reg.name().to_string(), v)))
            .collect();
        Self { registers }
    }

    pub fn get(&self, reg: Register) -> Option<u8> {
        self.registers.get(reg.name()).copied()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MachineSnapshot {
    pub variant: String,
    pub write_data: u8,
    pub receive_data: u8,
    pub system_clock_hz: Option<u32>,
    pub sck_hz: Option<u32>,
    pub spi_mode: u8,
    pub ticks: u64,
    pub registers: RegisterSnapshot,
}

impl MachineSnapshot {
    pub fn capture<W: WaitStrategy>(session: &SpiSession<SimulatedBus, W>) -> Self {
        let bus = session.registers();
        let registers = RegisterSnapshot::capture(bus);
        let mode = decode_mode(
            registers.get(Register::Ssp1con1).unwrap_or(0),
            registers.get(Register::Ssp1stat).unwrap_or(0),
        );
        Self {
            variant: session.profile().variant.to_string(),
            write_data: session.write_data(),
            receive_data: session.receive_data(),
            system_clock_hz: bus.system_clock().map(|f| f.to_Hz()),
            sck_hz: bus.sck_frequency().map(|f| f.to_Hz()),
            spi_mode: mode_number(mode),
            ticks: bus.ticks(),
            registers,
        }
    }
}
