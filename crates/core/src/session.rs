use crate::mssp::{self, Exchange};
use crate::variant::VariantProfile;
use crate::wait::{Spin, WaitStrategy};
use crate::{chip_select, clock, port, pps, RegisterInterface, SessionObserver, SpiResult};
use std::convert::Infallible;
use std::sync::Arc;

/// Owns the register interface together with the two bytes the firmware
/// keeps: the fixed byte it transmits and the byte it last received.
pub struct SpiSession<R, W = Spin> {
    regs: R,
    wait: W,
    profile: VariantProfile,
    write_data: u8,
    receive_data: u8,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl<R: RegisterInterface> SpiSession<R, Spin> {
    pub fn new(regs: R, profile: impl Into<VariantProfile>, write_data: u8) -> Self {
        Self::with_wait(regs, Spin, profile, write_data)
    }
}

impl<R: RegisterInterface, W: WaitStrategy> SpiSession<R, W> {
    pub fn with_wait(
        regs: R,
        wait: W,
        profile: impl Into<VariantProfile>,
        write_data: u8,
    ) -> Self {
        Self {
            regs,
            wait,
            profile: profile.into(),
            write_data,
            receive_data: 0,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_registers(self) -> R {
        self.regs
    }

    pub fn profile(&self) -> &VariantProfile {
        &self.profile
    }

    pub fn write_data(&self) -> u8 {
        self.write_data
    }

    pub fn receive_data(&self) -> u8 {
        self.receive_data
    }

    /// Clock, pin routing, port directions, then MSSP1. Every routine
    /// overwrites its registers, so running this again is harmless.
    pub fn initialize(&mut self) -> SpiResult<()> {
        clock::init(&mut self.regs, self.profile.frequency)?;
        pps::init(&mut self.regs)?;
        port::init(&mut self.regs)?;
        mssp::init(&mut self.regs, &self.profile)?;

        tracing::info!("Variant {} initialized", self.profile.variant);
        for observer in &self.observers {
            observer.on_initialized();
        }
        Ok(())
    }

    pub fn select(&mut self) -> SpiResult<()> {
        chip_select::select(&mut self.regs)
    }

    pub fn deselect(&mut self) -> SpiResult<()> {
        chip_select::deselect(&mut self.regs)
    }

    /// Exchanges one byte without touching chip-select.
    pub fn exchange(&mut self, data: u8) -> SpiResult<u8> {
        for observer in &self.observers {
            observer.on_exchange_start(data);
        }

        let Exchange { received, polls } =
            mssp::exchange_byte(&mut self.regs, &mut self.wait, self.profile.completion, data)?;

        for observer in &self.observers {
            observer.on_exchange_end(received, polls);
        }
        Ok(received)
    }

    /// One pass of the main loop: select, exchange the fixed byte, store
    /// the reply, deselect.
    pub fn transaction(&mut self) -> SpiResult<u8> {
        self.select()?;
        let result = self.exchange(self.write_data);
        let release = self.deselect();
        let received = result?;
        self.receive_data = received;
        release?;
        Ok(received)
    }

    /// Runs `iterations` passes of the main loop and returns the last byte
    /// received.
    pub fn run_for(&mut self, iterations: u64) -> SpiResult<u8> {
        for _ in 0..iterations {
            self.transaction()?;
        }
        Ok(self.receive_data)
    }

    /// The firmware main loop. Never returns unless a register access or
    /// the wait strategy fails.
    pub fn run(&mut self) -> SpiResult<Infallible> {
        loop {
            self.transaction()?;
        }
    }
}

impl<R: std::fmt::Debug, W: std::fmt::Debug> std::fmt::Debug for SpiSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpiSession")
            .field("regs", &self.regs)
            .field("wait", &self.wait)
            .field("profile", &self.profile)
            .field("write_data", &self.write_data)
            .field("receive_data", &self.receive_data)
            .field("observers", &self.observers.len())
            .finish()
    }
}
