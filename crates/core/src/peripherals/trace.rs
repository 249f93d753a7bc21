use crate::registers::PortPins;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinEvent {
    pub tick: u64,
    /// Port C bit number.
    pub pin: u8,
    pub high: bool,
}

/// Bounded log of pin level changes. Oldest events are dropped first.
#[derive(Debug)]
pub struct PinTrace {
    events: VecDeque<PinEvent>,
    capacity: usize,
    dropped: u64,
}

impl PinTrace {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn record(&mut self, tick: u64, pin: PortPins, high: bool) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(PinEvent {
            tick,
            pin: pin.bits().trailing_zeros() as u8,
            high,
        });
    }

    pub fn events(&self) -> impl Iterator<Item = &PinEvent> {
        self.events.iter()
    }

    pub fn events_for(&self, pin: PortPins) -> impl Iterator<Item = &PinEvent> {
        let bit = pin.bits().trailing_zeros() as u8;
        self.events.iter().filter(move |e| e.pin == bit)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    /// True if every recorded SCK edge happened while chip-select was low.
    /// Chip-select is taken as high until its first recorded event.
    pub fn chip_select_framing_ok(&self) -> bool {
        let cs = PortPins::CHIP_SELECT.bits().trailing_zeros() as u8;
        let sck = PortPins::SCK.bits().trailing_zeros() as u8;
        let mut cs_high = true;
        for e in &self.events {
            if e.pin == cs {
                cs_high = e.high;
            } else if e.pin == sck && cs_high {
                return false;
            }
        }
        true
    }
}

impl Default for PinTrace {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
