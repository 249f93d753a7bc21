//! Polling primitives used while the MSSP shifts a byte.

use crate::{SpiError, SpiResult};

pub trait WaitStrategy {
    /// Polls `condition` until it returns `true` and reports how many polls
    /// it took.
    fn wait_for(&mut self, condition: &mut dyn FnMut() -> SpiResult<bool>) -> SpiResult<u64>;
}

/// Spins until the condition holds. Never times out: a peripheral that
/// never raises its flag keeps the caller here forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct Spin;

impl WaitStrategy for Spin {
    fn wait_for(&mut self, condition: &mut dyn FnMut() -> SpiResult<bool>) -> SpiResult<u64> {
        let mut polls = 0u64;
        loop {
            polls = polls.saturating_add(1);
            if condition()? {
                return Ok(polls);
            }
            core::hint::spin_loop();
        }
    }
}

/// Gives up with [`SpiError::Timeout`] after `max_polls` unsuccessful polls.
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    pub max_polls: u64,
}

impl Bounded {
    pub fn new(max_polls: u64) -> Self {
        Self { max_polls }
    }
}

impl WaitStrategy for Bounded {
    fn wait_for(&mut self, condition: &mut dyn FnMut() -> SpiResult<bool>) -> SpiResult<u64> {
        for polls in 1..=self.max_polls {
            if condition()? {
                return Ok(polls);
            }
        }
        tracing::warn!("Gave up waiting after {} polls", self.max_polls);
        Err(SpiError::Timeout {
            polls: self.max_polls,
        })
    }
}

impl<W: WaitStrategy + ?Sized> WaitStrategy for &mut W {
    fn wait_for(&mut self, condition: &mut dyn FnMut() -> SpiResult<bool>) -> SpiResult<u64> {
        (**self).wait_for(condition)
    }
}
