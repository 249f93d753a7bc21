use crate::SessionObserver;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct ExchangeMetrics {
    exchange_count: AtomicU64,
    poll_count: AtomicU64,
    last_received: AtomicU8,
    start_time: Instant,
}

impl Default for ExchangeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeMetrics {
    pub fn new() -> Self {
        Self {
            exchange_count: AtomicU64::new(0),
            poll_count: AtomicU64::new(0),
            last_received: AtomicU8::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn get_exchanges(&self) -> u64 {
        self.exchange_count.load(Ordering::SeqCst)
    }

    pub fn get_polls(&self) -> u64 {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn get_last_received(&self) -> u8 {
        self.last_received.load(Ordering::SeqCst)
    }

    pub fn get_exchanges_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_exchanges() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SessionObserver for ExchangeMetrics {
    fn on_exchange_end(&self, rx: u8, polls: u64) {
        self.exchange_count.fetch_add(1, Ordering::SeqCst);
        self.poll_count.fetch_add(polls, Ordering::SeqCst);
        self.last_received.store(rx, Ordering::SeqCst);
    }
}
