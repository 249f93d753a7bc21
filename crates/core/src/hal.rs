use crate::wait::WaitStrategy;
use crate::{RegisterInterface, SpiError, SpiSession};
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

const FILL: u8 = 0x00;

impl spi::Error for SpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl<R: RegisterInterface, W: WaitStrategy> ErrorType for SpiSession<R, W> {
    type Error = SpiError;
}

/// Each transaction is one chip-select bracket. Chip-select is released
/// even if an operation fails.
impl<R: RegisterInterface, W: WaitStrategy> SpiDevice<u8> for SpiSession<R, W> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.select()?;

        let mut inner = || -> Result<(), SpiError> {
            for op in operations.iter_mut() {
                match op {
                    Operation::Read(buf) => {
                        for word in buf.iter_mut() {
                            *word = self.exchange(FILL)?;
                        }
                    }
                    Operation::Write(buf) => {
                        for &word in buf.iter() {
                            self.exchange(word)?;
                        }
                    }
                    Operation::Transfer(read, write) => {
                        for i in 0..read.len().max(write.len()) {
                            let rx = self.exchange(write.get(i).copied().unwrap_or(FILL))?;
                            if let Some(slot) = read.get_mut(i) {
                                *slot = rx;
                            }
                        }
                    }
                    Operation::TransferInPlace(buf) => {
                        for word in buf.iter_mut() {
                            *word = self.exchange(*word)?;
                        }
                    }
                    Operation::DelayNs(ns) => self.registers_mut().delay_ns(*ns)?,
                }
            }
            Ok(())
        };

        let result = inner();
        let release = self.deselect();
        result.and(release)
    }
}
