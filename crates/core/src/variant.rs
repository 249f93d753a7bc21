use crate::mssp::CompletionPolicy;
use crate::registers::HfFrequency;
use embedded_hal::spi::{Mode, MODE_0, MODE_2};
use spimode_config::VariantId;
use std::fmt;

/// The two builds of the firmware. They differ in system clock, SPI clock
/// mode and completion-flag handling; a device on the bus must match the
/// active variant's clock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantProfile {
    pub variant: Variant,
    pub frequency: HfFrequency,
    pub mode: Mode,
    pub completion: CompletionPolicy,
    /// SSP1ADD
    pub baud_divisor: u8,
}

impl Variant {
    pub fn profile(self) -> VariantProfile {
        match self {
            Variant::A => VariantProfile {
                variant: self,
                frequency: HfFrequency::Mhz4,
                mode: MODE_2,
                completion: CompletionPolicy::SelfClearing,
                baud_divisor: 1,
            },
            Variant::B => VariantProfile {
                variant: self,
                frequency: HfFrequency::Mhz64,
                mode: MODE_0,
                completion: CompletionPolicy::ManualClear,
                baud_divisor: 1,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::A => "a",
            Variant::B => "b",
        }
    }
}

impl From<VariantId> for Variant {
    fn from(id: VariantId) -> Self {
        match id {
            VariantId::A => Variant::A,
            VariantId::B => Variant::B,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Variant> for VariantProfile {
    fn from(v: Variant) -> Self {
        v.profile()
    }
}
