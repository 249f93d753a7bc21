// SpiMode - MSSP Mode-Change Firmware Core
// Copyright (C) 2026 SpiMode Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which of the two firmware builds to run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantId {
    /// 4 MHz HFINTOSC, buffer-full completion flag.
    #[default]
    A,
    /// 64 MHz HFINTOSC, interrupt-flag completion with manual clear.
    B,
}

/// External device wired to the SPI lines.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    /// SDO tied straight back to SDI.
    #[default]
    Loopback,
    /// Shift-register slave answering with the previous byte it received.
    Echo { mode: u8 },
}

fn default_write_data() -> u8 {
    1
}

fn default_max_polls() -> u64 {
    10_000
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    pub iterations: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u64,
    #[serde(default)]
    pub trace_capacity: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReceiveDataAssertion {
    pub receive_data: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ChipSelectFramingAssertion {
    pub chip_select_framing: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SckHzAssertion {
    pub sck_hz: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum RunAssertion {
    ReceiveData(ReceiveDataAssertion),
    ChipSelectFraming(ChipSelectFramingAssertion),
    SckHz(SckHzAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunScript {
    pub schema_version: String,
    #[serde(default)]
    pub variant: VariantId,
    #[serde(default = "default_write_data")]
    pub write_data: u8,
    #[serde(default)]
    pub device: DeviceConfig,
    pub limits: RunLimits,
    #[serde(default)]
    pub assertions: Vec<RunAssertion>,
}

impl RunScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open run script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Run Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.limits.iterations == 0 {
            anyhow::bail!("Limit 'iterations' must be greater than zero");
        }

        if self.limits.max_polls == 0 {
            anyhow::bail!("Limit 'max_polls' must be greater than zero");
        }

        if self.limits.trace_capacity == Some(0) {
            anyhow::bail!("Limit 'trace_capacity' must be greater than zero when set");
        }

        if let DeviceConfig::Echo { mode } = self.device {
            if mode > 3 {
                anyhow::bail!("Echo device mode {} is out of range (0..=3)", mode);
            }
        }

        Ok(())
    }
}

/// Parses a byte given as decimal, `0x`-prefixed hex or `0b`-prefixed binary.
pub fn parse_byte(s: &str) -> Result<u8> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u8::from_str_radix(bin, 2)
    } else {
        s.parse::<u8>()
    };
    parsed.map_err(|e| anyhow::anyhow!("Invalid byte '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
variant: b
write_data: 0x5A
device:
  type: echo
  mode: 0
limits:
  iterations: 8
  max_polls: 64
assertions:
  - receive_data: 90
  - chip_select_framing: true
  - sck_hz: 8000000
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.variant, VariantId::B);
        assert_eq!(script.write_data, 0x5A);
        assert_eq!(script.device, DeviceConfig::Echo { mode: 0 });
        assert_eq!(script.limits.iterations, 8);
        assert_eq!(script.assertions.len(), 3);
        assert!(matches!(
            script.assertions[2],
            RunAssertion::SckHz(SckHzAssertion { sck_hz: 8_000_000 })
        ));
    }

    #[test]
    fn test_defaults() {
        let yaml = r#"
schema_version: "1.0"
limits:
  iterations: 1
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.variant, VariantId::A);
        assert_eq!(script.write_data, 1);
        assert_eq!(script.device, DeviceConfig::Loopback);
        assert_eq!(script.limits.max_polls, 10_000);
        assert!(script.assertions.is_empty());
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
limits:
  iterations: 1
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_invalid_iterations() {
        let yaml = r#"
schema_version: "1.0"
limits:
  iterations: 0
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("iterations"));
    }

    #[test]
    fn test_invalid_max_polls() {
        let yaml = r#"
schema_version: "1.0"
limits:
  iterations: 1
  max_polls: 0
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("max_polls"));
    }

    #[test]
    fn test_invalid_trace_capacity() {
        let yaml = r#"
schema_version: "1.0"
limits:
  iterations: 1
  trace_capacity: 0
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("trace_capacity"));

        let yaml = r#"
schema_version: "1.0"
limits:
  iterations: 1
  trace_capacity: 16
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_invalid_echo_mode() {
        let yaml = r#"
schema_version: "1.0"
device:
  type: echo
  mode: 4
limits:
  iterations: 1
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("mode 4"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
schema_version: "1.0"
baud: 9600
limits:
  iterations: 1
"#;
        assert!(serde_yaml::from_str::<RunScript>(yaml).is_err());
    }

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x01").unwrap(), 1);
        assert_eq!(parse_byte("0XfF").unwrap(), 0xFF);
        assert_eq!(parse_byte("0b1010").unwrap(), 0x0A);
        assert_eq!(parse_byte(" 42 ").unwrap(), 42);
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("0xZZ").is_err());
    }
}
