// SpiMode - MSSP Mode-Change Firmware Core
// Copyright (C) 2026 SpiMode Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sha2::{Digest, Sha256};
use spimode_config::{DeviceConfig, RunAssertion, RunScript, VariantId};
use spimode_core::bus::SimulatedBus;
use spimode_core::metrics::ExchangeMetrics;
use spimode_core::peripherals::trace::PinEvent;
use spimode_core::snapshot::MachineSnapshot;
use spimode_core::wait::Bounded;
use spimode_core::{SpiResult, SpiSession, Variant};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a YAML script and check its assertions
    Test(TestArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Firmware build to run
    #[arg(long, value_enum, default_value_t = VariantArg::A)]
    variant: VariantArg,

    /// Byte transmitted on every pass (decimal, 0x.. or 0b..)
    #[arg(long, default_value = "0x01", value_parser = parse_byte_arg)]
    write_data: u8,

    /// Device wired to the SPI pins
    #[arg(long, value_enum, default_value_t = DeviceArg::Loopback)]
    device: DeviceArg,

    /// SPI mode of the echo device (0-3)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=3))]
    device_mode: u8,

    /// Passes of the main loop to execute
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,

    /// Keep looping until the session fails
    #[arg(long, conflicts_with = "iterations")]
    forever: bool,

    /// Polls allowed per transfer before giving up
    #[arg(long, default_value = "10000", value_parser = clap::value_parser!(u64).range(1..))]
    max_polls: u64,

    /// Enable register-level tracing
    #[arg(short, long)]
    trace: bool,

    /// Write a JSON machine snapshot here when the run ends
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Write the recorded pin transitions here as JSON
    #[arg(long)]
    pin_trace: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct TestArgs {
    /// Path to the run script (YAML)
    #[arg(long)]
    script: PathBuf,

    /// Directory that receives result.json
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Enable register-level tracing
    #[arg(short, long)]
    trace: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum VariantArg {
    A,
    B,
}

impl From<VariantArg> for VariantId {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::A => VariantId::A,
            VariantArg::B => VariantId::B,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceArg {
    Loopback,
    Echo,
}

fn parse_byte_arg(s: &str) -> Result<u8, String> {
    spimode_config::parse_byte(s).map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

type Session = SpiSession<SimulatedBus, Bounded>;

fn build_session(
    variant: VariantId,
    write_data: u8,
    device: &DeviceConfig,
    max_polls: u64,
    trace_capacity: Option<usize>,
) -> SpiResult<Session> {
    let bus = SimulatedBus::from_config(device, trace_capacity)?;
    Ok(SpiSession::with_wait(
        bus,
        Bounded::new(max_polls),
        Variant::from(variant),
        write_data,
    ))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let code = match cli.command {
        Some(Commands::Test(args)) => {
            init_tracing(args.trace);
            run_test(&args)
        }
        None => {
            init_tracing(cli.run.trace);
            match run_interactive(&cli.run) {
                Ok(()) => EXIT_PASS,
                Err(e) => {
                    error!("{:#}", e);
                    EXIT_RUNTIME_ERROR
                }
            }
        }
    };
    ExitCode::from(code)
}

fn run_interactive(args: &RunArgs) -> anyhow::Result<()> {
    info!("Starting SpiMode");

    let device = match args.device {
        DeviceArg::Loopback => DeviceConfig::Loopback,
        DeviceArg::Echo => DeviceConfig::Echo {
            mode: args.device_mode,
        },
    };
    let mut session = build_session(
        args.variant.into(),
        args.write_data,
        &device,
        args.max_polls,
        None,
    )?;
    let metrics = Arc::new(ExchangeMetrics::new());
    session.add_observer(metrics.clone());

    session.initialize()?;

    let outcome = if args.forever {
        info!("Running main loop until it fails...");
        session.run().map(|_| ())
    } else {
        info!("Running {} pass(es) of the main loop...", args.iterations);
        session.run_for(args.iterations).map(|_| ())
    };

    info!(
        "Exchanges: {}, polls: {}, last received: {:#04x}, {:.0} exchanges/s",
        metrics.get_exchanges(),
        metrics.get_polls(),
        session.receive_data(),
        metrics.get_exchanges_per_second()
    );

    if let Some(path) = &args.snapshot {
        write_json(path, &MachineSnapshot::capture(&session))?;
        info!("Snapshot written to {:?}", path);
    }
    if let Some(path) = &args.pin_trace {
        let events: Vec<&PinEvent> = session.registers().trace.events().collect();
        write_json(path, &events)?;
        info!("Pin trace written to {:?}", path);
    }

    outcome.context("Session stopped")
}

#[derive(Serialize, Debug)]
struct AssertionResult {
    assertion: RunAssertion,
    passed: bool,
}

#[derive(Serialize, Debug)]
struct TestResult {
    status: &'static str,
    variant: VariantId,
    write_data: u8,
    receive_data: u8,
    iterations: u64,
    polls: u64,
    exchanges_per_second: f64,
    error: Option<String>,
    script_hash: String,
    assertions: Vec<AssertionResult>,
    snapshot: MachineSnapshot,
}

fn evaluate(session: &Session, assertion: &RunAssertion) -> bool {
    let bus = session.registers();
    match assertion {
        RunAssertion::ReceiveData(a) => session.receive_data() == a.receive_data,
        RunAssertion::ChipSelectFraming(a) => {
            bus.trace.chip_select_framing_ok() == a.chip_select_framing
        }
        RunAssertion::SckHz(a) => bus.sck_frequency().map(|f| f.to_Hz()) == Some(a.sck_hz),
    }
}

fn run_test(args: &TestArgs) -> u8 {
    let script = match RunScript::from_file(&args.script) {
        Ok(script) => script,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };
    let script_hash = match std::fs::read(&args.script) {
        Ok(bytes) => format!("{:x}", Sha256::digest(&bytes)),
        Err(e) => {
            error!("Failed to read {:?}: {}", args.script, e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let mut session = match build_session(
        script.variant,
        script.write_data,
        &script.device,
        script.limits.max_polls,
        script.limits.trace_capacity,
    ) {
        Ok(session) => session,
        Err(e) => {
            error!("{}", e);
            return EXIT_CONFIG_ERROR;
        }
    };
    let metrics = Arc::new(ExchangeMetrics::new());
    session.add_observer(metrics.clone());

    let outcome = session
        .initialize()
        .and_then(|_| session.run_for(script.limits.iterations));

    let assertions: Vec<AssertionResult> = script
        .assertions
        .iter()
        .map(|assertion| AssertionResult {
            assertion: assertion.clone(),
            passed: evaluate(&session, assertion),
        })
        .collect();

    let (status, code, error) = match &outcome {
        Err(e) => {
            error!("Run failed: {}", e);
            ("error", EXIT_RUNTIME_ERROR, Some(e.to_string()))
        }
        Ok(_) if assertions.iter().any(|a| !a.passed) => {
            for failed in assertions.iter().filter(|a| !a.passed) {
                error!("Assertion failed: {:?}", failed.assertion);
            }
            ("fail", EXIT_ASSERT_FAIL, None)
        }
        Ok(_) => ("pass", EXIT_PASS, None),
    };
    info!("Result: {}", status);

    if let Some(dir) = &args.output_dir {
        let result = TestResult {
            status,
            variant: script.variant,
            write_data: script.write_data,
            receive_data: session.receive_data(),
            iterations: metrics.get_exchanges(),
            polls: metrics.get_polls(),
            exchanges_per_second: metrics.get_exchanges_per_second(),
            error,
            script_hash,
            assertions,
            snapshot: MachineSnapshot::capture(&session),
        };
        let written = std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))
            .and_then(|_| write_json(&dir.join("result.json"), &result));
        if let Err(e) = written {
            error!("{:#}", e);
            return EXIT_RUNTIME_ERROR;
        }
    }

    code
}
