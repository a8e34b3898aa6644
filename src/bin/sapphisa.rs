use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sapphisa::args::{select_ranges, RangeSelection};
use sapphisa::hw::RawPorts;
use sapphisa::bridge::WindowReport;
use sapphisa::{BridgeError, BridgeProgram, PortIo, ProgramConfig, ProgramReport, SimPorts, Stage};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Forward legacy I/O ranges through an Intel LPC controller to a Fintek F85226 LPC-ISA bridge"
)]
struct Opts {
    /// Run against a simulated chipset instead of the real port space
    #[arg(long)]
    dry_run: bool,
    /// Print the programmed windows as JSON
    #[arg(long)]
    json: bool,
    /// Up to four `BASE MASK` pairs in hex; anything else selects the defaults
    #[arg(value_name = "BASE MASK", allow_hyphen_values = true)]
    ranges: Vec<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let selection = select_ranges(&opts.ranges);
    if let RangeSelection::Defaults(reason) = &selection {
        warn!(?reason, "using default ranges");
        if !opts.json {
            println!("Malformed args, using defaults");
        }
    }
    let cfg = selection.into_config();

    let verbose = !opts.json;
    let outcome = if opts.dry_run {
        program(SimPorts::with_chipset(), cfg, verbose)?
    } else {
        program(RawPorts::acquire()?, cfg, verbose)?
    };

    match outcome {
        Ok(report) => {
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{e}");
            Ok(ExitCode::from(1))
        }
    }
}

/// Detection failures are an expected outcome; anything else is an error.
/// With `verbose` each stage is reported as soon as it completes.
fn program<P: PortIo>(io: P, cfg: ProgramConfig, verbose: bool) -> Result<Result<ProgramReport, BridgeError>> {
    let mut prog = BridgeProgram::new(io, cfg)?;
    let run = prog.run_with(|stage, report| {
        if verbose {
            if let Some(line) = stage_text(stage, report) {
                println!("{line}");
            }
        }
    });
    match run {
        Ok(report) => Ok(Ok(report)),
        Err(e @ (BridgeError::LpcControllerNotFound { .. } | BridgeError::BridgeNotFound { .. })) => Ok(Err(e)),
        Err(e) => Err(e.into()),
    }
}

fn stage_text(stage: Stage, report: &ProgramReport) -> Option<String> {
    match stage {
        Stage::DetectLpc => Some("Found Intel LPC Controller.".to_string()),
        Stage::DetectBridge => Some("Found Fintek F85226FG LPC-ISA Bridge".to_string()),
        Stage::ProgramWindow(i) => report.windows.get(i).map(window_text),
        _ => None,
    }
}

fn window_text(w: &WindowReport) -> String {
    format!(
        "Enabling Range {:x} : Base {:x}, Mask {:x}, LPC {:x}\nPorts : {}\n",
        w.index, w.range.base, w.range.mask, w.lpc, w.ports
    )
}
