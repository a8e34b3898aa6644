use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use sapphisa::args::{select_ranges, RangeSelection};
use sapphisa::sim::Event;
use sapphisa::DecodeRange;
use sapphisa_inspect::{inspect_lpc, inspect_ports, plan};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode-window inspector for the sapphisa bridge setup", long_about=None)]
struct Cli {
    /// Output format: text or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
    /// Write output to file instead of stdout
    #[arg(long, value_name = "FILE", global = true)]
    out: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a raw LPC generic decode register value
    Lpc {
        /// Register value (hex, `0x` optional)
        word: String,
    },
    /// List the ports a base/mask pair decodes
    Ports {
        base: String,
        mask: String,
    },
    /// Dry-run the full setup on a simulated chipset and print every register access
    Plan {
        /// Up to four `BASE MASK` pairs in hex; anything else selects the defaults
        #[arg(value_name = "BASE MASK")]
        ranges: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat { Text, Json }

fn parse_hex(s: &str) -> Result<u32> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    Ok(u32::from_str_radix(digits, 16)?)
}

fn render<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
        OutputFormat::Text => text(),
    })
}

fn event_line(e: &Event) -> String {
    match *e {
        Event::ConfigRead { address, val } => format!("pci  rd {address:#010x} -> {val:#010x}"),
        Event::ConfigWrite { address, val } => format!("pci  wr {address:#010x} <- {val:#010x}"),
        Event::RegisterRead { index, val } => format!("sio  rd {index:#04x} -> {val:#04x}"),
        Event::RegisterWrite { index, val } => format!("sio  wr {index:#04x} <- {val:#04x}"),
        Event::PortWrite { port, val } => format!("port wr {port:#06x} <- {val:#04x}"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let buf = match cli.cmd {
        Command::Lpc { word } => {
            let i = inspect_lpc(parse_hex(&word)?);
            render(cli.format, &i, || {
                format!("BASE : {:x}\nMASK : {:x}\nEnabled : {}\n{}\n", i.base, i.mask, i.enabled, i.ports)
            })?
        }
        Command::Ports { base, mask } => {
            let p = inspect_ports(DecodeRange::new(parse_hex(&base)?, parse_hex(&mask)?));
            render(cli.format, &p, || {
                format!(
                    "LPC {:x}, ISA {:02x?}, {} ports\n{}\n",
                    p.lpc, p.isa, p.port_count, p.ports
                )
            })?
        }
        Command::Plan { ranges } => {
            let selection = select_ranges(&ranges);
            if let RangeSelection::Defaults(reason) = &selection {
                eprintln!("using default ranges ({reason:?})");
            }
            let plan = plan(selection.into_config())?;
            render(cli.format, &plan, || {
                let mut s = String::new();
                for w in &plan.windows {
                    s += &format!("window {} : {}, LPC {:x}\n  ports {}\n", w.index, w.range, w.lpc, w.ports);
                }
                for e in &plan.events {
                    s += &event_line(e);
                    s.push('\n');
                }
                s
            })?
        }
    };

    if let Some(path) = cli.out { std::fs::write(path, buf)?; } else { print!("{}", buf); }
    Ok(())
}
