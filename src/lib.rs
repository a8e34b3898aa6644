pub mod args;
pub mod bridge;
pub mod hw;
pub mod io;
pub mod ports;
pub mod range;
pub mod regs;
pub mod sim;

pub use bridge::{BridgeError, BridgeProgram, ProgramConfig, ProgramReport, Stage};
pub use io::PortIo;
pub use ports::{PortRun, PortRuns};
pub use range::{decode_lpc, encode_lpc, isa_bytes, DecodeRange, IsaBytes, LpcWord};
pub use sim::SimPorts;
