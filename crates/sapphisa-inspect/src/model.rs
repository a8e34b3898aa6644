use serde::Serialize;

use sapphisa::bridge::WindowReport;
use sapphisa::sim::Event;
use sapphisa::{DecodeRange, LpcWord, PortRuns};

/// A raw LPC generic decode register value taken apart.
#[derive(Debug, Clone, Serialize)]
pub struct LpcInspection {
    pub word: LpcWord,
    pub base: u32,
    pub mask: u32,
    pub enabled: bool,
    pub ports: PortRuns,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortsInspection {
    pub range: DecodeRange,
    pub lpc: LpcWord,
    pub isa: [u8; 3],
    pub port_count: usize,
    pub ports: PortRuns,
}

/// What a real run would do, as observed on the simulated chipset.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub windows: Vec<WindowReport>,
    pub events: Vec<Event>,
}
