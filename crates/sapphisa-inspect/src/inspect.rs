use anyhow::Result;

use sapphisa::{decode_lpc, BridgeProgram, DecodeRange, LpcWord, ProgramConfig, SimPorts};

use crate::model::{LpcInspection, Plan, PortsInspection};

pub fn inspect_lpc(word: u32) -> LpcInspection {
    let word = LpcWord(word);
    let (base, mask) = decode_lpc(word);
    LpcInspection {
        word,
        base,
        mask,
        enabled: word.enabled(),
        ports: word.range().ports(),
    }
}

pub fn inspect_ports(range: DecodeRange) -> PortsInspection {
    let ports = range.ports();
    PortsInspection {
        range,
        lpc: range.lpc_word(),
        isa: range.isa_bytes().to_array(),
        port_count: ports.len_ports(),
        ports,
    }
}

/// Runs the whole setup against a simulated chipset and records every
/// register-level operation it performs.
pub fn plan(cfg: ProgramConfig) -> Result<Plan> {
    let mut prog = BridgeProgram::new(SimPorts::with_chipset(), cfg)?;
    let report = prog.run()?;
    Ok(Plan {
        windows: report.windows,
        events: prog.into_io().events(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sapphisa::sim::Event;

    #[test]
    fn lpc_word_round_trip() {
        let i = inspect_lpc(0x001C_0389);
        assert_eq!((i.base, i.mask), (0x388, 0x1C));
        assert!(i.enabled);
        assert_eq!(i.ports.to_string(), "380-39F");
    }

    #[test]
    fn ports_summary() {
        let p = inspect_ports(DecodeRange::new(0xA00, 0xFC));
        assert_eq!(p.port_count, 0x100);
        assert_eq!(p.isa, [0x00, 0x0A, 0xFF]);
        assert_eq!(p.lpc, LpcWord(0x00FC_0A01));
    }

    #[test]
    fn plan_ends_with_dma_reset() {
        let plan = plan(ProgramConfig::default()).unwrap();
        assert_eq!(plan.windows.len(), 4);
        assert_eq!(plan.events.last(), Some(&Event::PortWrite { port: 0xDF, val: 0x0E }));
    }
}
