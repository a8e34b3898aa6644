use pretty_assertions::assert_eq;
use sapphisa::regs::{
    LpcIoEnables, DMA_RESET, FIXED_SETTINGS, ISA_GENERIC_DECODE, LPC_GENERIC_DECODE, LPC_IO_DECODE,
};
use sapphisa::sim::{Access, Event, ICH9_LPC_ID};
use sapphisa::{BridgeError, BridgeProgram, DecodeRange, ProgramConfig, SimPorts, Stage};

fn four_ranges() -> ProgramConfig {
    ProgramConfig {
        ranges: vec![
            DecodeRange::new(0x200, 0xFC),
            DecodeRange::new(0x300, 0x70),
            DecodeRange::new(0x388, 0x1C),
            DecodeRange::new(0xA00, 0xFC),
        ],
        check_overlap: true,
    }
}

fn is_window_register(index: u8) -> bool {
    ISA_GENERIC_DECODE.iter().any(|&r| (r..r + 3).contains(&index))
}

#[test]
fn programs_four_windows_in_order() {
    let cfg = four_ranges();
    let mut prog = BridgeProgram::new(SimPorts::with_chipset(), cfg.clone()).unwrap();
    let report = prog.run().unwrap();
    assert_eq!(prog.stage(), Stage::Done);
    assert_eq!(report.windows.len(), 4);

    let sim = prog.into_io();
    let lpc_writes: Vec<(u32, u32)> = sim
        .config_writes()
        .into_iter()
        .filter(|(a, _)| LPC_GENERIC_DECODE.contains(a))
        .collect();
    let expected: Vec<(u32, u32)> = LPC_GENERIC_DECODE
        .iter()
        .zip(&cfg.ranges)
        .map(|(&a, r)| (a, r.lpc_word().0))
        .collect();
    assert_eq!(lpc_writes, expected);

    let isa_writes: Vec<(u8, u8)> = sim
        .register_writes()
        .into_iter()
        .filter(|&(i, _)| is_window_register(i))
        .collect();
    assert_eq!(
        isa_writes,
        vec![
            (0x21, 0x00), (0x22, 0x02), (0x20, 0xFF),
            (0x24, 0x00), (0x25, 0x03), (0x23, 0x73),
            (0x31, 0x88), (0x32, 0x03), (0x30, 0x1F),
            (0x34, 0x00), (0x35, 0x0A), (0x33, 0xFF),
        ]
    );
}

#[test]
fn each_lpc_write_precedes_its_bridge_writes() {
    let mut prog = BridgeProgram::new(SimPorts::with_chipset(), four_ranges()).unwrap();
    prog.run().unwrap();
    let events = prog.into_io().events();

    let mut last_seen = 0;
    for (w, (&lpc, &isa)) in LPC_GENERIC_DECODE.iter().zip(&ISA_GENERIC_DECODE).enumerate() {
        let lpc_at = events
            .iter()
            .position(|e| matches!(e, Event::ConfigWrite { address, .. } if *address == lpc))
            .unwrap();
        let isa_at: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Event::RegisterWrite { index, .. } if (isa..isa + 3).contains(index)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(isa_at.len(), 3, "window {w}");
        assert!(lpc_at > last_seen || w == 0, "window {w} out of order");
        assert!(isa_at.iter().all(|&i| i > lpc_at), "window {w}");
        last_seen = *isa_at.last().unwrap();
    }
}

#[test]
fn fewer_ranges_leave_other_windows_alone() {
    let cfg = ProgramConfig { ranges: vec![DecodeRange::new(0x220, 0x0C)], check_overlap: true };
    let mut prog = BridgeProgram::new(SimPorts::with_chipset(), cfg).unwrap();
    prog.run().unwrap();
    let sim = prog.into_io();
    assert_eq!(sim.config_dword(LPC_GENERIC_DECODE[0]), Some(0x000C_0221));
    assert_eq!(sim.config_dword(LPC_GENERIC_DECODE[1]), None);
    assert_eq!(sim.superio_reg(0x20), Some(0x0F));
    assert_eq!(sim.superio_reg(0x23), None);
}

#[test]
fn forwards_bridge_config_port_keeping_other_enables() {
    let mut sim = SimPorts::with_chipset();
    sim.set_config_dword(LPC_IO_DECODE, 0x0000_0010);
    let mut prog = BridgeProgram::new(sim, ProgramConfig::default()).unwrap();
    prog.run().unwrap();
    assert_eq!(
        prog.io().config_dword(LPC_IO_DECODE),
        Some(0x0000_0010 | LpcIoEnables::CNF2.bits())
    );
}

#[test]
fn bridge_signature_skips_index_5c() {
    let mut prog = BridgeProgram::new(SimPorts::with_chipset(), ProgramConfig::default()).unwrap();
    prog.run().unwrap();
    let sim = prog.into_io();
    let reads: Vec<u8> = sim
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::RegisterRead { index, .. } => Some(index),
            _ => None,
        })
        .collect();
    assert_eq!(reads, vec![0x5A, 0x5B, 0x5D, 0x5E]);
    // selected all the same, right after the unlock sequence
    let index_writes: Vec<u8> = sim
        .accesses()
        .iter()
        .filter_map(|a| match *a {
            Access::Out8 { port: 0x4E, val } => Some(val),
            _ => None,
        })
        .take(7)
        .collect();
    assert_eq!(index_writes, vec![0x26, 0x26, 0x5A, 0x5B, 0x5C, 0x5D, 0x5E]);
}

#[test]
fn fixed_settings_then_dma_reset() {
    let mut prog = BridgeProgram::new(SimPorts::with_chipset(), ProgramConfig::default()).unwrap();
    prog.run().unwrap();
    let sim = prog.into_io();

    let writes = sim.register_writes();
    assert_eq!(&writes[writes.len() - FIXED_SETTINGS.len()..], FIXED_SETTINGS);

    let port_writes: Vec<(u16, u8)> = sim
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::PortWrite { port, val } => Some((port, val)),
            _ => None,
        })
        .collect();
    assert_eq!(port_writes, DMA_RESET);
    assert_eq!(sim.config_address(), 0);
}

#[test]
fn missing_lpc_controller_stops_before_any_write() {
    let sim = SimPorts::with_signatures(0x1234_1022, 0x0305_1934);
    let mut prog = BridgeProgram::new(sim, ProgramConfig::default()).unwrap();
    let err = prog.run().unwrap_err();
    assert!(matches!(err, BridgeError::LpcControllerNotFound { got: 0x1234_1022, expected: 0x8086 }));
    assert_eq!(err.to_string(), "Can't find Intel LPC controller (got 0x12341022, expected 0x8086)");
    assert_eq!(prog.stage(), Stage::Failed);

    let sim = prog.into_io();
    assert!(sim.config_writes().is_empty());
    assert!(sim.register_writes().is_empty());
    assert_eq!(sim.accesses().last(), Some(&Access::Out32 { port: 0xCF8, val: 0 }));
    assert_eq!(sim.config_address(), 0);
}

#[test]
fn missing_bridge_stops_before_windows() {
    let sim = SimPorts::with_signatures(ICH9_LPC_ID, 0x0305_1935);
    let mut prog = BridgeProgram::new(sim, ProgramConfig::default()).unwrap();
    let err = prog.run().unwrap_err();
    assert!(matches!(err, BridgeError::BridgeNotFound { got: 0x0305_1935, expected: 0x0305_1934 }));
    assert_eq!(prog.stage(), Stage::Failed);

    let sim = prog.into_io();
    assert!(sim.config_writes().iter().all(|(a, _)| !LPC_GENERIC_DECODE.contains(a)));
    assert!(sim.register_writes().is_empty());
    assert_eq!(sim.accesses().last(), Some(&Access::Out32 { port: 0xCF8, val: 0 }));
}

#[test]
fn empty_chipset_has_no_lpc_controller() {
    let mut prog = BridgeProgram::new(SimPorts::new(), ProgramConfig::default()).unwrap();
    assert!(matches!(
        prog.run(),
        Err(BridgeError::LpcControllerNotFound { got: 0xFFFF_FFFF, .. })
    ));
}
