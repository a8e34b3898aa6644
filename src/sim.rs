//! A simulated chipset: the PCI configuration mechanism, the bridge's
//! super-I/O register file, and plain ports. Every access is logged.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::io::PortIo;
use crate::regs::{
    BRIDGE_ID_REGS, F85226_SIGNATURE, INTEL_VENDOR_ID, LPC_ID, LPC_IO_DECODE, PCI_CONFIG_ADDRESS, PCI_CONFIG_DATA,
    SIO_DATA, SIO_INDEX,
};

const CONFIG_ENABLE: u32 = 1 << 31;
const FLOATING: u8 = 0xFF;

/// ICH9 LPC interface, vendor in the low half.
pub const ICH9_LPC_ID: u32 = 0x2918_0000 | INTEL_VENDOR_ID;

/// One raw port access, in the order it was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Access {
    In8 { port: u16, val: u8 },
    In32 { port: u16, val: u32 },
    Out8 { port: u16, val: u8 },
    Out32 { port: u16, val: u32 },
}

/// Accesses folded back into the register-level operations they perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Event {
    ConfigRead { address: u32, val: u32 },
    ConfigWrite { address: u32, val: u32 },
    RegisterRead { index: u8, val: u8 },
    RegisterWrite { index: u8, val: u8 },
    PortWrite { port: u16, val: u8 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimPorts {
    config_address: u32,
    config: BTreeMap<u32, u32>,
    sio_index: u8,
    sio: BTreeMap<u8, u8>,
    ports: BTreeMap<u16, u8>,
    log: Vec<Access>,
}

impl SimPorts {
    /// Empty chipset: nothing answers, reads float high.
    pub fn new() -> Self {
        Self::default()
    }

    /// An ICH9 LPC controller with an F85226 bridge behind it.
    pub fn with_chipset() -> Self {
        Self::with_signatures(ICH9_LPC_ID, F85226_SIGNATURE)
    }

    /// A chipset whose LPC ID dword and bridge chip ID registers hold the
    /// given values.
    pub fn with_signatures(lpc_id: u32, bridge_signature: u32) -> Self {
        let mut sim = Self::new();
        sim.set_config_dword(LPC_ID, lpc_id);
        sim.set_config_dword(LPC_IO_DECODE, 0);
        for (index, shift) in BRIDGE_ID_REGS {
            let val = match shift {
                Some(shift) => (bridge_signature >> shift) as u8,
                None => FLOATING,
            };
            sim.sio.insert(index, val);
        }
        sim
    }

    pub fn set_config_dword(&mut self, address: u32, val: u32) {
        self.config.insert(address & !3, val);
    }

    pub fn config_dword(&self, address: u32) -> Option<u32> {
        self.config.get(&(address & !3)).copied()
    }

    pub fn superio_reg(&self, index: u8) -> Option<u8> {
        self.sio.get(&index).copied()
    }

    /// Last value written to a plain port.
    pub fn port(&self, port: u16) -> Option<u8> {
        self.ports.get(&port).copied()
    }

    /// Current value of the configuration address latch.
    pub fn config_address(&self) -> u32 {
        self.config_address
    }

    pub fn accesses(&self) -> &[Access] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn events(&self) -> Vec<Event> {
        let mut out = Vec::new();
        let mut latch = 0u32;
        let mut index = 0u8;
        let mut pending: Option<(u32, [u8; 4])> = None;
        for access in &self.log {
            match *access {
                Access::Out32 { port: PCI_CONFIG_ADDRESS, val } => {
                    if let Some((address, lanes)) = pending.take() {
                        out.push(Event::ConfigWrite { address, val: u32::from_le_bytes(lanes) });
                    }
                    latch = val;
                }
                Access::In32 { port: PCI_CONFIG_DATA, val } => {
                    out.push(Event::ConfigRead { address: latch, val });
                }
                Access::Out8 { port, val } if is_config_lane(port) => {
                    let (_, lanes) = pending.get_or_insert((latch, [0; 4]));
                    lanes[usize::from(port - PCI_CONFIG_DATA)] = val;
                }
                Access::Out8 { port: SIO_INDEX, val } => index = val,
                Access::Out8 { port: SIO_DATA, val } => out.push(Event::RegisterWrite { index, val }),
                Access::In8 { port: SIO_DATA, val } => out.push(Event::RegisterRead { index, val }),
                Access::Out8 { port, val } => out.push(Event::PortWrite { port, val }),
                Access::In8 { .. } | Access::In32 { .. } | Access::Out32 { .. } => {}
            }
        }
        if let Some((address, lanes)) = pending {
            out.push(Event::ConfigWrite { address, val: u32::from_le_bytes(lanes) });
        }
        out
    }

    /// Completed configuration dword writes, in order.
    pub fn config_writes(&self) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ConfigWrite { address, val } => Some((address, val)),
                _ => None,
            })
            .collect()
    }

    /// Super-I/O register writes, in order.
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RegisterWrite { index, val } => Some((index, val)),
                _ => None,
            })
            .collect()
    }

    fn config_enabled(&self) -> bool {
        self.config_address & CONFIG_ENABLE != 0
    }
}

fn is_config_lane(port: u16) -> bool {
    (PCI_CONFIG_DATA..PCI_CONFIG_DATA + 4).contains(&port)
}

impl PortIo for SimPorts {
    fn read_u8(&mut self, port: u16) -> Result<u8> {
        let val = match port {
            SIO_DATA => self.sio.get(&self.sio_index).copied().unwrap_or(FLOATING),
            p if is_config_lane(p) && self.config_enabled() => {
                let dword = self.config_dword(self.config_address).unwrap_or(u32::MAX);
                dword.to_le_bytes()[usize::from(p - PCI_CONFIG_DATA)]
            }
            p => self.ports.get(&p).copied().unwrap_or(FLOATING),
        };
        self.log.push(Access::In8 { port, val });
        Ok(val)
    }

    fn read_u32(&mut self, port: u16) -> Result<u32> {
        let val = match port {
            PCI_CONFIG_ADDRESS => self.config_address,
            PCI_CONFIG_DATA if self.config_enabled() => {
                self.config_dword(self.config_address).unwrap_or(u32::MAX)
            }
            _ => u32::MAX,
        };
        self.log.push(Access::In32 { port, val });
        Ok(val)
    }

    fn write_u8(&mut self, port: u16, val: u8) -> Result<()> {
        self.log.push(Access::Out8 { port, val });
        match port {
            SIO_INDEX => self.sio_index = val,
            SIO_DATA => {
                self.sio.insert(self.sio_index, val);
            }
            p if is_config_lane(p) => {
                if self.config_enabled() {
                    let address = self.config_address & !3;
                    let mut lanes = self.config.get(&address).copied().unwrap_or(0).to_le_bytes();
                    lanes[usize::from(p - PCI_CONFIG_DATA)] = val;
                    self.config.insert(address, u32::from_le_bytes(lanes));
                }
            }
            p => {
                self.ports.insert(p, val);
            }
        }
        Ok(())
    }

    fn write_u32(&mut self, port: u16, val: u32) -> Result<()> {
        self.log.push(Access::Out32 { port, val });
        if port == PCI_CONFIG_ADDRESS {
            self.config_address = val;
        }
        Ok(())
    }
}
