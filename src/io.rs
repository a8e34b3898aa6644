use anyhow::Result;
use tracing::debug;

use crate::regs::{PCI_CONFIG_ADDRESS, PCI_CONFIG_DATA, SIO_DATA, SIO_INDEX};

/// x86 I/O port space.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> Result<u8>;
    fn read_u32(&mut self, port: u16) -> Result<u32>;
    fn write_u8(&mut self, port: u16, val: u8) -> Result<()>;
    fn write_u32(&mut self, port: u16, val: u32) -> Result<()>;
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn read_u8(&mut self, port: u16) -> Result<u8> {
        (**self).read_u8(port)
    }
    fn read_u32(&mut self, port: u16) -> Result<u32> {
        (**self).read_u32(port)
    }
    fn write_u8(&mut self, port: u16, val: u8) -> Result<()> {
        (**self).write_u8(port, val)
    }
    fn write_u32(&mut self, port: u16, val: u32) -> Result<()> {
        (**self).write_u32(port, val)
    }
}

/// Reads a configuration dword through mechanism #1. The address port is
/// parked at 0 afterwards.
pub fn pci_read<P: PortIo + ?Sized>(io: &mut P, address: u32) -> Result<u32> {
    io.write_u32(PCI_CONFIG_ADDRESS, address)?;
    let val = io.read_u32(PCI_CONFIG_DATA)?;
    io.write_u32(PCI_CONFIG_ADDRESS, 0)?;
    debug!("pci read {address:#010x} -> {val:#010x}");
    Ok(val)
}

/// Writes a configuration dword one byte lane at a time, low lane first.
pub fn pci_write<P: PortIo + ?Sized>(io: &mut P, address: u32, val: u32) -> Result<()> {
    debug!("pci write {address:#010x} <- {val:#010x}");
    io.write_u32(PCI_CONFIG_ADDRESS, address)?;
    for (lane, byte) in (0u16..).zip(val.to_le_bytes()) {
        io.write_u8(PCI_CONFIG_DATA + lane, byte)?;
    }
    io.write_u32(PCI_CONFIG_ADDRESS, 0)
}

/// Index/data access to a super-I/O style register file.
pub struct SuperIo<'a, P: PortIo + ?Sized> {
    io: &'a mut P,
}

impl<'a, P: PortIo + ?Sized> SuperIo<'a, P> {
    pub fn new(io: &'a mut P) -> Self {
        Self { io }
    }

    pub fn select(&mut self, index: u8) -> Result<()> {
        self.io.write_u8(SIO_INDEX, index)
    }

    pub fn read(&mut self, index: u8) -> Result<u8> {
        self.select(index)?;
        self.io.read_u8(SIO_DATA)
    }

    pub fn write(&mut self, index: u8, val: u8) -> Result<()> {
        debug!("sio write {index:#04x} <- {val:#04x}");
        self.select(index)?;
        self.io.write_u8(SIO_DATA, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Access, SimPorts};

    #[test]
    fn pci_write_splits_into_lanes() {
        let mut sim = SimPorts::new();
        pci_write(&mut sim, 0x8000_F884, 0x00FC_0201).unwrap();
        assert_eq!(
            sim.accesses(),
            &[
                Access::Out32 { port: 0xCF8, val: 0x8000_F884 },
                Access::Out8 { port: 0xCFC, val: 0x01 },
                Access::Out8 { port: 0xCFD, val: 0x02 },
                Access::Out8 { port: 0xCFE, val: 0xFC },
                Access::Out8 { port: 0xCFF, val: 0x00 },
                Access::Out32 { port: 0xCF8, val: 0 },
            ]
        );
        assert_eq!(sim.config_dword(0x8000_F884), Some(0x00FC_0201));
    }

    #[test]
    fn pci_read_parks_address() {
        let mut sim = SimPorts::new();
        sim.set_config_dword(0x8000_F800, 0x2918_8086);
        assert_eq!(pci_read(&mut sim, 0x8000_F800).unwrap(), 0x2918_8086);
        assert_eq!(sim.accesses().last(), Some(&Access::Out32 { port: 0xCF8, val: 0 }));
    }

    #[test]
    fn superio_round_trip() {
        let mut sim = SimPorts::new();
        let mut sio = SuperIo::new(&mut sim);
        sio.write(0x21, 0x88).unwrap();
        assert_eq!(sio.read(0x21).unwrap(), 0x88);
        assert_eq!(sim.superio_reg(0x21), Some(0x88));
    }
}
