//! Fixed hardware register map for the Intel LPC controller and the
//! Fintek F85226 LPC-ISA bridge.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// PCI configuration mechanism #1 address port.
pub const PCI_CONFIG_ADDRESS: u16 = 0xCF8;
/// First byte lane of the PCI configuration data window (0xCFC..=0xCFF).
pub const PCI_CONFIG_DATA: u16 = 0xCFC;

/// Super-I/O index port of the bridge.
pub const SIO_INDEX: u16 = 0x4E;
/// Super-I/O data port of the bridge.
pub const SIO_DATA: u16 = 0x4F;

/// Vendor/device ID dword of the LPC controller (bus 0, device 31, function 0).
pub const LPC_ID: u32 = 0x8000_F800;
/// LPC I/O decode ranges / LPC I/O enables dword.
pub const LPC_IO_DECODE: u32 = 0x8000_F880;

/// LPC generic I/O decode range registers, one per window.
pub const LPC_GENERIC_DECODE: [u32; 4] = [0x8000_F884, 0x8000_F888, 0x8000_F88C, 0x8000_F890];

/// Bridge generic decode window registers. Each window is three consecutive
/// indices: mask at `+0`, base low at `+1`, base high at `+2`.
pub const ISA_GENERIC_DECODE: [u8; 4] = [0x20, 0x23, 0x30, 0x33];

pub const INTEL_VENDOR_ID: u32 = 0x8086;
pub const LPC_VENDOR_MASK: u32 = 0x0000_FFFF;

/// Byte written twice to the index port to open the bridge's configuration.
pub const SIO_UNLOCK: u8 = 0x26;

/// Chip ID registers that make up the bridge signature, with the bit position
/// each contributes. Index 0x5C is selected but never read.
pub const BRIDGE_ID_REGS: [(u8, Option<u32>); 5] = [
    (0x5A, Some(24)),
    (0x5B, Some(16)),
    (0x5C, None),
    (0x5D, Some(8)),
    (0x5E, Some(0)),
];
pub const F85226_SIGNATURE: u32 = 0x0305_1934;

bitflags! {
    /// Upper half of the LPC I/O decode dword (`LPC_EN`), as seen in the
    /// dword at [`LPC_IO_DECODE`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LpcIoEnables: u32 {
        const COMA = 1 << 16;
        const COMB = 1 << 17;
        const LPT = 1 << 18;
        const FDD = 1 << 19;
        const GAMEL = 1 << 24;
        const GAMEH = 1 << 25;
        const KBC = 1 << 26;
        const MC = 1 << 27;
        /// 0x2E/0x2F
        const CNF1 = 1 << 28;
        /// 0x4E/0x4F
        const CNF2 = 1 << 29;
    }
}

bitflags! {
    /// Flag bits of an LPC generic decode range register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LpcDecodeFlags: u32 {
        const ENABLE = 1 << 0;
    }
}

/// Bridge register writes applied after the decode windows, in order.
pub const FIXED_SETTINGS: &[(u8, u8)] = &[
    // A17/A18/A19 enable
    (0x05, 0x0E),
    // 8MHz ISA clock, 3 8-bit wait states, 1 16-bit wait state
    (0x06, 0b0101_1101),
    // SYSCLK output
    (0x50, 0x00),
    // power management off; the bridge wants this twice
    (0x51, 0x00),
    (0x51, 0x00),
];

/// Direct port writes that put the legacy DMA and interrupt controllers into
/// a known state. Firmware does not do this for the ISA side.
pub const DMA_RESET: &[(u16, u8)] = &[
    (0x00, 0x00),
    (0x01, 0x00),
    (0x04, 0x00),
    (0x05, 0x00),
    (0x06, 0x00),
    (0x07, 0x00),
    (0x08, 0x00),
    (0x21, 0x00),
    (0x82, 0x00),
    (0x87, 0x00),
    (0x89, 0x00),
    (0x8A, 0x00),
    (0x8B, 0x00),
    (0xC0, 0x00),
    (0xC1, 0x00),
    (0xC2, 0x00),
    (0xC3, 0x00),
    (0xC4, 0x00),
    (0xC5, 0x00),
    (0xC6, 0x00),
    (0xC7, 0x00),
    (0xC8, 0x00),
    (0xC9, 0x00),
    (0xCA, 0x00),
    (0xCB, 0x00),
    (0xCC, 0x00),
    (0xCD, 0x00),
    (0xCE, 0x00),
    (0xCF, 0x00),
    (0xD0, 0x00),
    (0xD1, 0x00),
    (0xDE, 0x0E),
    (0xDF, 0x0E),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnf2_is_the_forwarding_bit() {
        assert_eq!(LpcIoEnables::CNF2.bits(), 0x2000_0000);
    }

    #[test]
    fn tables_line_up() {
        assert_eq!(LPC_GENERIC_DECODE.len(), ISA_GENERIC_DECODE.len());
        for w in LPC_GENERIC_DECODE.windows(2) {
            assert_eq!(w[1] - w[0], 4);
        }
        assert_eq!(DMA_RESET.len(), 33);
    }
}
