use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ports::{self, PortRuns};
use crate::regs::LpcDecodeFlags;

/// Address bits 0..=1 never take part in a decode.
pub const DWORD_DONT_CARE: u32 = 0b11;

const LPC_BASE_BITS: u32 = 0xFFFC;
/// Low half of the register as written; bits 1:0 are ignored by the decoder.
const LPC_BASE_FIELD: u32 = 0xFFFF;
const LPC_MASK_BITS: u32 = 0xFC;
const LPC_MASK_SHIFT: u32 = 16;

/// One I/O decode window: a base address plus a mask of "don't care" address
/// bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodeRange {
    pub base: u32,
    pub mask: u32,
}

impl DecodeRange {
    /// Sound Blaster DSP, MPU-401, AdLib and ISA PnP.
    pub const DEFAULTS: [DecodeRange; 4] = [
        // 200-2FF
        DecodeRange::new(0x200, 0xFC),
        // 300/310/.../370, +0..3 each
        DecodeRange::new(0x300, 0x70),
        // 388-38F, 398-39F
        DecodeRange::new(0x388, 0x1C),
        // A00-AFF
        DecodeRange::new(0xA00, 0xFC),
    ];

    pub const fn new(base: u32, mask: u32) -> Self {
        Self { base, mask }
    }

    /// Mask as the hardware applies it, with the DWORD bits forced on.
    pub const fn effective_mask(self) -> u32 {
        self.mask | DWORD_DONT_CARE
    }

    /// Base with every don't-care bit cleared. Two ranges with the same
    /// canonical base and effective mask decode the same ports.
    pub const fn canonical_base(self) -> u32 {
        self.base & !self.effective_mask()
    }

    pub const fn lpc_word(self) -> LpcWord {
        encode_lpc(self.base, self.mask)
    }

    pub const fn isa_bytes(self) -> IsaBytes {
        isa_bytes(self.base, self.mask)
    }

    pub fn ports(self) -> PortRuns {
        ports::expand(self.base, self.mask)
    }

    /// Whether both encodings can carry this range without dropping bits.
    pub const fn fits_hardware(self) -> bool {
        self.base & !(LPC_BASE_BITS | DWORD_DONT_CARE) == 0
            && self.mask & !(LPC_MASK_BITS | DWORD_DONT_CARE) == 0
    }
}

impl fmt::Display for DecodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base {:x}, Mask {:x}", self.base, self.mask)
    }
}

/// Contents of an LPC generic I/O decode register: base address in bits
/// 15:2, enable in bit 0, and a don't-care mask for address bits 7:2 in
/// bits 23:18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LpcWord(pub u32);

impl LpcWord {
    pub const fn base(self) -> u32 {
        self.0 & LPC_BASE_BITS
    }

    pub const fn mask(self) -> u32 {
        (self.0 >> LPC_MASK_SHIFT) & LPC_MASK_BITS
    }

    pub const fn enabled(self) -> bool {
        self.0 & LpcDecodeFlags::ENABLE.bits() != 0
    }

    pub const fn range(self) -> DecodeRange {
        let (base, mask) = decode_lpc(self);
        DecodeRange::new(base, mask)
    }
}

impl fmt::Display for LpcWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::LowerHex for LpcWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Packs a range into the LPC controller's decode register layout. The base
/// is written as given up to bit 15, mask bits the register cannot hold are
/// dropped, and the enable bit is always set.
pub const fn encode_lpc(base: u32, mask: u32) -> LpcWord {
    LpcWord(
        (base & LPC_BASE_FIELD)
            | ((mask & LPC_MASK_BITS) << LPC_MASK_SHIFT)
            | LpcDecodeFlags::ENABLE.bits(),
    )
}

/// Extracts `(base, mask)` from a raw LPC decode register value.
pub const fn decode_lpc(word: LpcWord) -> (u32, u32) {
    (word.base(), word.mask())
}

/// The three bytes a bridge decode window is programmed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsaBytes {
    pub base_lo: u8,
    pub base_hi: u8,
    pub mask: u8,
}

impl IsaBytes {
    /// In the order the bridge expects them written.
    pub const fn to_array(self) -> [u8; 3] {
        [self.base_lo, self.base_hi, self.mask]
    }
}

pub const fn isa_bytes(base: u32, mask: u32) -> IsaBytes {
    IsaBytes {
        base_lo: (base & 0xFF) as u8,
        base_hi: ((base >> 8) & 0xFF) as u8,
        mask: ((mask | DWORD_DONT_CARE) & 0xFF) as u8,
    }
}
