//! PIC18 memory map and erase selectors
//!
//! All addresses are byte addresses in the 22-bit table-pointer space.
//!
//! ```text
//! 0x000000 - code_memory_size - 1   Code memory
//! 0x200000 - 0x200007               User ID
//! 0x300000 - 0x30000F               Configuration words
//! 0x3C0004 - 0x3C0006               Erase control registers
//! 0x3FFFFE - 0x3FFFFF               Device ID
//! ```

/// First byte of the user ID window
pub const USER_ID: u32 = 0x20_0000;
/// Number of user ID bytes
pub const USER_ID_LEN: usize = 8;
/// First byte of the configuration window
pub const CONFIG: u32 = 0x30_0000;
/// Number of 16-bit configuration slots
pub const CONFIG_WORDS: usize = 8;
/// Low byte of the device ID word
pub const DEVICE_ID: u32 = 0x3F_FFFE;
/// First erase control register (selector bits 7:0)
pub const ERASE_CONTROL: u32 = 0x3C_0004;

/// Mask selecting the device ID bits of the ID word
pub const DEVICE_ID_MASK: u16 = 0xFFE0;
/// Mask selecting the revision bits of the ID word
pub const REVISION_MASK: u16 = 0x001F;

/// Value of an erased code memory word
pub const ERASED_WORD: u16 = 0xFFFF;

/// Byte address of configuration slot `index`
pub const fn config_address(index: usize) -> u32 {
    CONFIG + 2 * index as u32
}

/// Erase targets understood by the erase controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseRegion {
    /// Configuration words
    ConfigBits,
    /// Boot block
    BootBlock,
    /// Data EEPROM
    DataEeprom,
    /// One of the code blocks 0-7
    CodeBlock(u8),
}

impl EraseRegion {
    /// 24-bit selector written to 0x3C0006:0x3C0004
    pub const fn selector(self) -> u32 {
        match self {
            Self::ConfigBits => 0x80_0002,
            Self::BootBlock => 0x80_0005,
            Self::DataEeprom => 0x80_0004,
            Self::CodeBlock(n) => 0x80_0004 | (1u32 << (8 + (n as u32 & 0x7))),
        }
    }

    /// Decode a selector back to the region it erases
    pub fn from_selector(selector: u32) -> Option<Self> {
        match selector & 0xFF_FFFF {
            0x80_0002 => Some(Self::ConfigBits),
            0x80_0005 => Some(Self::BootBlock),
            0x80_0004 => Some(Self::DataEeprom),
            s if s & 0xFF_00FF == 0x80_0004 && (s >> 8 & 0xFF).count_ones() == 1 => {
                Some(Self::CodeBlock((s >> 8 & 0xFF).trailing_zeros() as u8))
            }
            _ => None,
        }
    }
}
