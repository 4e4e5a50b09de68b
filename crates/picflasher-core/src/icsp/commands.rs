//! 4-bit ICSP commands and PIC18 core instruction encoders
//!
//! Core instructions are shifted in as the 16-bit operand of
//! [`Command::CoreInstruction`] and executed by the target CPU.

use bitflags::bitflags;

/// 4-bit command prefixes of the PIC18 ICSP protocol
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Execute the 16-bit operand as a core instruction
    CoreInstruction = 0x0,
    /// Shift out the TABLAT register
    ShiftOutTablat = 0x2,
    /// Table read
    TableRead = 0x8,
    /// Table read, post-increment
    TableReadPostInc = 0x9,
    /// Table read, post-decrement
    TableReadPostDec = 0xA,
    /// Table read, pre-increment
    TableReadPreInc = 0xB,
    /// Table write
    TableWrite = 0xC,
    /// Table write, post-increment by 2
    TableWritePostInc2 = 0xD,
    /// Table write, start programming, post-increment by 2
    TableWriteStartPPostInc2 = 0xE,
    /// Table write, start programming
    TableWriteStartP = 0xF,
}

impl Command {
    /// Decode a 4-bit command as clocked in by the target
    pub fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits & 0x0F {
            0x0 => Self::CoreInstruction,
            0x2 => Self::ShiftOutTablat,
            0x8 => Self::TableRead,
            0x9 => Self::TableReadPostInc,
            0xA => Self::TableReadPostDec,
            0xB => Self::TableReadPreInc,
            0xC => Self::TableWrite,
            0xD => Self::TableWritePostInc2,
            0xE => Self::TableWriteStartPPostInc2,
            0xF => Self::TableWriteStartP,
            _ => return None,
        })
    }

    /// Whether the target answers this command with a data byte
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::ShiftOutTablat
                | Self::TableRead
                | Self::TableReadPostInc
                | Self::TableReadPostDec
                | Self::TableReadPreInc
        )
    }
}

/// Special function register addresses (access bank)
pub mod sfr {
    /// Table pointer upper byte
    pub const TBLPTRU: u8 = 0xF8;
    /// Table pointer high byte
    pub const TBLPTRH: u8 = 0xF7;
    /// Table pointer low byte
    pub const TBLPTRL: u8 = 0xF6;
    /// Table latch
    pub const TABLAT: u8 = 0xF5;
    /// Data EEPROM address low byte
    pub const EEADR: u8 = 0x74;
    /// Data EEPROM address high byte
    pub const EEADRH: u8 = 0x75;
    /// Data EEPROM data register
    pub const EEDATA: u8 = 0x73;
    /// Memory control register
    pub const EECON1: u8 = 0x7F;
}

bitflags! {
    /// EECON1 memory control bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Eecon1: u8 {
        /// Read data EEPROM
        const RD    = 1 << 0;
        /// Write control / busy
        const WR    = 1 << 1;
        /// Write enable
        const WREN  = 1 << 2;
        /// Write error
        const WRERR = 1 << 3;
        /// Row erase enable
        const FREE  = 1 << 4;
        /// Configuration space select
        const CFGS  = 1 << 6;
        /// Flash program (vs. data EEPROM) select
        const EEPGD = 1 << 7;
    }
}

impl Eecon1 {
    /// Bit position of a single flag
    pub fn bit_index(self) -> u8 {
        self.bits().trailing_zeros() as u8
    }
}

/// Core instruction encoders
pub mod insn {
    use super::{sfr, Eecon1};

    /// `NOP`
    pub const NOP: u16 = 0x0000;

    /// `MOVLW k`
    pub const fn movlw(k: u8) -> u16 {
        0x0E00 | k as u16
    }

    /// `MOVWF f, ACCESS`
    pub const fn movwf(f: u8) -> u16 {
        0x6E00 | f as u16
    }

    /// `MOVF f, W, ACCESS`
    pub const fn movf_w(f: u8) -> u16 {
        0x5000 | f as u16
    }

    /// `BSF f, b, ACCESS`
    pub const fn bsf(f: u8, bit: u8) -> u16 {
        0x8000 | ((bit as u16 & 0x7) << 9) | f as u16
    }

    /// `BCF f, b, ACCESS`
    pub const fn bcf(f: u8, bit: u8) -> u16 {
        0x9000 | ((bit as u16 & 0x7) << 9) | f as u16
    }

    /// `BSF EECON1, <flag>`
    pub fn set_eecon1(flag: Eecon1) -> u16 {
        bsf(sfr::EECON1, flag.bit_index())
    }

    /// `BCF EECON1, <flag>`
    pub fn clear_eecon1(flag: Eecon1) -> u16 {
        bcf(sfr::EECON1, flag.bit_index())
    }
}
