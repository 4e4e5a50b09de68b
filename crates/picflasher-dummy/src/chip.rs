//! Emulated PIC18 K80 internals
//!
//! Models the CPU registers reachable over ICSP (W, TBLPTR, TABLAT, EEADR,
//! EEDATA, EECON1), the code memory write buffer, the erase controller and
//! the non-volatile memories.

use picflasher_core::chip::address::{
    EraseRegion, CONFIG, CONFIG_WORDS, DEVICE_ID, ERASE_CONTROL, USER_ID, USER_ID_LEN,
};
use picflasher_core::icsp::commands::{sfr, Command, Eecon1};
use picflasher_core::icsp::timing;

use crate::{DummyConfig, Stats};

/// Bytes of configuration space (8 words)
pub(crate) const CONFIG_BYTES: usize = CONFIG_WORDS * 2;

const TBLPTR_MASK: u32 = 0x3F_FFFF;

/// Write staged by a start-programming command, committed by the pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    CodeRow { base: u32 },
    ConfigByte { offset: usize, value: u8 },
}

#[derive(Debug)]
pub(crate) struct Chip {
    pub(crate) config: DummyConfig,
    pub(crate) code: Vec<u8>,
    pub(crate) config_bytes: [u8; CONFIG_BYTES],
    pub(crate) user_id: [u8; USER_ID_LEN],
    pub(crate) eeprom: Vec<u8>,
    pub(crate) stats: Stats,

    w: u8,
    tblptr: u32,
    tablat: u8,
    eeadr: u16,
    eedata: u8,
    eecon1: Eecon1,
    busy_left: u32,

    buffer: Vec<u8>,
    pending: Option<Commit>,
    erase_regs: [u8; 3],
    erase_armed: bool,
}

impl Chip {
    pub(crate) fn new(config: DummyConfig) -> Self {
        Self {
            code: vec![0xFF; config.code_memory_size as usize],
            config_bytes: [0xFF; CONFIG_BYTES],
            user_id: [0xFF; USER_ID_LEN],
            eeprom: vec![0xFF; config.eeprom_size as usize],
            buffer: vec![0xFF; config.write_buffer_size.max(2) as usize],
            stats: Stats::default(),
            w: 0,
            tblptr: 0,
            tablat: 0,
            eeadr: 0,
            eedata: 0,
            eecon1: Eecon1::empty(),
            busy_left: 0,
            pending: None,
            erase_regs: [0; 3],
            erase_armed: false,
            config,
        }
    }

    /// Programming mode was left; volatile state is lost
    pub(crate) fn reset(&mut self) {
        self.w = 0;
        self.tblptr = 0;
        self.tablat = 0;
        self.eecon1 = Eecon1::empty();
        self.busy_left = 0;
        self.buffer.fill(0xFF);
        self.pending = None;
        self.erase_armed = false;
    }

    /// A 4-bit command was clocked in
    ///
    /// `high_us` is how long PGC was held high for the last command bit,
    /// which is where a pending programming operation gets its pulse.
    /// Returns the byte to shift out for read commands.
    pub(crate) fn on_command(&mut self, cmd: Command, high_us: u64) -> Option<u8> {
        if let Some(commit) = self.pending.take() {
            self.finish_programming(commit, cmd, high_us);
        }

        let value = match cmd {
            Command::ShiftOutTablat => self.tablat,
            Command::TableRead => self.table_read(0, 0),
            Command::TableReadPostInc => self.table_read(0, 1),
            Command::TableReadPostDec => self.table_read(0, -1),
            Command::TableReadPreInc => self.table_read(1, 0),
            _ => return None,
        };
        Some(value)
    }

    /// The operand of a write-type command was clocked in
    pub(crate) fn on_operand(&mut self, cmd: Command, operand: u16) {
        match cmd {
            Command::CoreInstruction => self.execute(operand),
            Command::TableWrite => self.table_write_byte(operand),
            Command::TableWritePostInc2 => {
                self.stage_word(operand);
                self.advance(2);
            }
            Command::TableWriteStartPPostInc2 => {
                self.stage_word(operand);
                self.pending = Some(Commit::CodeRow {
                    base: self.row_base(),
                });
                self.advance(2);
            }
            Command::TableWriteStartP => self.start_programming_in_place(operand),
            _ => self.protocol_error(format_args!("operand for read command {:?}", cmd)),
        }
    }

    fn protocol_error(&mut self, what: core::fmt::Arguments<'_>) {
        log::warn!("dummy: protocol error: {}", what);
        self.stats.protocol_errors += 1;
    }

    // ---------------------------------------------------------------------
    // Core instructions
    // ---------------------------------------------------------------------

    fn execute(&mut self, op: u16) {
        self.stats.instructions += 1;
        let f = op as u8;
        let bit = ((op >> 9) & 0x7) as u8;
        match op {
            0x0000 => self.nop(),
            _ if op & 0xFF00 == 0x0E00 => self.w = f,
            _ if op & 0xFF00 == 0x6E00 => self.write_reg(f, self.w),
            _ if op & 0xFF00 == 0x5000 => self.w = self.read_reg(f),
            _ if op & 0xF100 == 0x8000 => {
                let value = self.peek_reg(f) | (1 << bit);
                self.write_reg(f, value);
            }
            _ if op & 0xF100 == 0x9000 => {
                let value = self.peek_reg(f) & !(1 << bit);
                self.write_reg(f, value);
            }
            _ => self.protocol_error(format_args!("unsupported opcode 0x{:04X}", op)),
        }
    }

    fn nop(&mut self) {
        if self.erase_armed {
            self.erase_armed = false;
            self.run_erase();
        }
    }

    /// Register value without read side effects
    fn peek_reg(&self, f: u8) -> u8 {
        match f {
            sfr::TBLPTRU => (self.tblptr >> 16) as u8,
            sfr::TBLPTRH => (self.tblptr >> 8) as u8,
            sfr::TBLPTRL => self.tblptr as u8,
            sfr::TABLAT => self.tablat,
            sfr::EEADR => self.eeadr as u8,
            sfr::EEADRH => (self.eeadr >> 8) as u8,
            sfr::EEDATA => self.eedata,
            sfr::EECON1 => self.eecon1.bits(),
            _ => 0,
        }
    }

    fn read_reg(&mut self, f: u8) -> u8 {
        let value = self.peek_reg(f);
        if f == sfr::EECON1 {
            self.stats.eeprom_polls += 1;
            self.tick_eeprom_write();
        } else if !is_known_reg(f) {
            self.protocol_error(format_args!("read of unmodelled register 0x{:02X}", f));
        }
        value
    }

    fn write_reg(&mut self, f: u8, value: u8) {
        match f {
            sfr::TBLPTRU => {
                self.tblptr = (self.tblptr & 0x00_FFFF) | ((value as u32) << 16) & TBLPTR_MASK
            }
            sfr::TBLPTRH => self.tblptr = (self.tblptr & 0xFF_00FF) | (value as u32) << 8,
            sfr::TBLPTRL => self.tblptr = (self.tblptr & 0xFF_FF00) | value as u32,
            sfr::TABLAT => self.tablat = value,
            sfr::EEADR => self.eeadr = (self.eeadr & 0xFF00) | value as u16,
            sfr::EEADRH => self.eeadr = (self.eeadr & 0x00FF) | (value as u16) << 8,
            sfr::EEDATA => self.eedata = value,
            sfr::EECON1 => self.write_eecon1(Eecon1::from_bits_retain(value)),
            _ => self.protocol_error(format_args!("write of unmodelled register 0x{:02X}", f)),
        }
    }

    fn write_eecon1(&mut self, mut value: Eecon1) {
        let old = self.eecon1;
        // WR can only be cleared by hardware
        if old.contains(Eecon1::WR) {
            value |= Eecon1::WR;
        }
        let rising = value & !old;
        self.eecon1 = value;

        if rising.contains(Eecon1::RD) {
            self.eecon1.remove(Eecon1::RD);
            if self.eecon1.intersects(Eecon1::EEPGD | Eecon1::CFGS) {
                self.protocol_error(format_args!("EEPROM read with EEPGD/CFGS set"));
            } else {
                self.eedata = self.eeprom_cell(self.eeadr);
            }
        }

        if rising.contains(Eecon1::WR) {
            self.start_eeprom_write();
        }
    }

    fn eeprom_cell(&self, addr: u16) -> u8 {
        self.eeprom.get(addr as usize).copied().unwrap_or(0)
    }

    fn start_eeprom_write(&mut self) {
        if !self.eecon1.contains(Eecon1::WREN)
            || self.eecon1.intersects(Eecon1::EEPGD | Eecon1::CFGS)
        {
            self.eecon1.remove(Eecon1::WR);
            self.eecon1.insert(Eecon1::WRERR);
            self.protocol_error(format_args!("EEPROM write without WREN or with EEPGD/CFGS"));
            return;
        }
        let addr = self.eeadr as usize;
        match self.eeprom.get_mut(addr) {
            Some(cell) => *cell = self.eedata,
            None => self.stats.protocol_errors += 1,
        }
        self.stats.eeprom_writes += 1;
        self.busy_left = self.config.eeprom_busy_polls;
        if self.busy_left == 0 && !self.config.eeprom_stuck {
            self.eecon1.remove(Eecon1::WR);
        }
    }

    fn tick_eeprom_write(&mut self) {
        if !self.eecon1.contains(Eecon1::WR) || self.config.eeprom_stuck {
            return;
        }
        self.busy_left = self.busy_left.saturating_sub(1);
        if self.busy_left == 0 {
            self.eecon1.remove(Eecon1::WR);
        }
    }

    // ---------------------------------------------------------------------
    // Table access
    // ---------------------------------------------------------------------

    fn advance(&mut self, delta: i32) {
        self.tblptr = (self.tblptr as i64 + delta as i64) as u32 & TBLPTR_MASK;
    }

    fn table_read(&mut self, pre: i32, post: i32) -> u8 {
        self.advance(pre);
        self.tablat = self.table_byte(self.tblptr);
        self.advance(post);
        self.stats.table_reads += 1;
        self.tablat
    }

    /// Byte as seen by TBLRD; unimplemented locations read as zero
    fn table_byte(&self, addr: u32) -> u8 {
        if let Some(byte) = self.code.get(addr as usize) {
            return *byte;
        }
        let id = self.config.device_id.to_le_bytes();
        match addr {
            a if (USER_ID..USER_ID + USER_ID_LEN as u32).contains(&a) => {
                self.user_id[(a - USER_ID) as usize]
            }
            a if (CONFIG..CONFIG + CONFIG_BYTES as u32).contains(&a) => {
                self.config_bytes[(a - CONFIG) as usize]
            }
            a if a == DEVICE_ID => id[0],
            a if a == DEVICE_ID + 1 => id[1],
            a if (ERASE_CONTROL..ERASE_CONTROL + 3).contains(&a) => {
                self.erase_regs[(a - ERASE_CONTROL) as usize]
            }
            _ => 0,
        }
    }

    /// Byte-wide writes take the operand half matching the pointer parity
    fn operand_byte(&self, operand: u16) -> u8 {
        let [low, high] = operand.to_le_bytes();
        if self.tblptr & 1 == 0 {
            low
        } else {
            high
        }
    }

    fn table_write_byte(&mut self, operand: u16) {
        let byte = self.operand_byte(operand);
        let addr = self.tblptr;
        if (ERASE_CONTROL..ERASE_CONTROL + 3).contains(&addr) {
            self.erase_regs[(addr - ERASE_CONTROL) as usize] = byte;
            if addr == ERASE_CONTROL + 2 {
                self.erase_armed = true;
            }
        } else if (addr as usize) < self.code.len() {
            let offset = addr as usize % self.buffer.len();
            self.buffer[offset] = byte;
        } else {
            self.protocol_error(format_args!("table write to 0x{:06X}", addr));
        }
    }

    fn row_base(&self) -> u32 {
        self.tblptr & !(self.buffer.len() as u32 - 1)
    }

    fn stage_word(&mut self, operand: u16) {
        let addr = self.tblptr;
        if addr as usize >= self.code.len() || addr & 1 != 0 {
            self.protocol_error(format_args!("buffer write at 0x{:06X}", addr));
            return;
        }
        let offset = addr as usize % self.buffer.len();
        let [low, high] = operand.to_le_bytes();
        self.buffer[offset] = low;
        self.buffer[offset + 1] = high;
    }

    fn start_programming_in_place(&mut self, operand: u16) {
        let addr = self.tblptr;
        if (CONFIG..CONFIG + CONFIG_BYTES as u32).contains(&addr) {
            self.pending = Some(Commit::ConfigByte {
                offset: (addr - CONFIG) as usize,
                value: self.operand_byte(operand),
            });
        } else if (addr as usize) < self.code.len() {
            self.stage_word(operand);
            self.pending = Some(Commit::CodeRow {
                base: self.row_base(),
            });
        } else {
            self.protocol_error(format_args!("start programming at 0x{:06X}", addr));
        }
    }

    /// Commit a staged write if the following command carried a long enough
    /// fourth clock
    fn finish_programming(&mut self, commit: Commit, cmd: Command, high_us: u64) {
        let required = u64::from(match commit {
            Commit::CodeRow { .. } => timing::P9,
            Commit::ConfigByte { .. } => timing::P9A,
        });
        if cmd != Command::CoreInstruction || high_us < required {
            log::warn!(
                "dummy: programming pulse too short ({} us < {} us), write dropped",
                high_us,
                required
            );
            self.stats.short_pulses += 1;
            self.buffer.fill(0xFF);
            return;
        }

        let eecon1 = self.eecon1;
        match commit {
            Commit::CodeRow { base } => {
                if !eecon1.contains(Eecon1::EEPGD | Eecon1::WREN) || eecon1.contains(Eecon1::CFGS) {
                    self.protocol_error(format_args!("code row write with EECON1={:?}", eecon1));
                } else {
                    let base = base as usize;
                    for (cell, staged) in self.code[base..].iter_mut().zip(&self.buffer) {
                        *cell &= *staged;
                    }
                    self.stats.programming_pulses += 1;
                }
                self.buffer.fill(0xFF);
            }
            Commit::ConfigByte { offset, value } => {
                if !eecon1.contains(Eecon1::EEPGD | Eecon1::CFGS) {
                    self.protocol_error(format_args!("config write with EECON1={:?}", eecon1));
                } else if self.config.config_locked & (1 << (offset / 2)) != 0 {
                    log::debug!("dummy: configuration word {} is locked", offset / 2);
                } else {
                    self.config_bytes[offset] = value;
                    self.stats.programming_pulses += 1;
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Erase controller
    // ---------------------------------------------------------------------

    fn run_erase(&mut self) {
        let selector = u32::from_le_bytes([
            self.erase_regs[0],
            self.erase_regs[1],
            self.erase_regs[2],
            0,
        ]);
        let Some(region) = EraseRegion::from_selector(selector) else {
            self.protocol_error(format_args!("unknown erase selector 0x{:06X}", selector));
            return;
        };
        log::debug!("dummy: erasing {:?}", region);

        match region {
            EraseRegion::ConfigBits => self.config_bytes.fill(0xFF),
            EraseRegion::BootBlock => {
                let end = (self.config.boot_block_size as usize).min(self.code.len());
                self.code[..end].fill(0xFF);
            }
            EraseRegion::DataEeprom => self.eeprom.fill(0xFF),
            EraseRegion::CodeBlock(n) => {
                let blocks = self.config.block_count.max(1) as usize;
                let size = self.code.len() / blocks;
                let n = n as usize;
                if n < blocks {
                    let start = (n * size).max(self.config.boot_block_size as usize);
                    let end = (n + 1) * size;
                    if start < end {
                        self.code[start..end].fill(0xFF);
                    }
                    self.eeprom.fill(0xFF);
                }
            }
        }
        self.stats.erases.push(region);
    }
}

fn is_known_reg(f: u8) -> bool {
    matches!(
        f,
        sfr::TBLPTRU
            | sfr::TBLPTRH
            | sfr::TBLPTRL
            | sfr::TABLAT
            | sfr::EEADR
            | sfr::EEADRH
            | sfr::EEDATA
            | sfr::EECON1
    )
}
