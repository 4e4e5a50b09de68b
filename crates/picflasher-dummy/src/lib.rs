//! picflasher-dummy - Pin-level PIC18 K80 simulator
//!
//! [`DummyPic`] implements [`IcspPins`] and behaves like a PIC18F K80 part
//! sitting on the other end of the three ICSP wires. It watches MCLR for
//! the entry key, decodes commands and operands on falling PGC edges,
//! drives PGD during reads and emulates the table pointer, write buffer,
//! EECON1 and erase controller well enough to run every operation of
//! `picflasher-core` against it.
//!
//! Time is simulated: `delay_us` only advances a counter, which is also
//! used to check programming pulse widths.
//!
//! # Example
//!
//! ```
//! use picflasher_core::family::FamilyKind;
//! use picflasher_core::target::identify;
//! use picflasher_dummy::{DummyConfig, DummyPic};
//!
//! let mut pic = DummyPic::new(DummyConfig::default());
//! let identity = identify(&mut pic, FamilyKind::Pic18FxxK80.family()).unwrap();
//! assert_eq!(identity.name(), "PIC18F25K80");
//! ```

mod chip;
mod link;

#[cfg(test)]
mod tests;

use picflasher_core::chip::address::{
    EraseRegion, CONFIG_WORDS, ERASED_WORD, USER_ID_LEN,
};
use picflasher_core::chip::{find_by_name, DeviceInfo};
use picflasher_core::family::pic18fxxk80::{CATALOG, ENTRY_KEY};
use picflasher_core::programmer::{Direction, IcspPins, Pin};

use chip::Chip;
use link::{Event, Link};

/// Boot block size of every K80 part (BBSIZ default)
pub const BOOT_BLOCK_SIZE: u32 = 0x800;

/// Geometry and behaviour of the simulated part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Raw device ID word, revision bits included
    pub device_id: u16,
    /// Code memory size in bytes
    pub code_memory_size: u32,
    /// Number of erase blocks
    pub block_count: u8,
    /// Write buffer size in bytes
    pub write_buffer_size: u16,
    /// Data EEPROM size in bytes
    pub eeprom_size: u16,
    /// Boot block size in bytes
    pub boot_block_size: u32,
    /// WR polls that still read busy after an EEPROM write starts
    pub eeprom_busy_polls: u32,
    /// Never finish EEPROM writes
    pub eeprom_stuck: bool,
    /// Bit mask of configuration words that ignore writes
    pub config_locked: u8,
}

impl DummyConfig {
    /// Simulate a catalog part at the given silicon revision
    pub fn for_device(info: &DeviceInfo, revision: u8) -> Self {
        Self {
            device_id: info.id | (revision as u16 & 0x1F),
            code_memory_size: info.code_memory_size,
            block_count: info.block_count,
            write_buffer_size: info.write_buffer_size,
            eeprom_size: info.eeprom_size,
            boot_block_size: BOOT_BLOCK_SIZE,
            eeprom_busy_polls: 2,
            eeprom_stuck: false,
            config_locked: 0,
        }
    }
}

impl Default for DummyConfig {
    /// PIC18F25K80, revision 1
    fn default() -> Self {
        Self::for_device(&CATALOG[0], 1)
    }
}

/// Counters collected by the simulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Successful entries into programming mode
    pub entries: u32,
    /// Core instructions executed
    pub instructions: u64,
    /// Table read commands served
    pub table_reads: u64,
    /// Programming pulses that committed data
    pub programming_pulses: u64,
    /// Start-programming commands whose pulse was too short
    pub short_pulses: u64,
    /// Reads of EECON1
    pub eeprom_polls: u64,
    /// EEPROM cell writes started
    pub eeprom_writes: u64,
    /// Erase operations, in order
    pub erases: Vec<EraseRegion>,
    /// Malformed or unsupported sequences
    pub protocol_errors: u64,
}

/// Simulated PIC18 K80 attached to the ICSP pins
pub struct DummyPic {
    chip: Chip,
    link: Link,

    clock: bool,
    data: bool,
    mclr: bool,
    data_dir: Direction,
    mclr_dir: Direction,

    programming: bool,
    key: u32,
    key_bits: u32,

    now_us: u64,
    clock_rise_us: u64,
}

impl DummyPic {
    /// Create a blank (fully erased) part
    pub fn new(config: DummyConfig) -> Self {
        Self {
            chip: Chip::new(config),
            link: Link::new(),
            clock: false,
            data: false,
            mclr: true,
            data_dir: Direction::Input,
            mclr_dir: Direction::Input,
            programming: false,
            key: 0,
            key_bits: 0,
            now_us: 0,
            clock_rise_us: 0,
        }
    }

    /// Simulator configuration
    pub fn config(&self) -> &DummyConfig {
        &self.chip.config
    }

    /// Counters since creation
    pub fn stats(&self) -> &Stats {
        &self.chip.stats
    }

    /// Whether the part is in programming mode
    pub fn is_programming(&self) -> bool {
        self.programming
    }

    /// Whether MCLR has been released (undriven)
    pub fn mclr_released(&self) -> bool {
        self.mclr_dir == Direction::Input
    }

    /// Simulated time spent in `delay_us`
    pub fn elapsed_us(&self) -> u64 {
        self.now_us
    }

    /// Number of code words
    pub fn code_words(&self) -> usize {
        self.chip.code.len() / 2
    }

    /// Code word at word index `index`
    pub fn code_word(&self, index: usize) -> u16 {
        let at = index * 2;
        match self.chip.code.get(at..at + 2) {
            Some(&[low, high]) => u16::from_le_bytes([low, high]),
            _ => 0,
        }
    }

    /// Overwrite a code word
    pub fn set_code_word(&mut self, index: usize, value: u16) {
        let at = index * 2;
        if let Some(cells) = self.chip.code.get_mut(at..at + 2) {
            cells.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Whether every code word is erased
    pub fn code_is_blank(&self) -> bool {
        (0..self.code_words()).all(|i| self.code_word(i) == ERASED_WORD)
    }

    /// Configuration word `index`
    pub fn config_word(&self, index: usize) -> u16 {
        let at = index * 2;
        u16::from_le_bytes([self.chip.config_bytes[at], self.chip.config_bytes[at + 1]])
    }

    /// Overwrite configuration word `index`
    pub fn set_config_word(&mut self, index: usize, value: u16) {
        debug_assert!(index < CONFIG_WORDS);
        let at = index * 2;
        self.chip.config_bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// User ID bytes
    pub fn user_id(&self) -> [u8; USER_ID_LEN] {
        self.chip.user_id
    }

    /// Overwrite the user ID bytes
    pub fn set_user_id(&mut self, id: [u8; USER_ID_LEN]) {
        self.chip.user_id = id;
    }

    /// Data EEPROM contents
    pub fn eeprom(&self) -> &[u8] {
        &self.chip.eeprom
    }

    /// Mutable data EEPROM contents
    pub fn eeprom_mut(&mut self) -> &mut [u8] {
        &mut self.chip.eeprom
    }

    fn set_mclr(&mut self, level: bool) {
        if level == self.mclr {
            return;
        }
        self.mclr = level;

        if !level {
            if self.programming {
                log::debug!("dummy: leaving programming mode");
                self.programming = false;
                self.link.reset();
                self.chip.reset();
            }
            self.key = 0;
            self.key_bits = 0;
        } else if self.key_bits >= 32 && self.key == ENTRY_KEY {
            log::debug!("dummy: entering programming mode");
            self.programming = true;
            self.link.reset();
            self.chip.stats.entries += 1;
        } else if self.key_bits > 0 {
            log::debug!("dummy: wrong entry key 0x{:08X}", self.key);
        }
    }

    fn set_clock(&mut self, level: bool) {
        if level == self.clock {
            return;
        }
        self.clock = level;

        if level {
            self.clock_rise_us = self.now_us;
            if self.programming && self.link.is_shifting() && self.data_dir == Direction::Output {
                log::warn!("dummy: PGD driven by both sides");
                self.chip.stats.protocol_errors += 1;
            }
            return;
        }

        let high_us = self.now_us - self.clock_rise_us;
        if !self.mclr {
            self.key = self.key << 1 | self.data as u32;
            self.key_bits = self.key_bits.saturating_add(1);
        } else if self.programming {
            match self.link.falling_edge(self.data) {
                Some(Event::Command(cmd)) => {
                    if let Some(value) = self.chip.on_command(cmd, high_us) {
                        self.link.load(value);
                    }
                }
                Some(Event::Operand(cmd, value)) => self.chip.on_operand(cmd, value),
                Some(Event::Invalid(bits)) => {
                    log::warn!("dummy: undefined command 0x{:X}", bits);
                    self.chip.stats.protocol_errors += 1;
                }
                None => {}
            }
        }
    }
}

impl IcspPins for DummyPic {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        match pin {
            Pin::Clock => {}
            Pin::Data => self.data_dir = direction,
            Pin::Mclr => {
                self.mclr_dir = direction;
                if direction == Direction::Input {
                    // Pulled up when released
                    self.set_mclr(true);
                }
            }
        }
    }

    fn write(&mut self, pin: Pin, level: bool) {
        match pin {
            Pin::Clock => self.set_clock(level),
            Pin::Data => self.data = level,
            Pin::Mclr => {
                if self.mclr_dir == Direction::Output {
                    self.set_mclr(level);
                }
            }
        }
    }

    fn read(&mut self, pin: Pin) -> bool {
        match pin {
            Pin::Clock => self.clock,
            Pin::Mclr => self.mclr,
            Pin::Data => match (self.data_dir, self.link.drive()) {
                (Direction::Input, Some(level)) => level,
                // Weak pull-up on an undriven line
                (Direction::Input, None) => true,
                (Direction::Output, _) => self.data,
            },
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += us as u64;
    }
}

/// Parse dummy programmer options
///
/// - `device=<name>` - simulated part (default PIC18F25K80)
/// - `rev=<n>` - silicon revision (default 1)
/// - `busy=<n>` - EEPROM busy polls per write (default 2)
/// - `id=<hex>` - raw device ID override, for exercising unknown parts
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig, String> {
    let mut config = DummyConfig::default();
    let mut revision: Option<u8> = None;
    let mut raw_id: Option<u16> = None;

    for (key, value) in options {
        match *key {
            "device" | "chip" => {
                let info = find_by_name(&CATALOG, value)
                    .ok_or_else(|| format!("Unknown device: {}", value))?;
                let busy = config.eeprom_busy_polls;
                config = DummyConfig::for_device(info, 1);
                config.eeprom_busy_polls = busy;
            }
            "rev" => {
                revision = Some(
                    value
                        .parse()
                        .ok()
                        .filter(|r: &u8| *r < 0x20)
                        .ok_or_else(|| format!("Invalid rev value: {}", value))?,
                );
            }
            "busy" => {
                config.eeprom_busy_polls = value
                    .parse()
                    .map_err(|_| format!("Invalid busy value: {}", value))?;
            }
            "id" => {
                let digits = value.trim_start_matches("0x").trim_start_matches("0X");
                raw_id = Some(
                    u16::from_str_radix(digits, 16)
                        .map_err(|_| format!("Invalid id value: {}", value))?,
                );
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    if let Some(rev) = revision {
        config.device_id = (config.device_id & 0xFFE0) | rev as u16;
    }
    if let Some(id) = raw_id {
        config.device_id = id;
    }
    Ok(config)
}
