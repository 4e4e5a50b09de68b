//! PIC18(L)F25/26/45/46/65/66K80
//!
//! Low-voltage ICSP as described in the PIC18F2XKXX/4XKXX/6XKXX flash
//! programming specification (DS39972). All parts share a 64-byte write
//! buffer, four code blocks and 1 KiB of data EEPROM.

mod config;
mod eeprom;
mod erase;
mod program;

pub use eeprom::EEPROM_POLL_LIMIT;
pub use erase::erase_plan;

use alloc::vec::Vec;

use super::{EraseScope, Family};
use crate::chip::address::{CONFIG_WORDS, USER_ID_LEN};
use crate::chip::DeviceInfo;
use crate::error::Result;
use crate::icsp::Session;
use crate::image::MemoryImage;
use crate::progress::Progress;

/// Key that selects low-voltage programming mode ("MCHP")
pub const ENTRY_KEY: u32 = 0x4D43_4850;

/// Supported parts
pub static CATALOG: [DeviceInfo; 12] = [
    DeviceInfo::new(0x6180, "PIC18F25K80", 0x8000),
    DeviceInfo::new(0x6260, "PIC18LF25K80", 0x8000),
    DeviceInfo::new(0x6120, "PIC18F26K80", 0x10000),
    DeviceInfo::new(0x6200, "PIC18LF26K80", 0x10000),
    DeviceInfo::new(0x6160, "PIC18F45K80", 0x8000),
    DeviceInfo::new(0x6240, "PIC18LF45K80", 0x8000),
    DeviceInfo::new(0x6100, "PIC18F46K80", 0x10000),
    DeviceInfo::new(0x61E0, "PIC18LF46K80", 0x10000),
    DeviceInfo::new(0x6140, "PIC18F65K80", 0x8000),
    DeviceInfo::new(0x6220, "PIC18LF65K80", 0x8000),
    DeviceInfo::new(0x60E0, "PIC18F66K80", 0x10000),
    DeviceInfo::new(0x61C0, "PIC18LF66K80", 0x10000),
];

/// The K80 programming algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct Pic18FxxK80;

impl Family for Pic18FxxK80 {
    fn name(&self) -> &'static str {
        "pic18fxxk80"
    }

    fn description(&self) -> &'static str {
        "PIC18(L)F25/26/45/46/65/66K80"
    }

    fn catalog(&self) -> &'static [DeviceInfo] {
        &CATALOG
    }

    fn entry_key(&self) -> u32 {
        ENTRY_KEY
    }

    fn read_device_id(&self, session: &mut Session<'_>) -> u16 {
        config::read_device_id(session)
    }

    fn erase(
        &self,
        session: &mut Session<'_>,
        info: &DeviceInfo,
        scope: EraseScope,
        progress: &mut dyn Progress,
    ) {
        let plan: Vec<_> = erase_plan(scope, info.block_count).collect();
        erase::run(session, &plan, progress);
    }

    fn blank_check(
        &self,
        session: &mut Session<'_>,
        info: &DeviceInfo,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        program::blank_check(session, info, progress)
    }

    fn read_code(
        &self,
        session: &mut Session<'_>,
        image: &mut MemoryImage,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        program::read_code(session, image, progress)
    }

    fn program(
        &self,
        session: &mut Session<'_>,
        info: &DeviceInfo,
        image: &MemoryImage,
        progress: &mut dyn Progress,
    ) {
        program::write_code(session, info, image, progress)
    }

    fn verify(
        &self,
        session: &mut Session<'_>,
        image: &MemoryImage,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        program::verify_code(session, image, progress)
    }

    fn read_config(&self, session: &mut Session<'_>, index: usize) -> u16 {
        debug_assert!(index < CONFIG_WORDS);
        config::read_word(session, index)
    }

    fn write_config(&self, session: &mut Session<'_>, index: usize, value: u16) {
        debug_assert!(index < CONFIG_WORDS);
        config::write_word(session, index, value)
    }

    fn read_user_id(&self, session: &mut Session<'_>) -> [u8; USER_ID_LEN] {
        config::read_user_id(session)
    }

    fn eeprom_read_cell(&self, session: &mut Session<'_>, addr: u16) -> u8 {
        eeprom::read_cell(session, addr)
    }

    fn eeprom_write_cell(&self, session: &mut Session<'_>, addr: u16, value: u8) -> Result<()> {
        eeprom::write_cell(session, addr, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::lookup;

    #[test]
    fn test_catalog_ids_are_unique_and_masked() {
        for (i, a) in CATALOG.iter().enumerate() {
            assert_eq!(a.id & 0x1F, 0, "{} has revision bits set", a.name);
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_reference_part() {
        let id = lookup(&CATALOG, 0x6183).unwrap();
        assert_eq!(id.name(), "PIC18F25K80");
        assert_eq!(id.code_memory_size(), 0x8000);
        assert_eq!(id.info.block_count, 4);
        assert_eq!(id.info.write_buffer_size, 64);
        assert_eq!(id.revision, 3);
    }
}
