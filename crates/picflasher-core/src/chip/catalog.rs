//! Static device catalog and identity resolution

use super::address::{DEVICE_ID_MASK, REVISION_MASK};

/// Catalog entry describing one device's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device ID with revision bits cleared
    pub id: u16,
    /// Marketing name (e.g. "PIC18F25K80")
    pub name: &'static str,
    /// Code memory size in bytes
    pub code_memory_size: u32,
    /// Number of erasable code blocks (4 or 8)
    pub block_count: u8,
    /// Programming write buffer width in bytes
    pub write_buffer_size: u16,
    /// Data EEPROM size in bytes
    pub eeprom_size: u16,
}

impl DeviceInfo {
    /// Create a K80-style entry
    pub const fn new(id: u16, name: &'static str, code_memory_size: u32) -> Self {
        Self {
            id,
            name,
            code_memory_size,
            block_count: 4,
            write_buffer_size: 64,
            eeprom_size: 1024,
        }
    }

    /// Number of 16-bit words of code memory
    pub const fn code_words(&self) -> usize {
        (self.code_memory_size / 2) as usize
    }

    /// Number of 16-bit words staged per programming pulse
    pub const fn write_buffer_words(&self) -> usize {
        (self.write_buffer_size / 2) as usize
    }
}

/// A resolved target: catalog entry plus the silicon revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Matched catalog entry
    pub info: &'static DeviceInfo,
    /// Device ID with revision bits cleared
    pub device_id: u16,
    /// Silicon revision (low 5 bits of the ID word)
    pub revision: u8,
}

impl Identity {
    /// Device name
    pub fn name(&self) -> &'static str {
        self.info.name
    }

    /// Code memory size in bytes
    pub fn code_memory_size(&self) -> u32 {
        self.info.code_memory_size
    }
}

/// Split a raw ID word into (device ID, revision)
pub const fn split_device_id(raw: u16) -> (u16, u8) {
    (raw & DEVICE_ID_MASK, (raw & REVISION_MASK) as u8)
}

/// Find the catalog entry for a raw device ID word
///
/// The revision bits are masked off before an exact match on the ID.
pub fn lookup(catalog: &'static [DeviceInfo], raw: u16) -> Option<Identity> {
    let (device_id, revision) = split_device_id(raw);
    catalog
        .iter()
        .find(|info| info.id == device_id)
        .map(|info| Identity {
            info,
            device_id,
            revision,
        })
}

/// Find a catalog entry by name (case-insensitive)
pub fn find_by_name(catalog: &'static [DeviceInfo], name: &str) -> Option<&'static DeviceInfo> {
    catalog.iter().find(|info| info.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    static CATALOG: [DeviceInfo; 2] = [
        DeviceInfo::new(0x6180, "PIC18F25K80", 0x8000),
        DeviceInfo::new(0x6120, "PIC18F26K80", 0x10000),
    ];

    #[test]
    fn test_lookup_masks_revision() {
        let id = lookup(&CATALOG, 0x6180 | 0x05).unwrap();
        assert_eq!(id.name(), "PIC18F25K80");
        assert_eq!(id.device_id, 0x6180);
        assert_eq!(id.revision, 5);
        assert_eq!(id.info.code_words(), 0x4000);
        assert_eq!(id.info.write_buffer_words(), 32);
    }

    #[test]
    fn test_lookup_miss() {
        assert!(lookup(&CATALOG, 0x1234).is_none());
        assert!(lookup(&CATALOG, 0xFFFF).is_none());
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_by_name(&CATALOG, "pic18f26k80").unwrap().id, 0x6120);
        assert!(find_by_name(&CATALOG, "PIC16F84").is_none());
    }
}
