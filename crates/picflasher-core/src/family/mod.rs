//! Device family abstraction
//!
//! A [`Family`] knows the command sequences for one group of parts: how to
//! enter programming mode, how to identify the chip and how to erase,
//! program and read each memory. Families are stateless; everything they
//! need is passed in through the [`Session`] and the resolved
//! [`DeviceInfo`].

pub mod pic18fxxk80;

use core::fmt;

use crate::chip::address::{CONFIG_WORDS, DEVICE_ID_MASK, USER_ID_LEN};
use crate::chip::{lookup, DeviceInfo, Identity};
use crate::error::{Error, Result};
use crate::icsp::Session;
use crate::image::MemoryImage;
use crate::progress::Progress;

/// Which memories a bulk erase clears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EraseScope {
    /// Configuration bits, boot block and every code block
    #[default]
    Full,
    /// Boot block only
    BootOnly,
    /// Code blocks only (boot block and configuration untouched)
    ProgramOnly,
    /// Data EEPROM only
    EepromOnly,
}

impl EraseScope {
    /// All scopes, in CLI listing order
    pub const ALL: [EraseScope; 4] = [
        EraseScope::Full,
        EraseScope::BootOnly,
        EraseScope::ProgramOnly,
        EraseScope::EepromOnly,
    ];

    /// Short name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::BootOnly => "boot",
            Self::ProgramOnly => "program",
            Self::EepromOnly => "eeprom",
        }
    }

    /// Parse a short name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EraseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Programming algorithm for one device family
///
/// Every method expects the session to be in programming mode with the
/// target already identified as a member of [`Family::catalog`].
pub trait Family: Sync {
    /// Short identifier (e.g. "pic18fxxk80")
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Parts this family can program
    fn catalog(&self) -> &'static [DeviceInfo];

    /// 32-bit key shifted in while entering programming mode
    fn entry_key(&self) -> u32;

    /// Read the raw device ID word, revision bits included
    fn read_device_id(&self, session: &mut Session<'_>) -> u16;

    /// Read the device ID and resolve it against the catalog
    fn identify(&self, session: &mut Session<'_>) -> Result<Identity> {
        let raw = self.read_device_id(session);
        lookup(self.catalog(), raw).ok_or(Error::DeviceNotFound {
            device_id: raw & DEVICE_ID_MASK,
        })
    }

    /// Erase the memories selected by `scope`
    fn erase(
        &self,
        session: &mut Session<'_>,
        info: &DeviceInfo,
        scope: EraseScope,
        progress: &mut dyn Progress,
    );

    /// Check that every code word reads as erased
    ///
    /// Stops at the first programmed word.
    fn blank_check(
        &self,
        session: &mut Session<'_>,
        info: &DeviceInfo,
        progress: &mut dyn Progress,
    ) -> Result<()>;

    /// Read all of code memory into `image`, marking every word present
    fn read_code(
        &self,
        session: &mut Session<'_>,
        image: &mut MemoryImage,
        progress: &mut dyn Progress,
    ) -> Result<()>;

    /// Program code memory from `image`, one write buffer per pulse
    fn program(
        &self,
        session: &mut Session<'_>,
        info: &DeviceInfo,
        image: &MemoryImage,
        progress: &mut dyn Progress,
    );

    /// Compare code memory against the present words of `image`
    ///
    /// Fails on the first mismatch.
    fn verify(
        &self,
        session: &mut Session<'_>,
        image: &MemoryImage,
        progress: &mut dyn Progress,
    ) -> Result<()>;

    /// Read configuration word `index`
    fn read_config(&self, session: &mut Session<'_>, index: usize) -> u16;

    /// Program configuration word `index`
    fn write_config(&self, session: &mut Session<'_>, index: usize, value: u16);

    /// Read all configuration words
    fn read_all_config(&self, session: &mut Session<'_>) -> [u16; CONFIG_WORDS] {
        let mut words = [0; CONFIG_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            *word = self.read_config(session, index);
        }
        words
    }

    /// Read the user ID bytes
    fn read_user_id(&self, session: &mut Session<'_>) -> [u8; USER_ID_LEN];

    /// Read one data EEPROM cell
    fn eeprom_read_cell(&self, session: &mut Session<'_>, addr: u16) -> u8;

    /// Write one data EEPROM cell and wait for completion
    fn eeprom_write_cell(&self, session: &mut Session<'_>, addr: u16, value: u8) -> Result<()>;
}

/// Families compiled into this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FamilyKind {
    /// PIC18(L)F25/26/45/46/65/66K80
    #[default]
    Pic18FxxK80,
}

impl FamilyKind {
    /// All known families
    pub const ALL: [FamilyKind; 1] = [FamilyKind::Pic18FxxK80];

    /// The algorithm implementation for this family
    pub fn family(self) -> &'static dyn Family {
        match self {
            Self::Pic18FxxK80 => &pic18fxxk80::Pic18FxxK80,
        }
    }

    /// Short identifier
    pub fn name(self) -> &'static str {
        self.family().name()
    }

    /// Parse a family identifier (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names() {
        assert_eq!(FamilyKind::from_name("PIC18FXXK80"), Some(FamilyKind::Pic18FxxK80));
        assert_eq!(FamilyKind::from_name("pic16f"), None);
        assert_eq!(FamilyKind::Pic18FxxK80.family().catalog().len(), 12);
    }

    #[test]
    fn test_erase_scope_names() {
        for scope in EraseScope::ALL {
            assert_eq!(EraseScope::from_name(scope.name()), Some(scope));
        }
        assert_eq!(EraseScope::from_name("chip"), None);
        assert_eq!(EraseScope::default(), EraseScope::Full);
    }
}
