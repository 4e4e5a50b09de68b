//! In-memory images of the target's non-volatile memories
//!
//! [`MemoryImage`] holds code memory as one `Option<u16>` per word: `None`
//! means "no intent" (skipped on write, compared as `0xFFFF`), `Some` means
//! the word must be written and verified. Configuration words and user ID
//! bytes live in fixed side tables with the same presence semantics. A
//! configuration slot also remembers which of its two bytes were supplied,
//! so a file that sets only one byte leaves the other to the device.
//!
//! [`EepromImage`] holds every data EEPROM cell; there is no presence mask.

#[cfg(feature = "std")]
pub mod hex;

use alloc::vec;
use alloc::vec::Vec;

use crate::chip::address::{self, CONFIG, CONFIG_WORDS, ERASED_WORD, USER_ID, USER_ID_LEN};
use crate::chip::DeviceInfo;
use crate::error::{Error, Result};

/// Code memory, configuration and user ID contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    code: Vec<Option<u16>>,
    config: [Option<u16>; CONFIG_WORDS],
    config_masks: [u16; CONFIG_WORDS],
    user_id: [Option<u8>; USER_ID_LEN],
}

impl MemoryImage {
    /// Create an empty image sized for `info`
    pub fn new(info: &DeviceInfo) -> Self {
        Self::with_words(info.code_words())
    }

    /// Create an empty image with `words` code words
    pub fn with_words(words: usize) -> Self {
        Self {
            code: vec![None; words],
            config: [None; CONFIG_WORDS],
            config_masks: [0; CONFIG_WORDS],
            user_id: [None; USER_ID_LEN],
        }
    }

    /// Number of code words
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the image has no code words at all
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Code memory size in bytes
    pub fn code_size(&self) -> u32 {
        self.code.len() as u32 * 2
    }

    /// Code word at word index `index`, if present
    pub fn word(&self, index: usize) -> Option<u16> {
        self.code.get(index).copied().flatten()
    }

    /// Code word at `index`, or the erased value if absent
    pub fn word_or_erased(&self, index: usize) -> u16 {
        self.word(index).unwrap_or(ERASED_WORD)
    }

    /// All code word slots
    pub fn words(&self) -> &[Option<u16>] {
        &self.code
    }

    /// Iterate over present code words as `(word index, value)`
    pub fn present_words(&self) -> impl Iterator<Item = (usize, u16)> + '_ {
        self.code
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.map(|v| (i, v)))
    }

    /// Mark a code word present with `value`
    pub fn set_word(&mut self, index: usize, value: u16) -> Result<()> {
        let slot = self.code.get_mut(index).ok_or(Error::AddressOutOfRange {
            addr: index as u32 * 2,
        })?;
        *slot = Some(value);
        Ok(())
    }

    /// Configuration slot `index`, if present
    pub fn config(&self, index: usize) -> Option<u16> {
        self.config.get(index).copied().flatten()
    }

    /// Bits of configuration slot `index` the image specifies
    ///
    /// `0xFFFF` for a fully specified slot, `0x00FF` or `0xFF00` when only
    /// one byte was given, `0` for an absent slot.
    pub fn config_mask(&self, index: usize) -> u16 {
        self.config_masks.get(index).copied().unwrap_or(0)
    }

    /// All configuration slots
    pub fn config_words(&self) -> &[Option<u16>; CONFIG_WORDS] {
        &self.config
    }

    /// Mark configuration slot `index` present with `value`
    pub fn set_config(&mut self, index: usize, value: u16) -> Result<()> {
        let slot = self.config.get_mut(index).ok_or(Error::AddressOutOfRange {
            addr: address::config_address(index),
        })?;
        *slot = Some(value);
        self.config_masks[index] = 0xFFFF;
        Ok(())
    }

    /// User ID bytes
    pub fn user_id(&self) -> &[Option<u8>; USER_ID_LEN] {
        &self.user_id
    }

    /// Mark user ID byte `index` present with `value`
    pub fn set_user_id(&mut self, index: usize, value: u8) -> Result<()> {
        let slot = self.user_id.get_mut(index).ok_or(Error::AddressOutOfRange {
            addr: USER_ID + index as u32,
        })?;
        *slot = Some(value);
        Ok(())
    }

    /// Store one byte at a table-pointer byte address
    ///
    /// Routes the byte to code memory, user ID or configuration. The other
    /// half of a word that was absent is filled with `0xFF`.
    pub fn set_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        let code_size = self.code_size();
        if addr < code_size {
            let index = (addr / 2) as usize;
            let word = merge_byte(self.code[index], addr, value);
            self.code[index] = Some(word);
            Ok(())
        } else if (USER_ID..USER_ID + USER_ID_LEN as u32).contains(&addr) {
            self.user_id[(addr - USER_ID) as usize] = Some(value);
            Ok(())
        } else if (CONFIG..CONFIG + 2 * CONFIG_WORDS as u32).contains(&addr) {
            let index = ((addr - CONFIG) / 2) as usize;
            self.config[index] = Some(merge_byte(self.config[index], addr, value));
            self.config_masks[index] |= byte_mask(addr);
            Ok(())
        } else {
            Err(Error::AddressOutOfRange { addr })
        }
    }
}

/// Replace the byte of `word` selected by the parity of `addr`
fn merge_byte(word: Option<u16>, addr: u32, value: u8) -> u16 {
    let [low, high] = word.unwrap_or(ERASED_WORD).to_le_bytes();
    if addr & 1 == 0 {
        u16::from_le_bytes([value, high])
    } else {
        u16::from_le_bytes([low, value])
    }
}

fn byte_mask(addr: u32) -> u16 {
    if addr & 1 == 0 {
        0x00FF
    } else {
        0xFF00
    }
}

/// Data EEPROM contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromImage {
    cells: Vec<u8>,
}

impl EepromImage {
    /// Create an erased (all `0xFF`) image for `info`
    pub fn new(info: &DeviceInfo) -> Self {
        Self::with_size(info.eeprom_size as usize)
    }

    /// Create an erased image of `size` cells
    pub fn with_size(size: usize) -> Self {
        Self {
            cells: vec![0xFF; size],
        }
    }

    /// Create an image from raw cell contents
    pub fn from_bytes(cells: &[u8]) -> Self {
        Self {
            cells: cells.to_vec(),
        }
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the image has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell contents
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Cell at `addr`
    pub fn get(&self, addr: usize) -> Option<u8> {
        self.cells.get(addr).copied()
    }

    /// Set the cell at `addr`
    pub fn set(&mut self, addr: usize, value: u8) -> Result<()> {
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(Error::AddressOutOfRange { addr: addr as u32 })?;
        *cell = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K80: DeviceInfo = DeviceInfo::new(0x6180, "PIC18F25K80", 0x8000);

    #[test]
    fn test_new_image_is_absent() {
        let image = MemoryImage::new(&K80);
        assert_eq!(image.len(), 0x4000);
        assert_eq!(image.present_words().count(), 0);
        assert_eq!(image.word_or_erased(0), 0xFFFF);
        assert!(image.config_words().iter().all(Option::is_none));
    }

    #[test]
    fn test_set_byte_routing() {
        let mut image = MemoryImage::new(&K80);
        image.set_byte(0x0000, 0x34).unwrap();
        image.set_byte(0x0001, 0x12).unwrap();
        image.set_byte(0x0005, 0x56).unwrap();
        image.set_byte(0x20_0003, 0xAB).unwrap();
        image.set_byte(0x30_0002, 0x1D).unwrap();

        assert_eq!(image.word(0), Some(0x1234));
        assert_eq!(image.word(2), Some(0x56FF));
        assert_eq!(image.word(1), None);
        assert_eq!(image.user_id()[3], Some(0xAB));
        assert_eq!(image.config(1), Some(0xFF1D));
        assert_eq!(image.config_mask(1), 0x00FF);
        assert_eq!(image.config_mask(0), 0);
    }

    #[test]
    fn test_config_mask_tracks_supplied_bytes() {
        let mut image = MemoryImage::new(&K80);
        image.set_byte(0x30_0001, 0x18).unwrap();
        assert_eq!(image.config(0), Some(0x18FF));
        assert_eq!(image.config_mask(0), 0xFF00);

        image.set_byte(0x30_0000, 0x1E).unwrap();
        assert_eq!(image.config(0), Some(0x181E));
        assert_eq!(image.config_mask(0), 0xFFFF);

        image.set_config(7, 0x4000).unwrap();
        assert_eq!(image.config_mask(7), 0xFFFF);
        assert_eq!(image.config_mask(8), 0);
    }

    #[test]
    fn test_set_byte_out_of_range() {
        let mut image = MemoryImage::new(&K80);
        assert_eq!(
            image.set_byte(0x8000, 0),
            Err(Error::AddressOutOfRange { addr: 0x8000 })
        );
        assert!(image.set_byte(0x30_0010, 0).is_err());
        assert!(image.set_word(0x4000, 0).is_err());
    }

    #[test]
    fn test_eeprom_image() {
        let mut eeprom = EepromImage::new(&K80);
        assert_eq!(eeprom.len(), 1024);
        assert!(eeprom.cells().iter().all(|&c| c == 0xFF));
        eeprom.set(1023, 0x42).unwrap();
        assert_eq!(eeprom.get(1023), Some(0x42));
        assert!(eeprom.set(1024, 0).is_err());
    }
}
