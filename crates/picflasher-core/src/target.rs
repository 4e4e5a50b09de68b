//! High-level operations on an identified target
//!
//! [`Target::attach`] enters programming mode and resolves the device
//! identity; every other operation is only reachable through the returned
//! `Target`, so nothing touches memory before the part is known.

use alloc::vec::Vec;

use crate::chip::address::{CONFIG_WORDS, USER_ID_LEN};
use crate::chip::{DeviceInfo, Identity};
use crate::error::{Error, Result};
use crate::family::{EraseScope, Family};
use crate::icsp::{Session, SessionState};
use crate::image::{EepromImage, MemoryImage};
use crate::programmer::IcspPins;
use crate::progress::{PercentTracker, Phase, Progress};

/// Options for [`Target::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Read code and configuration back after programming
    pub verify: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// A configuration word that did not read back as written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigMismatch {
    /// Configuration slot (0-7)
    pub index: usize,
    /// Value written
    pub expected: u16,
    /// Value read back
    pub found: u16,
}

/// Outcome of a successful [`Target::write`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Configuration slots that were programmed
    pub config_written: Vec<usize>,
    /// Configuration slots left untouched because the image had no value
    pub config_skipped: Vec<usize>,
    /// Configuration words that failed verification
    pub config_mismatches: Vec<ConfigMismatch>,
}

impl WriteReport {
    /// Whether every programmed word verified
    pub fn is_clean(&self) -> bool {
        self.config_mismatches.is_empty()
    }
}

/// An identified chip in programming mode
pub struct Target<'a> {
    session: Session<'a>,
    family: &'static dyn Family,
    identity: Identity,
}

impl<'a> Target<'a> {
    /// Enter programming mode and identify the chip
    ///
    /// On a catalog miss the session is closed again and
    /// [`Error::DeviceNotFound`] is returned.
    pub fn attach(pins: &'a mut dyn IcspPins, family: &'static dyn Family) -> Result<Self> {
        let mut session = Session::enter(pins, family.entry_key());
        match family.identify(&mut session) {
            Ok(identity) => {
                log::info!(
                    "Found {} (ID 0x{:04X}, revision {})",
                    identity.name(),
                    identity.device_id,
                    identity.revision
                );
                Ok(Self {
                    session,
                    family,
                    identity,
                })
            }
            Err(e) => {
                session.exit();
                Err(e)
            }
        }
    }

    /// Resolved identity
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Geometry of the identified part
    pub fn info(&self) -> &'static DeviceInfo {
        self.identity.info
    }

    /// Family implementation driving this target
    pub fn family(&self) -> &'static dyn Family {
        self.family
    }

    /// Link state (always `Programming` while attached)
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Check that all of code memory is erased
    pub fn blank_check(&mut self, progress: &mut dyn Progress) -> Result<()> {
        self.family
            .blank_check(&mut self.session, self.identity.info, progress)
    }

    /// Erase the memories selected by `scope`
    pub fn bulk_erase(&mut self, scope: EraseScope, progress: &mut dyn Progress) {
        log::info!("Erasing ({})", scope);
        self.family
            .erase(&mut self.session, self.identity.info, scope, progress);
    }

    /// Read code memory, configuration words and user ID
    ///
    /// Every entry of the returned image is present.
    pub fn read(&mut self, progress: &mut dyn Progress) -> Result<MemoryImage> {
        let mut image = MemoryImage::new(self.identity.info);
        self.family.read_code(&mut self.session, &mut image, progress)?;

        for (index, byte) in self.user_id().into_iter().enumerate() {
            image.set_user_id(index, byte)?;
        }
        for (index, word) in self.configuration_registers().into_iter().enumerate() {
            image.set_config(index, word)?;
        }
        Ok(image)
    }

    /// Program code memory and configuration from `image`
    ///
    /// Code memory is written and, with `options.verify`, read back; the
    /// first code mismatch aborts with [`Error::VerifyMismatch`] before any
    /// configuration word is touched. Configuration words present in the
    /// image are then programmed one by one and verified individually;
    /// their mismatches are collected in the report instead of aborting.
    /// A slot with only one byte specified keeps the device's other byte.
    pub fn write(
        &mut self,
        image: &MemoryImage,
        options: WriteOptions,
        progress: &mut dyn Progress,
    ) -> Result<WriteReport> {
        if image.len() != self.identity.info.code_words() {
            return Err(Error::ImageSizeMismatch);
        }

        self.family
            .program(&mut self.session, self.identity.info, image, progress);
        if options.verify {
            self.family.verify(&mut self.session, image, progress)?;
        }

        let mut report = WriteReport::default();
        for (index, word) in image.config_words().iter().enumerate() {
            let Some(mut expected) = *word else {
                log::info!("Skipping configuration word {}", index);
                report.config_skipped.push(index);
                continue;
            };
            let mask = image.config_mask(index);
            if mask != 0xFFFF {
                let current = self.family.read_config(&mut self.session, index);
                expected = (expected & mask) | (current & !mask);
                log::debug!(
                    "Configuration word {} partially specified, keeping device bits 0x{:04X}",
                    index,
                    current & !mask
                );
            }
            self.family.write_config(&mut self.session, index, expected);
            report.config_written.push(index);

            if options.verify {
                let found = self.family.read_config(&mut self.session, index);
                if found != expected {
                    log::warn!(
                        "Configuration word {} mismatch: wrote 0x{:04X}, read 0x{:04X}",
                        index,
                        expected,
                        found
                    );
                    report.config_mismatches.push(ConfigMismatch {
                        index,
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Read the whole data EEPROM
    pub fn eeprom_read(&mut self, progress: &mut dyn Progress) -> EepromImage {
        let size = self.identity.info.eeprom_size;
        let mut tracker = PercentTracker::start(progress, Phase::EepromRead, size as u32);
        let mut cells = Vec::with_capacity(size as usize);
        for addr in 0..size {
            let value = self.family.eeprom_read_cell(&mut self.session, addr);
            log::trace!("EEPROM 0x{:03X}: 0x{:02X}", addr, value);
            cells.push(value);
            tracker.advance(addr as u32);
        }
        tracker.complete();
        EepromImage::from_bytes(&cells)
    }

    /// Write every data EEPROM cell from `image`
    pub fn eeprom_write(&mut self, image: &EepromImage, progress: &mut dyn Progress) -> Result<()> {
        let size = self.identity.info.eeprom_size;
        if image.len() != size as usize {
            return Err(Error::ImageSizeMismatch);
        }
        let mut tracker = PercentTracker::start(progress, Phase::EepromWrite, size as u32);
        for (addr, &value) in (0..size).zip(image.cells()) {
            if let Err(e) = self
                .family
                .eeprom_write_cell(&mut self.session, addr, value)
            {
                tracker.abort();
                return Err(e);
            }
            tracker.advance(addr as u32);
        }
        tracker.complete();
        Ok(())
    }

    /// Read the user ID bytes
    pub fn user_id(&mut self) -> [u8; USER_ID_LEN] {
        self.family.read_user_id(&mut self.session)
    }

    /// Read all configuration words
    pub fn configuration_registers(&mut self) -> [u16; CONFIG_WORDS] {
        self.family.read_all_config(&mut self.session)
    }

    /// Leave programming mode
    pub fn detach(self) {
        self.session.exit();
    }
}

/// Enter programming mode, identify the chip and leave again
pub fn identify(pins: &mut dyn IcspPins, family: &'static dyn Family) -> Result<Identity> {
    let target = Target::attach(pins, family)?;
    let identity = target.identity();
    target.detach();
    Ok(identity)
}
