//! Error types for picflasher-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Identity errors
    /// The device ID read from the chip has no catalog entry
    DeviceNotFound {
        /// Device ID with the revision bits masked out
        device_id: u16,
    },

    // Operation errors
    /// Code memory readback differs from the image
    VerifyMismatch {
        /// Byte address of the offending word
        addr: u32,
        /// Word the image asked for
        expected: u16,
        /// Word read back from the chip
        found: u16,
    },
    /// Blank check found a programmed word
    NotBlank {
        /// Byte address of the first non-erased word
        addr: u32,
        /// Word read back (should be 0xFFFF if erased)
        found: u16,
    },
    /// Data EEPROM write never cleared its busy bit
    EepromWriteTimeout {
        /// EEPROM cell address being written
        addr: u16,
    },

    // Image errors
    /// Address lies outside the identified device's memory map
    AddressOutOfRange {
        /// Offending byte address
        addr: u32,
    },
    /// Image geometry does not match the identified device
    ImageSizeMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound { device_id } => {
                write!(f, "unknown device ID 0x{:04X}", device_id)
            }
            Self::VerifyMismatch {
                addr,
                expected,
                found,
            } => write!(
                f,
                "verify failed at 0x{:06X}: expected 0x{:04X}, found 0x{:04X}",
                addr, expected, found
            ),
            Self::NotBlank { addr, found } => write!(
                f,
                "chip not blank at 0x{:06X}: read 0x{:04X}",
                addr, found
            ),
            Self::EepromWriteTimeout { addr } => {
                write!(f, "EEPROM write at 0x{:03X} did not complete", addr)
            }
            Self::AddressOutOfRange { addr } => {
                write!(f, "address 0x{:06X} is outside the device memory map", addr)
            }
            Self::ImageSizeMismatch => write!(f, "image does not match device geometry"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
