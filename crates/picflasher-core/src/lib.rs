//! picflasher-core - Core library for PIC18 in-circuit serial programming
//!
//! This crate drives the low-voltage ICSP protocol of 8-bit PIC18
//! microcontrollers over three bit-banged signal lines (PGC, PGD, MCLR).
//! It knows how to identify a chip, erase it, program and verify its code
//! memory, configuration words and data EEPROM.
//!
//! The crate is `no_std` compatible. Pin access is abstracted by the
//! [`programmer::IcspPins`] trait, so the same engine runs on Linux GPIO,
//! a microcontroller or the simulator in `picflasher-dummy`.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc` and the
//!   Intel HEX codec in [`image::hex`])
//! - `alloc` - Enable heap allocation (required for images and targets)
//!
//! # Example
//!
//! ```ignore
//! use picflasher_core::family::FamilyKind;
//! use picflasher_core::progress::NoProgress;
//! use picflasher_core::target::Target;
//!
//! fn dump<P: picflasher_core::programmer::IcspPins>(pins: &mut P) {
//!     let family = FamilyKind::Pic18FxxK80.family();
//!     match Target::attach(pins, family) {
//!         Ok(mut target) => {
//!             println!("Found: {}", target.identity().name());
//!             let image = target.read(&mut NoProgress).unwrap();
//!             println!("{} words", image.len());
//!         }
//!         Err(e) => println!("Probe failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod error;
#[cfg(feature = "alloc")]
pub mod family;
pub mod icsp;
#[cfg(feature = "alloc")]
pub mod image;
pub mod programmer;
pub mod progress;
#[cfg(feature = "alloc")]
pub mod target;

pub use error::{Error, Result};
