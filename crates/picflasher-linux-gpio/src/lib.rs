//! picflasher-linux-gpio - Linux GPIO bit-banged ICSP support
//!
//! Drives the PGC, PGD and MCLR lines of a PIC18 target from three GPIO
//! lines using the Linux GPIO character device interface (gpiocdev).
//!
//! # Example
//!
//! ```no_run
//! use picflasher_core::family::FamilyKind;
//! use picflasher_core::target::identify;
//! use picflasher_linux_gpio::{LinuxGpioIcsp, LinuxGpioIcspConfig};
//!
//! let config = LinuxGpioIcspConfig::new("/dev/gpiochip0", 23, 24, 18);
//! //                                     device          PGC PGD MCLR
//! let mut pins = LinuxGpioIcsp::open(&config)?;
//!
//! let identity = identify(&mut pins, FamilyKind::Pic18FxxK80.family())?;
//! println!("Found {}", identity.name());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with picflasher CLI
//!
//! ```bash
//! picflasher probe -p linux_gpio:dev=/dev/gpiochip0,clk=23,data=24,mclr=18
//! picflasher read -p linux_gpio:gpiochip=0,clk=23,data=24,mclr=18 -o dump.hex
//! ```
//!
//! # Wiring
//!
//! | Target pin | GPIO function | Description |
//! |------------|---------------|-------------|
//! | PGC        | clk (output)  | Programming clock |
//! | PGD        | data (in/out) | Programming data |
//! | MCLR       | mclr (in/out) | Reset; needs a pull-up to VDD |
//! | PGM/LVP    | -             | Low-voltage programming must be enabled |
//! | VSS        | GND           | Common ground |
//!
//! The target must run at the same logic level as the GPIO bank.

pub mod device;
pub mod error;

pub use device::{parse_options, LinuxGpioIcsp, LinuxGpioIcspConfig};
pub use error::{LinuxGpioError, Result};

