//! CLI command implementations
//!
//! Every target command takes an attached [`Target`]; `main` owns the
//! programmer, attaches before dispatch and detaches afterwards.
//!
//! [`Target`]: picflasher_core::target::Target

mod dump_config;
mod eeprom;
mod erase;
mod list;
mod probe;
mod read;
mod write;

pub use dump_config::run_dump_config;
pub use eeprom::{run_eeprom_read, run_eeprom_write};
pub use erase::{run_blank_check, run_erase};
pub use list::{list_devices, list_programmers};
pub use probe::run_probe;
pub use read::run_read;
pub use write::{run_write, WriteArgs};
