//! Device catalog, identity and address map
//!
//! This module describes the chips a family can program and resolves a
//! silicon device ID to a catalog entry.

pub mod address;
mod catalog;

pub use catalog::*;
