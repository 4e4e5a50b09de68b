//! Programmer traits and abstractions
//!
//! This module defines the pin-level capability that every programmer
//! backend must provide to drive the ICSP link.

pub mod bitbang;
mod traits;

pub use traits::*;
