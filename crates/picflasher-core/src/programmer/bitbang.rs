//! Bit-level helpers shared by the ICSP engine
//!
//! These are standalone functions over any [`IcspPins`] implementation.
//! They only shape waveforms; which delay constants to pass is up to the
//! protocol layer in [`crate::icsp`].
//!
//! Output cell: drive PGD, wait `setup_us`, raise PGC, wait `hold_us`,
//! lower PGC, wait `hold_us`. The target latches on the falling edge.
//!
//! Input cell: raise PGC, wait `valid_us`, sample PGD, wait `setup_us`,
//! lower PGC, wait `hold_us`.

use super::{IcspPins, Pin};

/// Order in which bits of a value are shifted onto the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Least significant bit first (commands and data words)
    LsbFirst,
    /// Most significant bit first (the program-mode entry key)
    MsbFirst,
}

/// Setup/hold intervals for one bit cell, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitTiming {
    /// Data setup before the clock edge
    pub setup_us: u32,
    /// Clock high time and clock low time after the cell
    pub hold_us: u32,
}

/// Clock one bit out on PGD
#[inline]
pub fn write_bit<P: IcspPins + ?Sized>(pins: &mut P, bit: bool, timing: BitTiming) {
    pins.write(Pin::Data, bit);
    pins.delay_us(timing.setup_us);
    pins.write(Pin::Clock, true);
    pins.delay_us(timing.hold_us);
    pins.write(Pin::Clock, false);
    pins.delay_us(timing.hold_us);
}

/// Clock `count` bits of `value` out on PGD
pub fn write_bits<P: IcspPins + ?Sized>(
    pins: &mut P,
    value: u32,
    count: u32,
    order: BitOrder,
    timing: BitTiming,
) {
    for i in 0..count {
        let shift = match order {
            BitOrder::LsbFirst => i,
            BitOrder::MsbFirst => count - 1 - i,
        };
        write_bit(pins, (value >> shift) & 1 != 0, timing);
    }
}

/// Clock `count` bits in from PGD, least significant bit first
///
/// PGD must already be configured as an input.
pub fn read_bits<P: IcspPins + ?Sized>(
    pins: &mut P,
    count: u32,
    valid_us: u32,
    timing: BitTiming,
) -> u32 {
    let mut value = 0u32;
    for i in 0..count {
        pins.write(Pin::Clock, true);
        pins.delay_us(valid_us);
        if pins.read(Pin::Data) {
            value |= 1 << i;
        }
        pins.delay_us(timing.setup_us);
        pins.write(Pin::Clock, false);
        pins.delay_us(timing.hold_us);
    }
    value
}

/// Run the clock for a number of cycles without touching PGD
pub fn run_clock<P: IcspPins + ?Sized>(pins: &mut P, cycles: u32, timing: BitTiming) {
    for _ in 0..cycles {
        pins.write(Pin::Clock, true);
        pins.delay_us(timing.setup_us);
        pins.write(Pin::Clock, false);
        pins.delay_us(timing.hold_us);
    }
}
