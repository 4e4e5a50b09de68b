//! ICSP timing parameters, in microseconds
//!
//! Names follow the P-numbers of the PIC18F66K80 family programming
//! specification. These encode protocol compliance: they are not tunables.

/// Serial clock low time (hold after the falling edge)
pub const P2A: u32 = 1;
/// Serial clock high time (data setup before the falling edge)
pub const P2B: u32 = 1;
/// Delay between 4-bit command and command operand
pub const P5: u32 = 1;
/// Delay between command operand and next 4-bit command
pub const P5A: u32 = 1;
/// Delay between last PGC falling edge of a command byte and PGD turnaround
pub const P6: u32 = 1;
/// Clock high time for code memory programming
pub const P9: u32 = 2000;
/// Clock high time for configuration word programming
pub const P9A: u32 = 10000;
/// Clock low time after programming / high-voltage discharge
pub const P10: u32 = 200;
/// Delay to allow a block erase to complete
pub const P11: u32 = 10000;
/// Hold time from MCLR low to entry key
pub const P12: u32 = 500;
/// VDD to MCLR setup
pub const P13: u32 = 1;
/// Delay from PGC rising edge to PGD valid during reads
pub const P14: u32 = 1;
/// Delay between last PGC falling edge and MCLR low
pub const P16: u32 = 1;
/// Delay between MCLR low and VDD removal
pub const P17: u32 = 1;

/// Settle time around MCLR transitions that have no datasheet minimum
pub const MCLR_SETTLE: u32 = 10;
