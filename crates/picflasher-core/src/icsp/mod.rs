//! ICSP link session
//!
//! A [`Session`] is the only way to talk to a target. It is created by
//! [`Session::enter`], which runs the MCLR/key entry sequence, and it is
//! torn down by [`Session::exit`] or by dropping it. All signaling and
//! addressing primitives are methods on `Session`, so nothing can be shifted
//! onto the link while the target is not in programming mode.
//!
//! ## Wire format
//!
//! Every transfer is a 4-bit command followed by a 16-bit operand, both
//! least significant bit first. Read commands replace the operand with
//! 8 dummy clocks followed by 8 clocks during which the target drives PGD.

pub mod commands;
pub mod timing;

use crate::programmer::bitbang::{self, BitOrder, BitTiming};
use crate::programmer::{Direction, IcspPins, Pin};
use commands::{insn, sfr, Command};

/// Bit cell used for commands, operands and the entry key
const CELL: BitTiming = BitTiming {
    setup_us: timing::P2B,
    hold_us: timing::P2A,
};

/// Link state, as tracked by the session object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Target running normally, link released
    Idle,
    /// MCLR held low while the entry key is being shifted
    EnteringKey,
    /// Target in low-voltage programming mode
    Programming,
}

/// An active programming-mode session over an ICSP link
///
/// The session borrows the pins exclusively for its lifetime, which is what
/// makes the protocol single-owner: no other code can toggle the link while
/// a session exists.
pub struct Session<'a> {
    pins: &'a mut dyn IcspPins,
    state: SessionState,
}

impl<'a> Session<'a> {
    /// Put the target into programming mode
    ///
    /// MCLR is pulsed, then held low while `key` is shifted in MSB first,
    /// then raised. The returned session is in [`SessionState::Programming`].
    pub fn enter(pins: &'a mut dyn IcspPins, key: u32) -> Self {
        let mut session = Self {
            pins,
            state: SessionState::Idle,
        };
        session.run_entry(key);
        session
    }

    fn run_entry(&mut self, key: u32) {
        let pins = &mut *self.pins;

        pins.set_direction(Pin::Clock, Direction::Output);
        pins.set_direction(Pin::Data, Direction::Output);
        pins.write(Pin::Clock, false);
        pins.write(Pin::Data, false);

        pins.set_direction(Pin::Mclr, Direction::Input);
        pins.set_direction(Pin::Mclr, Direction::Output);

        pins.write(Pin::Mclr, false);
        pins.delay_us(timing::P13);
        pins.write(Pin::Mclr, true);
        pins.delay_us(timing::MCLR_SETTLE);
        pins.write(Pin::Mclr, false);
        pins.delay_us(timing::P12);

        self.state = SessionState::EnteringKey;
        log::trace!("icsp: shifting entry key 0x{:08X}", key);

        pins.write(Pin::Clock, false);
        bitbang::write_bits(pins, key, 32, BitOrder::MsbFirst, CELL);
        pins.write(Pin::Data, false);
        pins.delay_us(timing::MCLR_SETTLE);
        pins.write(Pin::Mclr, true);
        pins.delay_us(timing::MCLR_SETTLE);

        self.state = SessionState::Programming;
        log::debug!("icsp: entered programming mode");
    }

    /// Current link state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Leave programming mode and release MCLR
    pub fn exit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        let pins = &mut *self.pins;
        pins.write(Pin::Clock, false);
        pins.write(Pin::Data, false);
        pins.delay_us(timing::P16);
        pins.write(Pin::Mclr, false);
        pins.delay_us(timing::P17);
        pins.write(Pin::Mclr, true);
        pins.set_direction(Pin::Mclr, Direction::Input);
        self.state = SessionState::Idle;
        log::debug!("icsp: exited programming mode");
    }

    // =========================================================================
    // Signal primitives
    // =========================================================================

    /// Shift a 4-bit command
    pub fn send_command(&mut self, cmd: Command) {
        debug_assert_eq!(self.state, SessionState::Programming);
        bitbang::write_bits(self.pins, cmd as u32, 4, BitOrder::LsbFirst, CELL);
        self.pins.write(Pin::Data, false);
        self.pins.delay_us(timing::P5);
    }

    /// Shift a 16-bit operand
    pub fn write_word(&mut self, data: u16) {
        debug_assert_eq!(self.state, SessionState::Programming);
        bitbang::write_bits(self.pins, data as u32, 16, BitOrder::LsbFirst, CELL);
        self.pins.write(Pin::Data, false);
        self.pins.delay_us(timing::P5A);
    }

    /// Clock in the data byte that follows a read command
    ///
    /// The first 8 clocks are the don't-care operand byte, then PGD is
    /// turned around and the target shifts its byte out LSB first.
    pub fn read_byte(&mut self) -> u8 {
        debug_assert_eq!(self.state, SessionState::Programming);
        bitbang::run_clock(self.pins, 8, CELL);
        self.pins.delay_us(timing::P6);

        self.pins.set_direction(Pin::Data, Direction::Input);
        let value = bitbang::read_bits(self.pins, 8, timing::P14, CELL);
        self.pins.delay_us(timing::P5A);
        self.pins.set_direction(Pin::Data, Direction::Output);

        value as u8
    }

    /// Shift a command followed by its 16-bit operand
    pub fn send_instruction(&mut self, cmd: Command, data: u16) {
        log::trace!("instruction: {:02x} {:04x}", cmd as u8, data);
        self.send_command(cmd);
        self.write_word(data);
    }

    /// Execute one core instruction on the target
    #[inline]
    pub fn core_instruction(&mut self, opcode: u16) {
        self.send_instruction(Command::CoreInstruction, opcode);
    }

    /// Issue a read command and return the byte the target shifts out
    pub fn table_read(&mut self, cmd: Command) -> u8 {
        debug_assert!(cmd.is_read());
        self.send_command(cmd);
        self.read_byte()
    }

    /// Read a little-endian word at the table pointer, post-incrementing twice
    pub fn read_word_post_inc(&mut self) -> u16 {
        let low = self.table_read(Command::TableReadPostInc);
        let high = self.table_read(Command::TableReadPostInc);
        u16::from_le_bytes([low, high])
    }

    // =========================================================================
    // Addressing
    // =========================================================================

    /// Load the full 22-bit table pointer
    ///
    /// Upper, high and low bytes are written in that order.
    pub fn goto_address(&mut self, addr: u32) {
        let [low, high, upper, _] = addr.to_le_bytes();
        self.core_instruction(insn::movlw(upper));
        self.core_instruction(insn::movwf(sfr::TBLPTRU));
        self.core_instruction(insn::movlw(high));
        self.core_instruction(insn::movwf(sfr::TBLPTRH));
        self.core_instruction(insn::movlw(low));
        self.core_instruction(insn::movwf(sfr::TBLPTRL));
    }

    /// Update only the low byte of the table pointer
    pub fn goto_short_offset(&mut self, low: u8) {
        self.core_instruction(insn::movlw(low));
        self.core_instruction(insn::movwf(sfr::TBLPTRL));
    }

    // =========================================================================
    // Timed sequences
    // =========================================================================

    /// Commit the staged write buffer
    ///
    /// Three clocks of a NOP command, then the fourth clock is held high for
    /// `program_us`, followed by the P10 discharge and the NOP operand.
    pub fn programming_pulse(&mut self, program_us: u32) {
        self.pins.write(Pin::Data, false);
        bitbang::run_clock(self.pins, 3, CELL);
        self.pins.write(Pin::Clock, true);
        self.pins.delay_us(program_us);
        self.pins.write(Pin::Clock, false);
        self.pins.delay_us(timing::P10);
        self.write_word(insn::NOP);
    }

    /// Drive PGD low for a fixed time (block erase completion)
    pub fn hold_data_low(&mut self, us: u32) {
        self.pins.write(Pin::Data, false);
        self.pins.delay_us(us);
    }

    /// Drive PGC low for a fixed time
    pub fn hold_clock_low(&mut self, us: u32) {
        self.pins.write(Pin::Clock, false);
        self.pins.delay_us(us);
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
