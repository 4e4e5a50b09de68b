//! Wire-level decoding of the ICSP serial stream
//!
//! The target samples PGD on every falling PGC edge. A transfer is a 4-bit
//! command followed either by a 16-bit operand or, for reads, by 8 ignored
//! clocks and 8 clocks during which the target drives PGD.

use picflasher_core::icsp::commands::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Command { bits: u8, count: u8 },
    Operand { cmd: Command, value: u16, count: u8 },
    Dummy { count: u8 },
    Shift { value: u8, count: u8 },
}

const IDLE: Phase = Phase::Command { bits: 0, count: 0 };

/// Something the decoder completed on a falling edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// A 4-bit command was clocked in
    Command(Command),
    /// The operand of a write-type command was clocked in
    Operand(Command, u16),
    /// Four bits that are not a defined command
    Invalid(u8),
}

#[derive(Debug)]
pub(crate) struct Link {
    phase: Phase,
    read_value: u8,
}

impl Link {
    pub(crate) fn new() -> Self {
        Self {
            phase: IDLE,
            read_value: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.phase = IDLE;
        self.read_value = 0;
    }

    /// Byte to shift out once the dummy clocks of a read have passed
    pub(crate) fn load(&mut self, value: u8) {
        self.read_value = value;
    }

    /// Level the target drives on PGD, if it is driving at all
    pub(crate) fn drive(&self) -> Option<bool> {
        match self.phase {
            Phase::Shift { value, count } => Some((value >> count) & 1 != 0),
            _ => None,
        }
    }

    /// Whether the target currently owns PGD
    pub(crate) fn is_shifting(&self) -> bool {
        matches!(self.phase, Phase::Shift { .. })
    }

    /// Whether the decoder sits between transfers
    pub(crate) fn is_idle(&self) -> bool {
        self.phase == IDLE
    }

    pub(crate) fn falling_edge(&mut self, data: bool) -> Option<Event> {
        let (next, event) = match self.phase {
            Phase::Command { bits, count } => {
                let bits = bits | (data as u8) << count;
                if count + 1 < 4 {
                    (Phase::Command { bits, count: count + 1 }, None)
                } else {
                    match Command::from_bits(bits) {
                        Some(cmd) if cmd.is_read() => {
                            (Phase::Dummy { count: 0 }, Some(Event::Command(cmd)))
                        }
                        Some(cmd) => (
                            Phase::Operand {
                                cmd,
                                value: 0,
                                count: 0,
                            },
                            Some(Event::Command(cmd)),
                        ),
                        None => (IDLE, Some(Event::Invalid(bits))),
                    }
                }
            }
            Phase::Operand { cmd, value, count } => {
                let value = value | (data as u16) << count;
                if count + 1 < 16 {
                    (
                        Phase::Operand {
                            cmd,
                            value,
                            count: count + 1,
                        },
                        None,
                    )
                } else {
                    (IDLE, Some(Event::Operand(cmd, value)))
                }
            }
            Phase::Dummy { count } => {
                if count + 1 < 8 {
                    (Phase::Dummy { count: count + 1 }, None)
                } else {
                    (
                        Phase::Shift {
                            value: self.read_value,
                            count: 0,
                        },
                        None,
                    )
                }
            }
            Phase::Shift { value, count } => {
                if count + 1 < 8 {
                    (
                        Phase::Shift {
                            value,
                            count: count + 1,
                        },
                        None,
                    )
                } else {
                    (IDLE, None)
                }
            }
        };
        self.phase = next;
        event
    }
}
