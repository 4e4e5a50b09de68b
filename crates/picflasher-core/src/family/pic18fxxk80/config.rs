//! Device ID, user ID and configuration words

use crate::chip::address::{config_address, DEVICE_ID, USER_ID, USER_ID_LEN};
use crate::icsp::commands::{insn, Command, Eecon1};
use crate::icsp::{timing, Session};

pub(super) fn read_device_id(session: &mut Session<'_>) -> u16 {
    session.goto_address(DEVICE_ID);
    session.read_word_post_inc()
}

pub(super) fn read_user_id(session: &mut Session<'_>) -> [u8; USER_ID_LEN] {
    let mut id = [0; USER_ID_LEN];
    session.goto_address(USER_ID);
    for byte in id.iter_mut() {
        *byte = session.table_read(Command::TableReadPostInc);
    }
    id
}

/// Read configuration word `index`: low byte post-increment, high byte in place
pub(super) fn read_word(session: &mut Session<'_>, index: usize) -> u16 {
    session.goto_address(config_address(index));
    let low = session.table_read(Command::TableReadPostInc);
    let high = session.table_read(Command::TableRead);
    u16::from_le_bytes([low, high])
}

/// Program configuration word `index` as two byte writes
///
/// Configuration cells are written one byte per pulse. The target takes
/// the low operand byte at even addresses and the high byte at odd ones.
pub(super) fn write_word(session: &mut Session<'_>, index: usize, value: u16) {
    log::debug!("Writing configuration word {}: 0x{:04X}", index, value);
    let addr = config_address(index);

    session.core_instruction(insn::set_eecon1(Eecon1::EEPGD));
    session.core_instruction(insn::set_eecon1(Eecon1::CFGS));

    session.goto_address(addr);
    session.send_instruction(Command::TableWriteStartP, value & 0x00FF);
    session.programming_pulse(timing::P9A);

    session.goto_short_offset((addr + 1) as u8);
    session.send_instruction(Command::TableWriteStartP, value & 0xFF00);
    session.programming_pulse(timing::P9A);
}
