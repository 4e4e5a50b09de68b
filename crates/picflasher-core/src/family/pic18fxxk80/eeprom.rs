//! Data EEPROM cell access through EEADR/EEDATA/EECON1

use crate::error::{Error, Result};
use crate::icsp::commands::{insn, sfr, Command, Eecon1};
use crate::icsp::{timing, Session};

/// Maximum number of WR polls before a cell write is declared hung
pub const EEPROM_POLL_LIMIT: u32 = 1000;

fn select_cell(session: &mut Session<'_>, addr: u16) {
    let [low, high] = addr.to_le_bytes();
    session.core_instruction(insn::clear_eecon1(Eecon1::EEPGD));
    session.core_instruction(insn::clear_eecon1(Eecon1::CFGS));
    session.core_instruction(insn::movlw(low));
    session.core_instruction(insn::movwf(sfr::EEADR));
    session.core_instruction(insn::movlw(high));
    session.core_instruction(insn::movwf(sfr::EEADRH));
}

/// Copy a register into TABLAT and shift it out
fn shift_out_register(session: &mut Session<'_>, reg: u8) -> u8 {
    session.core_instruction(insn::movf_w(reg));
    session.core_instruction(insn::movwf(sfr::TABLAT));
    session.core_instruction(insn::NOP);
    session.table_read(Command::ShiftOutTablat)
}

pub(super) fn read_cell(session: &mut Session<'_>, addr: u16) -> u8 {
    select_cell(session, addr);
    session.core_instruction(insn::set_eecon1(Eecon1::RD));
    shift_out_register(session, sfr::EEDATA)
}

pub(super) fn write_cell(session: &mut Session<'_>, addr: u16, value: u8) -> Result<()> {
    select_cell(session, addr);
    session.core_instruction(insn::movlw(value));
    session.core_instruction(insn::movwf(sfr::EEDATA));
    session.core_instruction(insn::set_eecon1(Eecon1::WREN));
    session.core_instruction(insn::set_eecon1(Eecon1::WR));

    let mut polls = 0;
    loop {
        let eecon1 = Eecon1::from_bits_retain(shift_out_register(session, sfr::EECON1));
        if !eecon1.contains(Eecon1::WR) {
            break;
        }
        polls += 1;
        if polls >= EEPROM_POLL_LIMIT {
            log::error!("EEPROM write at 0x{:03X} still busy after {} polls", addr, polls);
            session.core_instruction(insn::clear_eecon1(Eecon1::WREN));
            return Err(Error::EepromWriteTimeout { addr });
        }
    }
    log::trace!("EEPROM 0x{:03X} <- 0x{:02X} ({} polls)", addr, value, polls);

    session.hold_clock_low(timing::P10);
    session.core_instruction(insn::clear_eecon1(Eecon1::WREN));
    Ok(())
}
