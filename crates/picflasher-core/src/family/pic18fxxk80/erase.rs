//! Block erase through the erase controller at 0x3C0004

use crate::chip::address::{EraseRegion, ERASE_CONTROL};
use crate::family::EraseScope;
use crate::icsp::commands::{insn, Command};
use crate::icsp::{timing, Session};
use crate::progress::{PercentTracker, Phase, Progress};

/// Regions cleared by a bulk erase of `scope`, in issue order
///
/// A full erase clears the configuration bits and the boot block before
/// the code blocks. Data EEPROM is cleared implicitly by any code block
/// erase, so it is only listed for [`EraseScope::EepromOnly`].
pub fn erase_plan(scope: EraseScope, block_count: u8) -> impl Iterator<Item = EraseRegion> {
    let head: &'static [EraseRegion] = match scope {
        EraseScope::Full => &[EraseRegion::ConfigBits, EraseRegion::BootBlock],
        EraseScope::BootOnly => &[EraseRegion::BootBlock],
        EraseScope::ProgramOnly => &[],
        EraseScope::EepromOnly => &[EraseRegion::DataEeprom],
    };
    let blocks = match scope {
        EraseScope::Full | EraseScope::ProgramOnly => block_count.min(8),
        EraseScope::BootOnly | EraseScope::EepromOnly => 0,
    };
    head.iter()
        .copied()
        .chain((0..blocks).map(EraseRegion::CodeBlock))
}

/// Erase one region and wait for completion
pub(super) fn erase_region(session: &mut Session<'_>, region: EraseRegion) {
    let [low, high, upper, _] = region.selector().to_le_bytes();

    session.goto_address(ERASE_CONTROL);
    session.send_instruction(Command::TableWrite, duplicate(low));
    session.goto_short_offset(0x05);
    session.send_instruction(Command::TableWrite, duplicate(high));
    session.goto_short_offset(0x06);
    session.send_instruction(Command::TableWrite, duplicate(upper));

    session.core_instruction(insn::NOP);
    session.core_instruction(insn::NOP);

    session.hold_data_low(timing::P11 + timing::P10);
}

/// Erase every region in `plan`, reporting progress per region
pub(super) fn run(session: &mut Session<'_>, plan: &[EraseRegion], progress: &mut dyn Progress) {
    let mut tracker = PercentTracker::start(progress, Phase::Erase, plan.len() as u32);
    for (done, &region) in plan.iter().enumerate() {
        log::debug!("Erasing {:?} (selector 0x{:06X})", region, region.selector());
        erase_region(session, region);
        tracker.advance(done as u32 + 1);
    }
    tracker.complete();
}

/// Byte-wide table writes take the byte from whichever half matches the
/// pointer parity, so both halves carry it.
fn duplicate(byte: u8) -> u16 {
    u16::from_le_bytes([byte, byte])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn plan(scope: EraseScope, blocks: u8) -> Vec<EraseRegion> {
        erase_plan(scope, blocks).collect()
    }

    #[test]
    fn test_full_erase_order() {
        assert_eq!(
            plan(EraseScope::Full, 4),
            [
                EraseRegion::ConfigBits,
                EraseRegion::BootBlock,
                EraseRegion::CodeBlock(0),
                EraseRegion::CodeBlock(1),
                EraseRegion::CodeBlock(2),
                EraseRegion::CodeBlock(3),
            ]
        );
        assert_eq!(plan(EraseScope::Full, 8).len(), 10);
    }

    #[test]
    fn test_partial_scopes() {
        assert_eq!(plan(EraseScope::BootOnly, 4), [EraseRegion::BootBlock]);
        assert_eq!(plan(EraseScope::EepromOnly, 8), [EraseRegion::DataEeprom]);
        assert_eq!(
            plan(EraseScope::ProgramOnly, 4),
            (0..4).map(EraseRegion::CodeBlock).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_duplicate() {
        assert_eq!(duplicate(0x80), 0x8080);
        assert_eq!(duplicate(0x05), 0x0505);
    }
}
