//! Code memory: blank check, read, program and verify

use crate::chip::address::ERASED_WORD;
use crate::chip::DeviceInfo;
use crate::error::{Error, Result};
use crate::icsp::commands::{insn, Command, Eecon1};
use crate::icsp::{timing, Session};
use crate::image::MemoryImage;
use crate::progress::{PercentTracker, Phase, Progress};

pub(super) fn blank_check(
    session: &mut Session<'_>,
    info: &DeviceInfo,
    progress: &mut dyn Progress,
) -> Result<()> {
    let mut tracker = PercentTracker::start(progress, Phase::BlankCheck, info.code_memory_size);
    session.goto_address(0);

    for index in 0..info.code_words() {
        let addr = index as u32 * 2;
        let found = session.read_word_post_inc();
        if found != ERASED_WORD {
            tracker.abort();
            return Err(Error::NotBlank { addr, found });
        }
        tracker.advance(addr);
    }

    tracker.complete();
    Ok(())
}

pub(super) fn read_code(
    session: &mut Session<'_>,
    image: &mut MemoryImage,
    progress: &mut dyn Progress,
) -> Result<()> {
    let mut tracker = PercentTracker::start(progress, Phase::Read, image.code_size());
    session.goto_address(0);

    for index in 0..image.len() {
        let word = session.read_word_post_inc();
        log::trace!("  addr = 0x{:06X}  data = 0x{:04X}", index * 2, word);
        image.set_word(index, word)?;
        tracker.advance(index as u32 * 2);
    }

    tracker.complete();
    Ok(())
}

/// Program all of code memory, one write buffer at a time
///
/// Every word of a buffer is staged with a post-increment table write;
/// the last one uses the start-programming variant and is followed by the
/// programming pulse. Absent words are staged as `0xFFFF`, which leaves the
/// erased cell untouched.
pub(super) fn write_code(
    session: &mut Session<'_>,
    info: &DeviceInfo,
    image: &MemoryImage,
    progress: &mut dyn Progress,
) {
    let buffer_words = info.write_buffer_words().max(1);
    let mut tracker = PercentTracker::start(progress, Phase::Program, image.code_size());

    session.core_instruction(insn::set_eecon1(Eecon1::EEPGD));
    session.core_instruction(insn::clear_eecon1(Eecon1::CFGS));
    session.core_instruction(insn::set_eecon1(Eecon1::WREN));
    session.goto_address(0);

    for (chunk_index, chunk) in image.words().chunks(buffer_words).enumerate() {
        let base = chunk_index * buffer_words;
        let (last, staged) = match chunk.split_last() {
            Some(split) => split,
            None => continue,
        };

        for (offset, word) in staged.iter().enumerate() {
            let value = word.unwrap_or(ERASED_WORD);
            log::trace!("  Writing 0x{:04X} to 0x{:06X}", value, (base + offset) * 2);
            session.send_instruction(Command::TableWritePostInc2, value);
        }

        let value = last.unwrap_or(ERASED_WORD);
        log::trace!(
            "  Writing 0x{:04X} to 0x{:06X} and starting programming",
            value,
            (base + staged.len()) * 2
        );
        session.send_instruction(Command::TableWriteStartPPostInc2, value);
        session.programming_pulse(timing::P9);

        tracker.advance(base as u32 * 2);
    }

    tracker.complete();
}

pub(super) fn verify_code(
    session: &mut Session<'_>,
    image: &MemoryImage,
    progress: &mut dyn Progress,
) -> Result<()> {
    let mut tracker = PercentTracker::start(progress, Phase::Verify, image.code_size());
    session.goto_address(0);

    for (index, expected) in image.words().iter().enumerate() {
        let addr = index as u32 * 2;
        let found = session.read_word_post_inc();
        if let Some(expected) = *expected {
            if found != expected {
                tracker.abort();
                return Err(Error::VerifyMismatch {
                    addr,
                    expected,
                    found,
                });
            }
        }
        tracker.advance(addr);
    }

    tracker.complete();
    Ok(())
}
