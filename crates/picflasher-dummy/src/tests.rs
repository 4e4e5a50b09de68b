//! Protocol tests of the full engine against the simulator

use picflasher_core::chip::address::EraseRegion;
use picflasher_core::family::pic18fxxk80::{erase_plan, CATALOG, EEPROM_POLL_LIMIT, ENTRY_KEY};
use picflasher_core::family::{EraseScope, Family, FamilyKind};
use picflasher_core::icsp::{Session, SessionState};
use picflasher_core::image::{EepromImage, MemoryImage};
use picflasher_core::progress::{NoProgress, Phase, Progress};
use picflasher_core::target::{identify, ConfigMismatch, Target, WriteOptions};
use picflasher_core::Error;

use super::*;

fn k80() -> &'static dyn Family {
    FamilyKind::Pic18FxxK80.family()
}

fn pic_for(name: &str) -> DummyPic {
    let info = find_by_name(&CATALOG, name).unwrap();
    DummyPic::new(DummyConfig::for_device(info, 1))
}

#[derive(Default)]
struct ProgressLog {
    events: Vec<(Phase, u8)>,
    current: Option<Phase>,
    finished: usize,
}

impl Progress for ProgressLog {
    fn start(&mut self, phase: Phase) {
        self.current = Some(phase);
    }
    fn update(&mut self, percent: u8) {
        self.events.push((self.current.unwrap(), percent));
    }
    fn finish(&mut self) {
        self.finished += 1;
    }
}

impl ProgressLog {
    fn percents(&self, phase: Phase) -> Vec<u8> {
        self.events
            .iter()
            .filter(|(p, _)| *p == phase)
            .map(|(_, v)| *v)
            .collect()
    }
}

#[test]
fn test_identify_every_catalog_entry() {
    for info in CATALOG.iter() {
        let mut pic = DummyPic::new(DummyConfig::for_device(info, 4));
        let identity = identify(&mut pic, k80()).unwrap();
        assert_eq!(identity.name(), info.name);
        assert_eq!(identity.device_id, info.id);
        assert_eq!(identity.revision, 4);
        assert_eq!(identity.code_memory_size(), info.code_memory_size);
        assert!(!pic.is_programming());
        assert!(pic.mclr_released());
        assert_eq!(pic.stats().protocol_errors, 0);
    }
}

#[test]
fn test_unknown_device_is_refused() {
    let mut config = DummyConfig::default();
    config.device_id = 0x1243;
    let mut pic = DummyPic::new(config);

    match Target::attach(&mut pic, k80()) {
        Err(Error::DeviceNotFound { device_id }) => assert_eq!(device_id, 0x1240),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("unknown part was accepted"),
    }
    assert!(!pic.is_programming());
    assert!(pic.mclr_released());
}

#[test]
fn test_wrong_key_does_not_enter() {
    let mut pic = DummyPic::new(DummyConfig::default());
    {
        let session = Session::enter(&mut pic, 0x1234_5678);
        assert_eq!(session.state(), SessionState::Programming);
    }
    assert_eq!(pic.stats().entries, 0);

    {
        let _session = Session::enter(&mut pic, ENTRY_KEY);
    }
    assert_eq!(pic.stats().entries, 1);
    assert!(!pic.is_programming());
}

#[test]
fn test_write_reference_scenario() {
    let mut pic = pic_for("PIC18F25K80");
    let mut progress = ProgressLog::default();

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let info = target.info();
    assert_eq!(info.code_memory_size, 0x8000);
    assert_eq!(info.block_count, 4);
    assert_eq!(info.write_buffer_words(), 32);

    let mut image = MemoryImage::new(info);
    image.set_word(0, 0x1234).unwrap();
    image.set_word(2, 0x5678).unwrap();

    target.bulk_erase(EraseScope::Full, &mut NoProgress);
    target.blank_check(&mut NoProgress).unwrap();
    let report = target
        .write(&image, WriteOptions { verify: true }, &mut progress)
        .unwrap();
    target.detach();

    assert!(report.is_clean());
    assert_eq!(report.config_skipped, (0..8).collect::<Vec<_>>());
    assert_eq!(progress.percents(Phase::Program).last(), Some(&100));
    assert_eq!(progress.percents(Phase::Verify).last(), Some(&100));

    assert_eq!(pic.code_word(0), 0x1234);
    assert_eq!(pic.code_word(1), 0xFFFF);
    assert_eq!(pic.code_word(2), 0x5678);
    let stats = pic.stats();
    assert_eq!(stats.short_pulses, 0);
    assert_eq!(stats.protocol_errors, 0);
    assert_eq!(stats.programming_pulses, 0x8000 / 64);
}

#[test]
fn test_program_read_round_trip() {
    let mut pic = pic_for("PIC18F26K80");
    let mut target = Target::attach(&mut pic, k80()).unwrap();

    let mut image = MemoryImage::new(target.info());
    for index in (0..image.len()).filter(|i| i % 7 == 0 || i % 11 == 3) {
        image
            .set_word(index, (index as u16).wrapping_mul(0x1F3) ^ 0xA5A5)
            .unwrap();
    }

    target.bulk_erase(EraseScope::Full, &mut NoProgress);
    target
        .write(&image, WriteOptions::default(), &mut NoProgress)
        .unwrap();
    let readback = target.read(&mut NoProgress).unwrap();
    target.detach();

    assert_eq!(readback.len(), image.len());
    for (index, slot) in image.words().iter().enumerate() {
        assert_eq!(readback.word(index), Some(slot.unwrap_or(0xFFFF)), "word {}", index);
    }
    assert_eq!(pic.stats().protocol_errors, 0);
}

#[test]
fn test_full_erase_clears_everything() {
    let mut pic = pic_for("PIC18F25K80");
    for index in 0..pic.code_words() {
        pic.set_code_word(index, 0x0000);
    }
    pic.set_config_word(3, 0x1234);
    pic.eeprom_mut().fill(0x55);

    let mut progress = ProgressLog::default();
    let mut target = Target::attach(&mut pic, k80()).unwrap();
    target.bulk_erase(EraseScope::Full, &mut progress);
    target.blank_check(&mut NoProgress).unwrap();
    target.detach();

    assert!(pic.code_is_blank());
    assert_eq!(pic.config_word(3), 0xFFFF);
    assert!(pic.eeprom().iter().all(|&b| b == 0xFF));
    assert_eq!(
        pic.stats().erases,
        erase_plan(EraseScope::Full, 4).collect::<Vec<_>>()
    );
    assert_eq!(progress.percents(Phase::Erase).last(), Some(&100));
}

#[test]
fn test_partial_erase_scopes() {
    let fill = |pic: &mut DummyPic| {
        for index in 0..pic.code_words() {
            pic.set_code_word(index, 0x0000);
        }
        pic.eeprom_mut().fill(0x00);
    };
    let boot_words = (BOOT_BLOCK_SIZE / 2) as usize;

    let mut pic = pic_for("PIC18F25K80");
    fill(&mut pic);
    Target::attach(&mut pic, k80())
        .unwrap()
        .bulk_erase(EraseScope::BootOnly, &mut NoProgress);
    assert_eq!(pic.code_word(0), 0xFFFF);
    assert_eq!(pic.code_word(boot_words - 1), 0xFFFF);
    assert_eq!(pic.code_word(boot_words), 0x0000);
    assert_eq!(pic.eeprom()[0], 0x00);

    let mut pic = pic_for("PIC18F25K80");
    fill(&mut pic);
    Target::attach(&mut pic, k80())
        .unwrap()
        .bulk_erase(EraseScope::ProgramOnly, &mut NoProgress);
    assert_eq!(pic.code_word(0), 0x0000);
    assert_eq!(pic.code_word(boot_words), 0xFFFF);
    assert_eq!(pic.code_word(pic.code_words() - 1), 0xFFFF);

    let mut pic = pic_for("PIC18F25K80");
    fill(&mut pic);
    Target::attach(&mut pic, k80())
        .unwrap()
        .bulk_erase(EraseScope::EepromOnly, &mut NoProgress);
    assert_eq!(pic.code_word(0), 0x0000);
    assert!(pic.eeprom().iter().all(|&b| b == 0xFF));
    assert_eq!(pic.stats().erases, [EraseRegion::DataEeprom]);
}

#[test]
fn test_blank_check_stops_at_first_programmed_word() {
    let mut pic = pic_for("PIC18F25K80");
    pic.set_code_word(5, 0x1000);
    pic.set_code_word(9, 0x2000);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let result = target.blank_check(&mut NoProgress);
    target.detach();

    assert_eq!(
        result,
        Err(Error::NotBlank {
            addr: 10,
            found: 0x1000
        })
    );
    // Two device ID bytes, then words 0..=5
    assert_eq!(pic.stats().table_reads, 2 + 12);
}

#[test]
fn test_verify_fails_fast_and_skips_config() {
    let mut pic = pic_for("PIC18F25K80");
    pic.set_code_word(3, 0x0000);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let mut image = MemoryImage::new(target.info());
    image.set_word(3, 0x1234).unwrap();
    image.set_word(4, 0x4321).unwrap();
    image.set_config(0, 0x0F0F).unwrap();

    let result = target.write(&image, WriteOptions::default(), &mut NoProgress);
    target.detach();

    assert_eq!(
        result.unwrap_err(),
        Error::VerifyMismatch {
            addr: 6,
            expected: 0x1234,
            found: 0x0000
        }
    );
    assert_eq!(pic.config_word(0), 0xFFFF);
}

#[test]
fn test_write_without_verify_ignores_mismatch() {
    let mut pic = pic_for("PIC18F25K80");
    pic.set_code_word(3, 0x0000);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let mut image = MemoryImage::new(target.info());
    image.set_word(3, 0x1234).unwrap();
    let report = target
        .write(&image, WriteOptions { verify: false }, &mut NoProgress)
        .unwrap();
    target.detach();

    assert!(report.is_clean());
    assert_eq!(pic.code_word(3), 0x0000);
}

#[test]
fn test_config_round_trip_and_skip() {
    let mut pic = pic_for("PIC18F46K80");
    pic.set_config_word(2, 0xAB12);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let mut image = MemoryImage::new(target.info());
    image.set_config(0, 0x5D1C).unwrap();
    image.set_config(5, 0x8F7F).unwrap();

    let report = target
        .write(&image, WriteOptions::default(), &mut NoProgress)
        .unwrap();
    let words = target.configuration_registers();
    target.detach();

    assert!(report.is_clean());
    assert_eq!(report.config_written, [0, 5]);
    assert_eq!(report.config_skipped, [1, 2, 3, 4, 6, 7]);
    assert_eq!(words[0], 0x5D1C);
    assert_eq!(words[2], 0xAB12);
    assert_eq!(words[5], 0x8F7F);
    assert_eq!(pic.stats().short_pulses, 0);
    assert_eq!(pic.stats().protocol_errors, 0);
}

#[test]
fn test_partial_config_word_keeps_device_byte() {
    let mut pic = pic_for("PIC18F26K80");
    pic.set_config_word(1, 0x0C1E);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let mut image = MemoryImage::new(target.info());
    // CONFIG2H only
    image.set_byte(0x30_0003, 0x18).unwrap();

    let report = target
        .write(&image, WriteOptions::default(), &mut NoProgress)
        .unwrap();
    target.detach();

    assert!(report.is_clean());
    assert_eq!(report.config_written, [1]);
    assert_eq!(pic.config_word(1), 0x181E);
    assert_eq!(pic.stats().protocol_errors, 0);
}

#[test]
fn test_config_mismatch_is_reported_not_fatal() {
    let mut config = DummyConfig::default();
    config.config_locked = 1 << 1;
    let mut pic = DummyPic::new(config);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let mut image = MemoryImage::new(target.info());
    image.set_config(1, 0x1E18).unwrap();
    image.set_config(2, 0x0C0C).unwrap();

    let report = target
        .write(&image, WriteOptions::default(), &mut NoProgress)
        .unwrap();
    target.detach();

    assert_eq!(
        report.config_mismatches,
        [ConfigMismatch {
            index: 1,
            expected: 0x1E18,
            found: 0xFFFF
        }]
    );
    assert!(!report.is_clean());
    assert_eq!(pic.config_word(2), 0x0C0C);
}

#[test]
fn test_eeprom_round_trip() {
    let mut config = DummyConfig::default();
    config.eeprom_busy_polls = 3;
    let mut pic = DummyPic::new(config);

    let cells: Vec<u8> = (0..1024u32).map(|i| (i * 7 + 3) as u8).collect();
    let image = EepromImage::from_bytes(&cells);

    let mut progress = ProgressLog::default();
    let mut target = Target::attach(&mut pic, k80()).unwrap();
    target.eeprom_write(&image, &mut progress).unwrap();
    let readback = target.eeprom_read(&mut progress);
    target.detach();

    assert_eq!(readback, image);
    assert_eq!(pic.eeprom(), &cells[..]);
    assert_eq!(pic.stats().eeprom_writes, 1024);
    assert_eq!(pic.stats().eeprom_polls, 4 * 1024);
    assert_eq!(progress.percents(Phase::EepromWrite).last(), Some(&100));
    assert_eq!(progress.percents(Phase::EepromRead).last(), Some(&100));
    assert_eq!(pic.stats().protocol_errors, 0);
}

#[test]
fn test_eeprom_write_timeout() {
    let mut config = DummyConfig::default();
    config.eeprom_stuck = true;
    let mut pic = DummyPic::new(config);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let image = EepromImage::from_bytes(&[0x42; 1024]);
    let result = target.eeprom_write(&image, &mut NoProgress);
    target.detach();

    assert_eq!(result, Err(Error::EepromWriteTimeout { addr: 0 }));
    assert_eq!(pic.stats().eeprom_polls, EEPROM_POLL_LIMIT as u64);
    assert!(!pic.is_programming());
}

#[test]
fn test_progress_is_monotonic() {
    let mut pic = pic_for("PIC18F25K80");
    let mut progress = ProgressLog::default();

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let mut image = MemoryImage::new(target.info());
    image.set_word(100, 0xCAFE).unwrap();
    target.bulk_erase(EraseScope::Full, &mut progress);
    target.blank_check(&mut progress).unwrap();
    target
        .write(&image, WriteOptions::default(), &mut progress)
        .unwrap();
    target.read(&mut progress).unwrap();
    target.detach();

    for phase in [
        Phase::Erase,
        Phase::BlankCheck,
        Phase::Program,
        Phase::Verify,
        Phase::Read,
    ] {
        let values = progress.percents(phase);
        assert_eq!(values.first(), Some(&0), "{:?}", phase);
        assert_eq!(values.last(), Some(&100), "{:?}", phase);
        assert!(values.windows(2).all(|w| w[0] < w[1]), "{:?}", phase);
    }
    assert_eq!(progress.finished, 5);
}

#[test]
fn test_read_includes_user_id_and_config() {
    let mut pic = pic_for("PIC18LF66K80");
    pic.set_user_id([1, 2, 3, 4, 5, 6, 7, 8]);
    pic.set_config_word(7, 0x4040);
    pic.set_code_word(0x7FFF, 0x0102);

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    assert_eq!(target.user_id(), [1, 2, 3, 4, 5, 6, 7, 8]);
    let image = target.read(&mut NoProgress).unwrap();
    target.detach();

    assert_eq!(image.word(0x7FFF), Some(0x0102));
    assert_eq!(image.word(0), Some(0xFFFF));
    assert_eq!(image.config(7), Some(0x4040));
    assert_eq!(image.user_id()[7], Some(8));
}

#[test]
fn test_image_geometry_is_checked() {
    let mut pic = pic_for("PIC18F25K80");
    let other = find_by_name(&CATALOG, "PIC18F26K80").unwrap();

    let mut target = Target::attach(&mut pic, k80()).unwrap();
    let image = MemoryImage::new(other);
    assert_eq!(
        target.write(&image, WriteOptions::default(), &mut NoProgress),
        Err(Error::ImageSizeMismatch)
    );
    assert_eq!(
        target.eeprom_write(&EepromImage::with_size(16), &mut NoProgress),
        Err(Error::ImageSizeMismatch)
    );
    assert_eq!(target.session_state(), SessionState::Programming);
}

#[test]
fn test_programming_pulse_width_is_enforced() {
    let mut pic = pic_for("PIC18F25K80");
    {
        let mut session = Session::enter(&mut pic, ENTRY_KEY);
        session.core_instruction(0x8E7F);
        session.core_instruction(0x9C7F);
        session.core_instruction(0x847F);
        session.goto_address(0);
        session.send_instruction(
            picflasher_core::icsp::commands::Command::TableWriteStartPPostInc2,
            0x0000,
        );
        session.programming_pulse(10);
    }
    assert_eq!(pic.code_word(0), 0xFFFF);
    assert_eq!(pic.stats().short_pulses, 1);
}

#[test]
fn test_parse_options() {
    let config = parse_options(&[("device", "PIC18F46K80"), ("rev", "3"), ("busy", "0")]).unwrap();
    assert_eq!(config.device_id, 0x6103);
    assert_eq!(config.code_memory_size, 0x10000);
    assert_eq!(config.eeprom_busy_polls, 0);

    let config = parse_options(&[("id", "0x1234")]).unwrap();
    assert_eq!(config.device_id, 0x1234);

    assert!(parse_options(&[("device", "PIC16F84")]).is_err());
    assert!(parse_options(&[("rev", "40")]).is_err());
    assert_eq!(parse_options(&[]).unwrap(), DummyConfig::default());
}
