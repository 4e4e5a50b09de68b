//! Write command implementation

use crate::progress::IndicatifProgress;
use picflasher_core::family::EraseScope;
use picflasher_core::image::{hex, EepromImage};
use picflasher_core::progress::Progress;
use picflasher_core::target::{Target, WriteOptions};
use std::path::Path;

/// Options of the write command
#[derive(Debug, Clone, Copy)]
pub struct WriteArgs {
    /// Read code, configuration and EEPROM back after writing
    pub verify: bool,
    /// Full erase and blank check before programming
    pub erase: bool,
}

/// Program a HEX file
///
/// Runs full erase, blank check, code programming, verification and
/// configuration programming in that order. EEPROM records, if the file has
/// any, are written last. Configuration mismatches do not stop the run but
/// make the command fail at the end.
pub fn run_write(
    target: &mut Target<'_>,
    input: &Path,
    args: WriteArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    write_file(target, input, args, &mut progress)?;
    println!("Write complete");
    Ok(())
}

fn write_file(
    target: &mut Target<'_>,
    input: &Path,
    args: WriteArgs,
    progress: &mut dyn Progress,
) -> Result<(), Box<dyn std::error::Error>> {
    let (image, eeprom) = hex::load(input, target.info())?;
    log::info!(
        "Loaded {}: {} code words, {} configuration words",
        input.display(),
        image.present_words().count(),
        image.config_words().iter().flatten().count()
    );

    if args.erase {
        target.bulk_erase(EraseScope::Full, progress);
        target.blank_check(progress)?;
    }

    let report = target.write(
        &image,
        WriteOptions {
            verify: args.verify,
        },
        progress,
    )?;

    if eeprom.cells().iter().any(|&cell| cell != 0xFF) {
        target.eeprom_write(&eeprom, progress)?;
        if args.verify {
            verify_eeprom(target, &eeprom, progress)?;
        }
    }

    for mismatch in &report.config_mismatches {
        eprintln!(
            "Warning: configuration word {} reads 0x{:04X}, expected 0x{:04X}",
            mismatch.index, mismatch.found, mismatch.expected
        );
    }
    if !report.is_clean() {
        return Err(format!(
            "{} configuration word(s) failed verification",
            report.config_mismatches.len()
        )
        .into());
    }
    Ok(())
}

fn verify_eeprom(
    target: &mut Target<'_>,
    expected: &EepromImage,
    progress: &mut dyn Progress,
) -> Result<(), Box<dyn std::error::Error>> {
    let found = target.eeprom_read(progress);
    let mismatch = expected
        .cells()
        .iter()
        .zip(found.cells())
        .position(|(a, b)| a != b);
    match mismatch {
        Some(addr) => Err(format!(
            "EEPROM verify failed at 0x{:03X}: expected 0x{:02X}, found 0x{:02X}",
            addr,
            expected.cells()[addr],
            found.cells()[addr]
        )
        .into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picflasher_core::family::FamilyKind;
    use picflasher_core::progress::NoProgress;
    use picflasher_dummy::{DummyConfig, DummyPic};
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("picflasher-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    const ARGS: WriteArgs = WriteArgs {
        verify: true,
        erase: true,
    };

    #[test]
    fn test_write_code_config_and_eeprom() {
        let path = temp_file(
            "full.hex",
            ":0400000034127856E8\n\
             :020000040030CA\n\
             :020002001DFFDF\n\
             :0200000400F00A\n\
             :02000000AB55FE\n\
             :00000001FF\n",
        );

        let mut pic = DummyPic::new(DummyConfig::default());
        pic.set_code_word(100, 0x0000);
        let mut target = Target::attach(&mut pic, FamilyKind::Pic18FxxK80.family()).unwrap();
        write_file(&mut target, &path, ARGS, &mut NoProgress).unwrap();
        target.detach();
        std::fs::remove_file(&path).ok();

        assert_eq!(pic.code_word(0), 0x1234);
        assert_eq!(pic.code_word(1), 0x5678);
        assert_eq!(pic.code_word(100), 0xFFFF);
        assert_eq!(pic.config_word(1), 0xFF1D);
        assert_eq!(&pic.eeprom()[..3], &[0xAB, 0x55, 0xFF]);
    }

    #[test]
    fn test_config_mismatch_fails_the_command() {
        let path = temp_file(
            "locked.hex",
            ":020000040030CA\n\
             :020002001DFFDF\n\
             :00000001FF\n",
        );

        let mut config = DummyConfig::default();
        config.config_locked = 1 << 1;
        let mut pic = DummyPic::new(config);
        let mut target = Target::attach(&mut pic, FamilyKind::Pic18FxxK80.family()).unwrap();
        let result = write_file(&mut target, &path, ARGS, &mut NoProgress);
        target.detach();
        std::fs::remove_file(&path).ok();

        let message = result.unwrap_err().to_string();
        assert_eq!(message, "1 configuration word(s) failed verification");
    }
}
