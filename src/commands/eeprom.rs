//! Data EEPROM command implementations

use crate::progress::IndicatifProgress;
use picflasher_core::image::hex;
use picflasher_core::target::Target;
use std::path::Path;

/// Read the data EEPROM into a HEX file
pub fn run_eeprom_read(
    target: &mut Target<'_>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    let eeprom = target.eeprom_read(&mut progress);

    hex::store(output, None, Some(&eeprom))?;

    println!("Wrote {} EEPROM bytes to {}", eeprom.len(), output.display());
    Ok(())
}

/// Write the data EEPROM from a HEX file
///
/// Cells not covered by the file are written as 0xFF.
pub fn run_eeprom_write(
    target: &mut Target<'_>,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (memory, eeprom) = hex::load(input, target.info())?;
    if memory.present_words().next().is_some() {
        log::warn!("Ignoring code memory records in {}", input.display());
    }

    let mut progress = IndicatifProgress::default();
    target.eeprom_write(&eeprom, &mut progress)?;

    println!("Wrote {} EEPROM bytes from {}", eeprom.len(), input.display());
    Ok(())
}
