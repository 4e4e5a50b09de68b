//! Read command implementation

use crate::progress::IndicatifProgress;
use picflasher_core::image::hex;
use picflasher_core::target::Target;
use std::path::Path;

/// Read code memory, configuration words and user ID into a HEX file
pub fn run_read(target: &mut Target<'_>, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    let image = target.read(&mut progress)?;

    hex::store(output, Some(&image), None)?;

    println!(
        "Wrote {} bytes of code memory to {}",
        image.code_size(),
        output.display()
    );
    Ok(())
}
