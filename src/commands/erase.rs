//! Erase and blank check command implementations

use crate::progress::IndicatifProgress;
use picflasher_core::family::EraseScope;
use picflasher_core::target::Target;

/// Run the erase command
pub fn run_erase(target: &mut Target<'_>, scope: EraseScope) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    target.bulk_erase(scope, &mut progress);

    // Only a full erase clears all of code memory
    if scope == EraseScope::Full {
        target.blank_check(&mut progress)?;
    }
    println!("Erase ({}) complete", scope);
    Ok(())
}

/// Run the blank check command
pub fn run_blank_check(target: &mut Target<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::default();
    target.blank_check(&mut progress)?;
    println!("Code memory is blank");
    Ok(())
}
