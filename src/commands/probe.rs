//! Probe command implementation

use picflasher_core::target::Target;

/// Print the identity and geometry of the attached chip
pub fn run_probe(target: &Target<'_>) {
    let identity = target.identity();
    let info = identity.info;

    println!("Found PIC device:");
    println!("  Name:         {}", identity.name());
    println!(
        "  Device ID:    0x{:04X} (revision {})",
        identity.device_id, identity.revision
    );
    println!("  Family:       {}", target.family().description());
    println!(
        "  Code memory:  {} bytes ({} KiB, {} erase blocks)",
        info.code_memory_size,
        info.code_memory_size / 1024,
        info.block_count
    );
    println!("  Write buffer: {} bytes", info.write_buffer_size);
    println!("  Data EEPROM:  {} bytes", info.eeprom_size);
}
