//! List commands implementation

use crate::programmers;
use picflasher_core::family::FamilyKind;

/// List all programmers compiled into this binary
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in programmers::available_programmers() {
        if p.aliases.is_empty() {
            println!("  {:12} - {}", p.name, p.description);
        } else {
            println!(
                "  {:12} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}

/// List all supported devices, optionally filtered by name
pub fn list_devices(filter: Option<&str>) {
    println!("Supported devices:");
    println!();
    println!(
        "{:<12} {:<14} {:>8} {:>9} {:>7} {:>7}",
        "Family", "Name", "ID", "Code", "Buffer", "EEPROM"
    );
    println!("{}", "-".repeat(62));

    for kind in FamilyKind::ALL {
        for device in kind.family().catalog() {
            if let Some(filter) = filter {
                if !device.name.to_lowercase().contains(&filter.to_lowercase()) {
                    continue;
                }
            }
            println!(
                "{:<12} {:<14} {:>8} {:>9} {:>7} {:>7}",
                kind.name(),
                device.name,
                format!("0x{:04X}", device.id),
                format_size(device.code_memory_size),
                format_size(device.write_buffer_size as u32),
                format_size(device.eeprom_size as u32)
            );
        }
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0x10000), "64 KiB");
        assert_eq!(format_size(1024), "1 KiB");
        assert_eq!(format_size(64), "64 B");
    }
}
