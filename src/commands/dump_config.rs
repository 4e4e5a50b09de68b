//! Configuration dump command implementation

use picflasher_core::chip::address::config_address;
use picflasher_core::target::Target;

/// Print every configuration word and the user ID bytes
pub fn run_dump_config(target: &mut Target<'_>) {
    println!("Configuration words:");
    for (index, word) in target.configuration_registers().iter().enumerate() {
        println!(
            "  CONFIG{}  0x{:06X}: 0x{:04X}",
            index + 1,
            config_address(index),
            word
        );
    }

    let user_id = target.user_id();
    let bytes: Vec<String> = user_id.iter().map(|b| format!("{:02X}", b)).collect();
    println!("User ID: {}", bytes.join(" "));
}
