//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use picflasher_core::programmer::IcspPins;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Pin-level PIC18 K80 simulator (device=<name>,rev=<n>,busy=<n>,id=<hex>)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO bit-bang (dev=/dev/gpiochipN,clk=<n>,data=<n>,mclr=<n>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Execute a function with the specified programmer
///
/// The programmer string can be just the name (e.g., "dummy") or include
/// parameters (e.g., "dummy:device=PIC18F46K80").
#[allow(unused_variables)]
pub fn with_programmer<F>(programmer: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn IcspPins) -> Result<(), Box<dyn std::error::Error>>,
{
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = picflasher_dummy::parse_options(&options)
                .map_err(|e| format!("Invalid dummy parameters: {}", e))?;
            log::info!("Using simulated target (device ID 0x{:04X})", config.device_id);
            let mut pic = picflasher_dummy::DummyPic::new(config);
            f(&mut pic)
        }

        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => {
            use picflasher_linux_gpio::{parse_options, LinuxGpioIcsp};

            log::info!("Opening Linux GPIO programmer...");

            let config = parse_options(&options)
                .map_err(|e| format!("Invalid linux_gpio parameters: {}", e))?;

            let mut pins = LinuxGpioIcsp::open(&config).map_err(|e| {
                format!(
                    "Failed to open Linux GPIO device: {}\n\
                     Make sure the device exists and you have read/write permissions.",
                    e
                )
            })?;

            f(&mut pins)
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'picflasher list-programmers' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_string() {
        assert_eq!(parse_programmer_string("dummy"), ("dummy", vec![]));
        assert_eq!(
            parse_programmer_string("linux_gpio:dev=/dev/gpiochip0,clk=23,data=24,mclr=18"),
            (
                "linux_gpio",
                vec![
                    ("dev", "/dev/gpiochip0"),
                    ("clk", "23"),
                    ("data", "24"),
                    ("mclr", "18")
                ]
            )
        );
        // Options without a value are dropped
        assert_eq!(
            parse_programmer_string("dummy:verbose,rev=2"),
            ("dummy", vec![("rev", "2")])
        );
    }

    #[test]
    fn test_unknown_programmer() {
        assert_eq!(find_programmer("ch341a"), None);
        let result = with_programmer("ch341a", |_| Ok(()));
        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("Unknown programmer: ch341a"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_dispatch() {
        assert_eq!(find_programmer("sim"), Some("dummy"));

        let mut found = None;
        with_programmer("dummy:device=PIC18LF45K80", |pins| {
            let family = picflasher_core::family::FamilyKind::Pic18FxxK80.family();
            found = Some(picflasher_core::target::identify(pins, family)?.name());
            Ok(())
        })
        .unwrap();
        assert_eq!(found, Some("PIC18LF45K80"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_bad_options() {
        let err = with_programmer("dummy:device=PIC16F84", |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("Unknown device"));
    }
}
