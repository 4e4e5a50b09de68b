//! picflasher - PIC18 in-circuit serial programmer
//!
//! Drives the low-voltage ICSP protocol of PIC18 microcontrollers over
//! bit-banged GPIO lines to identify, erase, program and verify code
//! memory, configuration words and data EEPROM.
//!
//! # Architecture
//!
//! - A **programmer** provides raw pin access (`IcspPins`): Linux GPIO or
//!   the pin-level simulator.
//! - A **family** knows the command sequences for a group of parts.
//! - A **target** ties both together after the chip has been identified;
//!   every command in [`commands`] operates on an attached target.

mod cli;
mod commands;
mod config;
mod programmers;
mod progress;

use clap::{CommandFactory, FromArgMatches};
use cli::{Cli, Commands};
use commands::WriteArgs;
use config::Settings;
use picflasher_core::target::Target;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = parse_args();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Command definition with the compiled-in programmers listed in `--help`
fn command() -> clap::Command {
    Cli::command().mut_arg("programmer", |arg| {
        arg.help(format!(
            "Programmer to use, as name[:key=value,...] [available: {}]",
            programmers::programmer_names_short()
        ))
    })
}

fn parse_args() -> Cli {
    let matches = command().get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

/// Whether the command talks to a target
fn needs_programmer(command: &Commands) -> bool {
    !matches!(command, Commands::ListDevices { .. } | Commands::ListProgrammers)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        config,
        programmer,
        family,
        command,
        ..
    } = cli;

    if !needs_programmer(&command) {
        match command {
            Commands::ListDevices { filter } => commands::list_devices(filter.as_deref()),
            _ => commands::list_programmers(),
        }
        return Ok(());
    }

    let settings = Settings::load(config.as_deref())?;
    let programmer = programmer.or(settings.programmer).ok_or(
        "No programmer specified. Use -p <programmer> or set 'programmer' in picflasher.toml",
    )?;
    let family = family.or(settings.family).unwrap_or_default();
    log::debug!("Using programmer '{}', family {}", programmer, family);

    programmers::with_programmer(&programmer, |pins| {
        let mut target = Target::attach(pins, family.family())?;
        let result = run_command(&mut target, command);
        target.detach();
        result
    })
}

fn run_command(target: &mut Target<'_>, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Probe => {
            commands::run_probe(target);
            Ok(())
        }
        Commands::BlankCheck => commands::run_blank_check(target),
        Commands::Erase { scope } => commands::run_erase(target, scope),
        Commands::Read { output } => commands::run_read(target, &output),
        Commands::Write {
            input,
            no_verify,
            no_erase,
        } => commands::run_write(
            target,
            &input,
            WriteArgs {
                verify: !no_verify,
                erase: !no_erase,
            },
        ),
        Commands::EepromRead { output } => commands::run_eeprom_read(target, &output),
        Commands::EepromWrite { input } => commands::run_eeprom_write(target, &input),
        Commands::DumpConfig => {
            commands::run_dump_config(target);
            Ok(())
        }
        Commands::ListDevices { .. } | Commands::ListProgrammers => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let matches = command().try_get_matches_from(args.iter().copied()).unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_command_definition() {
        command().debug_assert();
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_programmer_help_lists_backends() {
        let cmd = command();
        let arg = cmd
            .get_arguments()
            .find(|arg| arg.get_id() == "programmer")
            .unwrap();
        let help = arg.get_help().unwrap().to_string();
        assert!(help.contains("[available: "));
        assert!(help.contains("dummy"));
    }

    #[test]
    fn test_parse_write_with_global_options() {
        let cli = parse(&["picflasher", "write", "-i", "fw.hex", "--no-verify", "-p", "dummy", "-vv"]);
        assert_eq!(cli.programmer.as_deref(), Some("dummy"));
        assert_eq!(cli.verbose, 2);
        assert!(needs_programmer(&cli.command));
        assert!(matches!(
            cli.command,
            Commands::Write { no_verify: true, no_erase: false, .. }
        ));
    }

    #[test]
    fn test_list_commands_need_no_programmer() {
        assert!(!needs_programmer(&parse(&["picflasher", "list-devices"]).command));
        assert!(!needs_programmer(&parse(&["picflasher", "list-programmers"]).command));
    }
}
