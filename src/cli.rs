//! CLI argument parsing

use clap::{Parser, Subcommand};
use picflasher_core::family::{EraseScope, FamilyKind};
use std::path::PathBuf;

fn parse_family(s: &str) -> Result<FamilyKind, String> {
    FamilyKind::from_name(s).ok_or_else(|| {
        let known: Vec<&str> = FamilyKind::ALL.iter().map(|k| k.name()).collect();
        format!("Unknown family '{}' [available: {}]", s, known.join(", "))
    })
}

fn parse_scope(s: &str) -> Result<EraseScope, String> {
    EraseScope::from_name(s).ok_or_else(|| {
        let known: Vec<&str> = EraseScope::ALL.iter().map(|k| k.name()).collect();
        format!("Unknown erase scope '{}' [available: {}]", s, known.join(", "))
    })
}

#[derive(Parser)]
#[command(name = "picflasher")]
#[command(author, version, about = "PIC18 in-circuit serial programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML)
    /// Defaults to ./picflasher.toml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Programmer to use, as name[:key=value,...]
    #[arg(short, long, global = true)]
    pub programmer: Option<String>,

    /// Device family
    #[arg(long, global = true, value_parser = parse_family)]
    pub family: Option<FamilyKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the attached chip
    Probe,

    /// Check that code memory is erased
    BlankCheck,

    /// Bulk erase the chip
    Erase {
        /// Memories to erase (full, boot, program, eeprom)
        #[arg(long, default_value = "full", value_parser = parse_scope)]
        scope: EraseScope,
    },

    /// Read code memory, configuration and user ID to an Intel HEX file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Program an Intel HEX file
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Skip read-back verification
        #[arg(long)]
        no_verify: bool,

        /// Don't erase and blank check before writing
        #[arg(long)]
        no_erase: bool,
    },

    /// Read data EEPROM to an Intel HEX file
    EepromRead {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write data EEPROM from an Intel HEX file
    EepromWrite {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show configuration words and user ID
    DumpConfig,

    /// List supported devices
    ListDevices {
        /// Filter by name
        #[arg(long)]
        filter: Option<String>,
    },

    /// List supported programmers
    ListProgrammers,
}
