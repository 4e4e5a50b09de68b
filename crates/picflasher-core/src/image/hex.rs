//! Intel HEX codec for memory and EEPROM images
//!
//! Addresses are byte addresses in the device's table-pointer space. Data
//! EEPROM lives at [`EEPROM_BASE`], following the layout MPLAB tools emit.

use std::fs;
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use ihex::Record;

use super::{EepromImage, MemoryImage};
use crate::chip::address::{config_address, ERASED_WORD, USER_ID};
use crate::chip::DeviceInfo;

/// Byte address where data EEPROM cells appear in a HEX file
pub const EEPROM_BASE: u32 = 0xF0_0000;

/// Bytes per data record in generated files
const RECORD_WIDTH: usize = 16;

/// Errors from loading or storing HEX files
#[derive(Debug, thiserror::Error)]
pub enum HexError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed HEX record
    #[error("invalid HEX file: {0}")]
    Reader(#[from] ihex::ReaderError),
    /// Records could not be serialized
    #[error("failed to encode HEX file: {0}")]
    Writer(#[from] ihex::WriterError),
    /// Record data does not fit the device
    #[error(transparent)]
    Image(#[from] crate::Error),
}

/// Decode HEX text into images sized for `info`
pub fn parse(text: &str, info: &DeviceInfo) -> Result<(MemoryImage, EepromImage), HexError> {
    let mut memory = MemoryImage::new(info);
    let mut eeprom = EepromImage::new(info);
    let eeprom_end = EEPROM_BASE + eeprom.len() as u32;
    let mut base_address = 0u32;

    for record in ihex::Reader::new(text) {
        match record? {
            Record::Data { offset, value } => {
                let start = base_address + offset as u32;
                for (i, byte) in value.into_iter().enumerate() {
                    let addr = start
                        .checked_add(i as u32)
                        .ok_or(crate::Error::AddressOutOfRange { addr: start })?;
                    if (EEPROM_BASE..eeprom_end).contains(&addr) {
                        eeprom.set((addr - EEPROM_BASE) as usize, byte)?;
                    } else {
                        memory.set_byte(addr, byte)?;
                    }
                }
            }
            Record::ExtendedSegmentAddress(segment) => base_address = (segment as u32) * 16,
            Record::ExtendedLinearAddress(upper) => base_address = (upper as u32) << 16,
            Record::EndOfFile => break,
            Record::StartSegmentAddress { .. } | Record::StartLinearAddress(_) => {}
        }
    }

    log::debug!(
        "HEX image: {} code words, {} config words",
        memory.present_words().count(),
        memory.config_words().iter().flatten().count()
    );
    Ok((memory, eeprom))
}

/// Read and decode a HEX file
pub fn load(path: impl AsRef<Path>, info: &DeviceInfo) -> Result<(MemoryImage, EepromImage), HexError> {
    let text = fs::read_to_string(path)?;
    parse(&text, info)
}

/// Encode images as HEX text
///
/// Absent and erased code words are omitted. Present configuration and
/// user ID entries are always emitted. EEPROM cells still at `0xFF` are
/// omitted since that is what a load fills them with.
pub fn encode(memory: Option<&MemoryImage>, eeprom: Option<&EepromImage>) -> Result<String, HexError> {
    let mut bytes: Vec<(u32, u8)> = Vec::new();

    if let Some(memory) = memory {
        for (index, word) in memory.present_words() {
            if word != ERASED_WORD {
                push_word(&mut bytes, index as u32 * 2, word);
            }
        }
        for (index, byte) in memory.user_id().iter().enumerate() {
            if let Some(byte) = byte {
                bytes.push((USER_ID + index as u32, *byte));
            }
        }
        for (index, word) in memory.config_words().iter().enumerate() {
            let Some(word) = word else { continue };
            let mask = memory.config_mask(index);
            let addr = config_address(index);
            let [low, high] = word.to_le_bytes();
            if mask & 0x00FF != 0 {
                bytes.push((addr, low));
            }
            if mask & 0xFF00 != 0 {
                bytes.push((addr + 1, high));
            }
        }
    }

    if let Some(eeprom) = eeprom {
        for (index, &cell) in eeprom.cells().iter().enumerate() {
            if cell != 0xFF {
                bytes.push((EEPROM_BASE + index as u32, cell));
            }
        }
    }

    let records = build_records(&bytes);
    Ok(ihex::create_object_file_representation(&records)?)
}

/// Encode images and write them to `path`
pub fn store(
    path: impl AsRef<Path>,
    memory: Option<&MemoryImage>,
    eeprom: Option<&EepromImage>,
) -> Result<(), HexError> {
    let text = encode(memory, eeprom)?;
    fs::write(path, text)?;
    Ok(())
}

fn push_word(bytes: &mut Vec<(u32, u8)>, addr: u32, word: u16) {
    let [low, high] = word.to_le_bytes();
    bytes.push((addr, low));
    bytes.push((addr + 1, high));
}

/// Group ascending `(addr, byte)` pairs into data records
///
/// A record never spans a gap or a 64 KiB boundary; an extended linear
/// address record precedes the first record of every new upper half.
fn build_records(bytes: &[(u32, u8)]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut upper: Option<u16> = None;
    let mut run: Vec<u8> = Vec::with_capacity(RECORD_WIDTH);
    let mut run_start = 0u32;

    for &(addr, byte) in bytes {
        let next = run_start + run.len() as u32;
        let contiguous = !run.is_empty() && addr == next && addr & 0xFFFF != 0;
        if !contiguous || run.len() == RECORD_WIDTH {
            flush(&mut records, &mut upper, run_start, &mut run);
            run_start = addr;
        }
        run.push(byte);
    }
    flush(&mut records, &mut upper, run_start, &mut run);

    records.push(Record::EndOfFile);
    records
}

fn flush(records: &mut Vec<Record>, upper: &mut Option<u16>, start: u32, run: &mut Vec<u8>) {
    if run.is_empty() {
        return;
    }
    let high = (start >> 16) as u16;
    if *upper != Some(high) {
        records.push(Record::ExtendedLinearAddress(high));
        *upper = Some(high);
    }
    records.push(Record::Data {
        offset: (start & 0xFFFF) as u16,
        value: core::mem::take(run),
    });
}
