//! Content codecs: gzip and single-entry zip archives.
//!
//! Everything here is synchronous and operates on fully buffered bodies.

use std::io::{Cursor, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{ReadMode, StoreError, StoreResult};

/// Entry name used when zipping a replay
pub const REPLAY_ENTRY_NAME: &str = "replay.xml";

/// Turn a fetched body into text according to the read mode
pub fn decode(mode: ReadMode, bytes: &[u8]) -> StoreResult<String> {
    match mode {
        ReadMode::Raw => Ok(lossy_utf8(bytes.to_vec())),
        ReadMode::Gzip => gunzip(bytes),
        ReadMode::Zip => unzip_first_entry(bytes),
    }
}

/// Inflate a gzip body into text
pub fn gunzip(bytes: &[u8]) -> StoreResult<String> {
    let mut inflated = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .map_err(|e| StoreError::decompression(format!("gzip: {}", e)))?;
    Ok(lossy_utf8(inflated))
}

/// Compress text with gzip at the default level
pub fn gzip(text: &str) -> StoreResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Extract the first entry listed in a zip archive as text.
///
/// Archives are expected to hold a single file; any further entries are
/// ignored.
pub fn unzip_first_entry(bytes: &[u8]) -> StoreResult<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| StoreError::decompression(format!("zip: {}", e)))?;
    if archive.is_empty() {
        return Err(StoreError::decompression("zip: archive has no entries"));
    }

    let mut entry = archive
        .by_index(0)
        .map_err(|e| StoreError::decompression(format!("zip: {}", e)))?;
    if entry.is_dir() {
        return Err(StoreError::decompression(format!(
            "zip: first entry {} is a directory",
            entry.name()
        )));
    }

    // The declared size comes from the archive header and is not trusted
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|e| StoreError::decompression(format!("zip: {}", e)))?;
    Ok(lossy_utf8(contents))
}

/// Build a single-entry zip archive, deflated at level 9
pub fn zip_single_entry(entry_name: &str, text: &str) -> StoreResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    writer
        .start_file(entry_name, options)
        .map_err(std::io::Error::from)?;
    writer.write_all(text.as_bytes())?;
    let cursor = writer.finish().map_err(std::io::Error::from)?;
    Ok(cursor.into_inner())
}

/// Invalid sequences become U+FFFD rather than failing the read
fn lossy_utf8(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
