//! File Handlers Module
//!
//! Reads accounting-log sources from plain text, GZIP or ZIP files with
//! security limits enforced throughout: original file size, decompressed
//! size, file count, compression ratio, member-name length, and path
//! traversal prevention for archive members. Each returned string is the
//! full text of one log file; a ZIP with several members yields one entry
//! per member, in member order.

use crate::config::Config;
use crate::error::{PmtaError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

/// Reads the log file(s) contained in `file_path`.
///
/// Supported extensions: `csv` and `log` (plain text), `gz` (gzip), `zip`.
///
/// # Errors
///
/// Fails when the file exceeds the configured size limits, when an archive
/// violates a safety check, or when the extension is unsupported.
pub fn read_log_source<P: AsRef<Path>>(file_path: P, config: &Config) -> Result<Vec<String>> {
    let file = File::open(&file_path)?;
    let file_size = file.metadata()?.len();
    if file_size > config.max_file_size as u64 {
        return Err(PmtaError::FileTooLarge(format!(
            "File size {} bytes exceeds limit of {} bytes",
            file_size, config.max_file_size
        )));
    }
    let file_name = file_path
        .as_ref()
        .file_name()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = file_name.split('.').last().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "zip" => read_zip(file, config),
        "gz" => read_gzip(file, config),
        "csv" | "log" => read_plain(file, config),
        other => Err(PmtaError::UnsupportedFile(format!(
            "Unsupported file extension: {}",
            other
        ))),
    }
}

fn read_zip(file: File, config: &Config) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(file)?;
    if archive.len() > config.max_files_in_zip {
        return Err(PmtaError::Format("Too many files in archive".to_string()));
    }
    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        let member_name = member.name().to_string();
        // Prevent path traversal
        if member_name.contains("..")
            || member_name.starts_with('/')
            || member_name.starts_with('\\')
        {
            return Err(PmtaError::Format(format!(
                "Path traversal attempt detected: {}",
                member_name
            )));
        }
        if member_name.len() > config.max_filename_length {
            return Err(PmtaError::Format("Filename too long".to_string()));
        }
        let compressed_size = member.compressed_size();
        let uncompressed_size = member.size();
        if compressed_size > 0 {
            let compression_ratio = uncompressed_size as f64 / compressed_size as f64;
            if compression_ratio > config.max_compression_ratio {
                return Err(PmtaError::Format(format!(
                    "Suspicious compression ratio: {:.2}",
                    compression_ratio
                )));
            }
        }
        if uncompressed_size > config.max_decompressed_size as u64 {
            return Err(PmtaError::FileTooLarge(
                "Total decompressed size too large".to_string(),
            ));
        }
        let mut contents = String::new();
        member.read_to_string(&mut contents)?;
        extracted.push(contents);
    }
    Ok(extracted)
}

fn read_gzip(file: File, config: &Config) -> Result<Vec<String>> {
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut contents = String::new();
    let len = decoder.read_to_string(&mut contents)?;
    if len > config.max_decompressed_size {
        return Err(PmtaError::FileTooLarge(
            "Decompressed size too large".to_string(),
        ));
    }
    Ok(vec![contents])
}

fn read_plain(file: File, config: &Config) -> Result<Vec<String>> {
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    let len = reader.read_to_string(&mut contents)?;
    if len > config.max_file_size {
        return Err(PmtaError::FileTooLarge(
            "Log file size too large".to_string(),
        ));
    }
    Ok(vec![contents])
}
