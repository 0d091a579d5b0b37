//! Configuration Module
//!
//! This module reads configuration values from environment variables, provides
//! sensible defaults, and validates key limits such as maximum input file
//! sizes and decompression ceilings for archived logs.

use anyhow::Result;
use std::env;

#[derive(Debug)]
pub struct Config {
    pub webhook_url: Option<String>,
    pub webhook_timeout: u64,
    pub max_file_size: usize,
    pub max_decompressed_size: usize,
    pub max_files_in_zip: usize,
    pub max_compression_ratio: f64,
    pub max_filename_length: usize,
}

impl Config {
    /// Creates a new configuration by reading environment variables.
    /// If a variable is missing or empty, a default value is used.
    pub fn new() -> Result<Self> {
        // Read max file size from env or use default 10MB.
        let max_file_size = env::var("PMTA_MAX_FILE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 1024 * 1024);

        if max_file_size > 500_000_000 {
            return Err(anyhow::anyhow!("Max file size too large (500MB limit)"));
        }

        // For webhook_timeout, try PMTA_WEBHOOK_TIMEOUT_SECS then PMTA_WEBHOOK_TIMEOUT.
        let webhook_timeout = env::var("PMTA_WEBHOOK_TIMEOUT_SECS")
            .or_else(|_| env::var("PMTA_WEBHOOK_TIMEOUT"))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let max_decompressed_size = env::var("PMTA_MAX_DECOMPRESSED_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100 * 1024 * 1024);

        let max_files_in_zip = env::var("PMTA_MAX_FILES_IN_ZIP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let max_compression_ratio = env::var("PMTA_MAX_COMPRESSION_RATIO")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000.0);

        let max_filename_length = env::var("PMTA_MAX_FILENAME_LENGTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256);

        // Trim the webhook URL before checking for emptiness.
        let webhook_url = env::var("PMTA_WEBHOOK_URL")
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Config {
            webhook_url,
            webhook_timeout,
            max_file_size,
            max_decompressed_size,
            max_files_in_zip,
            max_compression_ratio,
            max_filename_length,
        })
    }
}
