// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

fn default_max_download_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_download_timeout() -> u64 {
    300
}

fn default_conversion_timeout() -> u64 {
    3600
}

fn default_kilobitrate() -> u32 {
    350
}

fn default_max_jobs() -> usize {
    4
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FforgeConfig {
    #[serde(default)]
    pub ffmpeg_path: String,
    #[serde(default)]
    pub ffprobe_path: String,
    /// Root directory holding the `uploads` and `converted` subdirectories.
    /// Empty means `~/.fforge`.
    #[serde(default)]
    pub media_root: String,
    /// Prefix for the `file_url` returned on success. Empty produces a
    /// server-relative `/converted/...` URL.
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_seconds: u64,
    #[serde(default = "default_conversion_timeout")]
    pub conversion_timeout_seconds: u64,
    #[serde(default = "default_kilobitrate")]
    pub kilobitrate: u32,
    #[serde(default = "default_max_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub keep_downloads: bool,
}

impl Default for FforgeConfig {
    fn default() -> Self {
        // Pre-populate the tool paths from the system PATH so a fresh install
        // is usable once `fforge config show` confirms what was detected.
        let ffmpeg_path = which::which("ffmpeg")
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let ffprobe_path = which::which("ffprobe")
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            ffmpeg_path,
            ffprobe_path,
            media_root: String::new(),
            public_base_url: String::new(),
            max_download_bytes: default_max_download_bytes(),
            download_timeout_seconds: default_download_timeout(),
            conversion_timeout_seconds: default_conversion_timeout(),
            kilobitrate: default_kilobitrate(),
            max_concurrent_jobs: default_max_jobs(),
            verify_tls: true,
            keep_downloads: false,
        }
    }
}

pub fn load_config() -> Result<FforgeConfig, confy::ConfyError> {
    if let Ok(config_path) = std::env::var("FFORGE_CONFIG_PATH") {
        confy::load_path(&config_path)
    } else {
        confy::load("fforge", "config")
    }
}

pub fn load_config_or_default() -> FforgeConfig {
    load_config().unwrap_or_default()
}

pub fn store_config(config: &FforgeConfig) -> Result<(), confy::ConfyError> {
    if let Ok(config_path) = std::env::var("FFORGE_CONFIG_PATH") {
        confy::store_path(&config_path, config)
    } else {
        confy::store("fforge", "config", config)
    }
}

pub const VALID_FIELDS: &str = "ffmpeg_path, ffprobe_path, media_root, public_base_url, max_download_bytes, download_timeout_seconds, conversion_timeout_seconds, kilobitrate, max_concurrent_jobs, verify_tls, keep_downloads";

pub fn is_valid_config_field(field: &str) -> bool {
    matches!(
        field,
        "ffmpeg_path"
            | "ffprobe_path"
            | "media_root"
            | "public_base_url"
            | "max_download_bytes"
            | "download_timeout_seconds"
            | "conversion_timeout_seconds"
            | "kilobitrate"
            | "max_concurrent_jobs"
            | "verify_tls"
            | "keep_downloads"
    )
}

pub fn set_config_field(cfg: &mut FforgeConfig, field: &str, value: &str) -> Result<(), String> {
    match field {
        "ffmpeg_path" => cfg.ffmpeg_path = value.to_string(),
        "ffprobe_path" => cfg.ffprobe_path = value.to_string(),
        "media_root" => cfg.media_root = value.to_string(),
        "public_base_url" => cfg.public_base_url = value.to_string(),
        "max_download_bytes" => {
            cfg.max_download_bytes = value
                .parse::<u64>()
                .map_err(|_| format!("Invalid number value for max_download_bytes: {}", value))?;
        }
        "download_timeout_seconds" => {
            cfg.download_timeout_seconds = value.parse::<u64>().map_err(|_| {
                format!("Invalid number value for download_timeout_seconds: {}", value)
            })?;
        }
        "conversion_timeout_seconds" => {
            cfg.conversion_timeout_seconds = value.parse::<u64>().map_err(|_| {
                format!("Invalid number value for conversion_timeout_seconds: {}", value)
            })?;
        }
        "kilobitrate" => {
            cfg.kilobitrate = value
                .parse::<u32>()
                .map_err(|_| format!("Invalid number value for kilobitrate: {}", value))?;
        }
        "max_concurrent_jobs" => {
            cfg.max_concurrent_jobs = value
                .parse::<usize>()
                .map_err(|_| format!("Invalid number value for max_concurrent_jobs: {}", value))?;
        }
        "verify_tls" => {
            cfg.verify_tls = value
                .parse::<bool>()
                .map_err(|_| format!("Invalid boolean value for verify_tls: {}", value))?;
        }
        "keep_downloads" => {
            cfg.keep_downloads = value
                .parse::<bool>()
                .map_err(|_| format!("Invalid boolean value for keep_downloads: {}", value))?;
        }
        _ => return Err(format!("Unknown field: {}", field)),
    }
    Ok(())
}

pub fn unset_config_field(cfg: &mut FforgeConfig, field: &str) -> Result<(), String> {
    match field {
        "ffmpeg_path" => cfg.ffmpeg_path = String::new(),
        "ffprobe_path" => cfg.ffprobe_path = String::new(),
        "media_root" => cfg.media_root = String::new(),
        "public_base_url" => cfg.public_base_url = String::new(),
        "max_download_bytes" => cfg.max_download_bytes = default_max_download_bytes(),
        "download_timeout_seconds" => cfg.download_timeout_seconds = default_download_timeout(),
        "conversion_timeout_seconds" => {
            cfg.conversion_timeout_seconds = default_conversion_timeout()
        }
        "kilobitrate" => cfg.kilobitrate = default_kilobitrate(),
        "max_concurrent_jobs" => cfg.max_concurrent_jobs = default_max_jobs(),
        "verify_tls" => cfg.verify_tls = true,
        "keep_downloads" => cfg.keep_downloads = false,
        _ => return Err(format!("Unknown field: {}", field)),
    }
    Ok(())
}

#[derive(Debug)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Both executables must be explicitly configured; an incomplete
/// configuration is a hard Server Error, never a silent PATH fallback.
pub fn resolve_tools(cfg: &FforgeConfig) -> Result<ToolPaths, RequestError> {
    if cfg.ffmpeg_path.is_empty() {
        return Err(RequestError::server(
            "Configuration error.",
            "ffmpeg_path is not set. Run 'fforge config set ffmpeg_path /path/to/ffmpeg'.",
        ));
    }
    if cfg.ffprobe_path.is_empty() {
        return Err(RequestError::server(
            "Configuration error.",
            "ffprobe_path is not set. Run 'fforge config set ffprobe_path /path/to/ffprobe'.",
        ));
    }

    Ok(ToolPaths {
        ffmpeg: PathBuf::from(&cfg.ffmpeg_path),
        ffprobe: PathBuf::from(&cfg.ffprobe_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn bare_config() -> FforgeConfig {
        FforgeConfig {
            ffmpeg_path: String::new(),
            ffprobe_path: String::new(),
            ..FforgeConfig::default()
        }
    }

    #[test]
    fn test_resolve_tools_requires_both_paths() {
        let mut cfg = bare_config();
        let err = resolve_tools(&cfg).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);

        cfg.ffmpeg_path = "/usr/bin/ffmpeg".to_string();
        let err = resolve_tools(&cfg).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert!(err.details.unwrap().contains("ffprobe_path"));

        cfg.ffprobe_path = "/usr/bin/ffprobe".to_string();
        assert!(resolve_tools(&cfg).is_ok());
    }

    #[test]
    fn test_set_config_field_parses_numbers() {
        let mut cfg = bare_config();
        set_config_field(&mut cfg, "max_download_bytes", "1048576").unwrap();
        assert_eq!(cfg.max_download_bytes, 1048576);

        let err = set_config_field(&mut cfg, "max_download_bytes", "lots").unwrap_err();
        assert!(err.contains("Invalid number value"));
    }

    #[test]
    fn test_set_config_field_rejects_unknown() {
        let mut cfg = bare_config();
        assert!(set_config_field(&mut cfg, "nope", "1").is_err());
        assert!(unset_config_field(&mut cfg, "nope").is_err());
    }

    #[test]
    fn test_unset_restores_defaults() {
        let mut cfg = bare_config();
        set_config_field(&mut cfg, "kilobitrate", "128").unwrap();
        set_config_field(&mut cfg, "verify_tls", "false").unwrap();
        unset_config_field(&mut cfg, "kilobitrate").unwrap();
        unset_config_field(&mut cfg, "verify_tls").unwrap();
        assert_eq!(cfg.kilobitrate, 350);
        assert!(cfg.verify_tls);
    }
}
