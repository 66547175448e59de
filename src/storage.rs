// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use crate::config::FforgeConfig;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub fn media_root(cfg: &FforgeConfig) -> PathBuf {
    if cfg.media_root.is_empty() {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fforge")
    } else {
        PathBuf::from(&cfg.media_root)
    }
}

pub fn uploads_dir(cfg: &FforgeConfig) -> PathBuf {
    media_root(cfg).join("uploads")
}

pub fn converted_dir(cfg: &FforgeConfig) -> PathBuf {
    media_root(cfg).join("converted")
}

/// Creates the uploads and converted directories at startup and returns
/// human-readable log lines that are echoed into every response envelope.
pub fn ensure_directories(cfg: &FforgeConfig) -> Result<Vec<String>, std::io::Error> {
    let mut logs = Vec::new();

    for dir in [uploads_dir(cfg), converted_dir(cfg)] {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if dir.is_dir() {
            logs.push(format!("Directory '{}' already exists.", name));
        } else {
            fs::create_dir_all(&dir)?;
            logs.push(format!("Directory '{}' created successfully.", name));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(&dir)?.permissions();
            permissions.set_mode(0o755);
            fs::set_permissions(&dir, permissions)?;
            logs.push(format!("Permissions for '{}' set to 755.", name));
        }
    }

    Ok(logs)
}

/// Safe, unique name for a file fetched from a URL. The remote name is never
/// reused on disk; only its extension survives.
pub fn download_file_name(ext: &str) -> String {
    format!("url_dl_{}.{}", Uuid::new_v4().simple(), ext)
}
