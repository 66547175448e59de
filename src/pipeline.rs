// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use crate::config::{self, FforgeConfig};
use crate::converter::{self, AcquiredFile, ConversionJob, ConvertError, FileOrigin};
use crate::error::RequestError;
use crate::fetcher::{self, FetchPolicy};
use crate::formats;
use crate::storage;
use crate::validate;
use std::path::Path;
use std::time::Duration;

/// Raw query parameters of a conversion request, before any validation.
#[derive(Debug, Default, Clone)]
pub struct ConversionRequest {
    pub url: Option<String>,
    pub filename: Option<String>,
    pub to: String,
}

/// Payload of a successful conversion, serialized into the envelope's `data`
/// field.
#[derive(Debug, serde::Serialize)]
pub struct ConversionOutcome {
    pub original_file: String,
    pub new_file: String,
    pub file_url: String,
}

fn fetch_policy(cfg: &FforgeConfig) -> FetchPolicy {
    FetchPolicy {
        max_bytes: cfg.max_download_bytes,
        timeout: Duration::from_secs(cfg.download_timeout_seconds),
        verify_tls: cfg.verify_tls,
    }
}

/// Resolves the request's source to a file on disk. Exactly one of `url` and
/// `filename` must be set; the format pre-check for URL sources runs before
/// any bytes are transferred.
async fn acquire(
    req: &ConversionRequest,
    cfg: &FforgeConfig,
    logs: &mut Vec<String>,
) -> Result<AcquiredFile, RequestError> {
    let url = req.url.as_deref().filter(|s| !s.is_empty());
    let filename = req.filename.as_deref().filter(|s| !s.is_empty());

    match (url, filename) {
        (Some(_), Some(_)) => Err(RequestError::input(
            "Ambiguous request.",
            "Provide either 'filename' or 'url', not both.",
        )),
        (None, None) => Err(RequestError::input(
            "Missing 'filename' or 'url' parameter.",
            "Please provide either a local 'filename' or a 'url' to download.",
        )),
        (Some(url), None) => acquire_from_url(url, cfg, logs).await,
        (None, Some(filename)) => acquire_local(filename, cfg),
    }
}

async fn acquire_from_url(
    raw_url: &str,
    cfg: &FforgeConfig,
    logs: &mut Vec<String>,
) -> Result<AcquiredFile, RequestError> {
    let url = validate::validate_url(raw_url)?;
    let remote_name = validate::url_base_name(&url)?;
    let extension = validate::input_extension(&remote_name)?;

    if formats::allowed_outputs(&extension).is_none() {
        return Err(RequestError::validation(format!(
            "Input format '{}' from URL is not supported.",
            extension
        )));
    }

    let base_name = storage::download_file_name(&extension);
    let dest = storage::uploads_dir(cfg).join(&base_name);

    logs.push(format!("Downloading '{}'...", remote_name));
    let bytes = fetcher::fetch_to_path(&url, &dest, &fetch_policy(cfg))
        .await
        .map_err(|e| {
            RequestError::download("Failed to download file from URL.", e.to_string())
        })?;
    logs.push(format!(
        "Downloaded {} bytes to '{}'.",
        bytes, base_name
    ));

    Ok(AcquiredFile {
        path: dest,
        base_name,
        extension,
        origin: FileOrigin::Download,
    })
}

fn acquire_local(raw_name: &str, cfg: &FforgeConfig) -> Result<AcquiredFile, RequestError> {
    let base_name = validate::validate_local_filename(raw_name)?;
    let path = storage::uploads_dir(cfg).join(&base_name);

    if !path.is_file() {
        return Err(RequestError::file(
            "File not found.",
            format!(
                "The file '{}' does not exist in the uploads directory.",
                base_name
            ),
        ));
    }

    let extension = validate::input_extension(&base_name)?;
    Ok(AcquiredFile {
        path,
        base_name,
        extension,
        origin: FileOrigin::Upload,
    })
}

async fn cleanup_input(input: &AcquiredFile, cfg: &FforgeConfig, logs: &mut Vec<String>) {
    if input.origin == FileOrigin::Download && !cfg.keep_downloads {
        if tokio::fs::remove_file(&input.path).await.is_ok() {
            logs.push(format!("Removed downloaded file '{}'.", input.base_name));
        }
    }
}

fn file_url(cfg: &FforgeConfig, new_file: &str) -> String {
    format!(
        "{}/converted/{}",
        cfg.public_base_url.trim_end_matches('/'),
        urlencoding::encode(new_file)
    )
}

/// The full request pipeline: sanitize, resolve tools, acquire the input,
/// gate it against the compatibility table, convert, then apply the retention
/// policy. `logs` accumulates the progress lines echoed in the envelope.
pub async fn handle_request(
    req: &ConversionRequest,
    cfg: &FforgeConfig,
    logs: &mut Vec<String>,
) -> Result<ConversionOutcome, RequestError> {
    let target = validate::sanitize_target_format(&req.to)?;
    let tools = config::resolve_tools(cfg)?;

    let input = acquire(req, cfg, logs).await?;

    let result = convert_acquired(&input, &target, &tools, cfg, logs).await;
    cleanup_input(&input, cfg, logs).await;
    result
}

async fn convert_acquired(
    input: &AcquiredFile,
    target: &str,
    tools: &config::ToolPaths,
    cfg: &FforgeConfig,
    logs: &mut Vec<String>,
) -> Result<ConversionOutcome, RequestError> {
    if formats::allowed_outputs(&input.extension).is_none() {
        return Err(RequestError::validation(format!(
            "Input format '{}' is not supported.",
            input.extension
        )));
    }
    if !formats::is_allowed(&input.extension, target) {
        return Err(RequestError::validation(format!(
            "Conversion from '{}' to '{}' is not allowed.",
            input.extension, target
        )));
    }

    let profile = formats::encoder_profile(target, cfg.kilobitrate).ok_or_else(|| {
        RequestError::server(
            "Configuration error.",
            format!("No encoder profile is mapped for '{}'.", target),
        )
    })?;

    if let Some(duration) = converter::probe_duration(&input.path, &tools.ffprobe).await {
        logs.push(format!("Input duration: {:.2}s.", duration));
    }

    let new_file = converter::output_file_name(&input.base_name, target);
    let job = ConversionJob {
        input: AcquiredFile {
            path: input.path.clone(),
            base_name: input.base_name.clone(),
            extension: input.extension.clone(),
            origin: input.origin,
        },
        target: target.to_string(),
        output: storage::converted_dir(cfg).join(&new_file),
    };

    logs.push(format!(
        "Converting '{}' to '{}'...",
        input.base_name, target
    ));
    let timeout = Duration::from_secs(cfg.conversion_timeout_seconds);
    match converter::run(&job, &tools.ffmpeg, &profile, timeout).await {
        Ok(diagnostics) => {
            let diagnostics = diagnostics.trim();
            if !diagnostics.is_empty() {
                logs.push(diagnostics.to_string());
            }
            logs.push(format!("Created '{}'.", new_file));
            Ok(ConversionOutcome {
                original_file: input.base_name.clone(),
                new_file: new_file.clone(),
                file_url: file_url(cfg, &new_file),
            })
        }
        Err(ConvertError::TimedOut(secs)) => Err(RequestError::new(
            crate::error::ErrorKind::Conversion,
            "Conversion failed.",
        )
        .details(format!("Conversion timed out after {} seconds.", secs))),
        Err(ConvertError::Failed { status, log }) => Err(RequestError::new(
            crate::error::ErrorKind::Conversion,
            "Conversion failed.",
        )
        .details(format!("ffmpeg exited with status {}.", status))
        .log(log)),
        Err(ConvertError::Spawn(e)) => Err(RequestError::server(
            "Conversion failed.",
            format!("Failed to execute ffmpeg: {}.", e),
        )),
    }
}

/// CLI path: converts a file at an arbitrary local path, writing the result
/// next to it. Shares the gating and encoder logic with the HTTP pipeline.
pub async fn convert_path(
    input_path: &Path,
    target_raw: &str,
    cfg: &FforgeConfig,
) -> Result<std::path::PathBuf, RequestError> {
    let target = validate::sanitize_target_format(target_raw)?;
    let tools = config::resolve_tools(cfg)?;

    if !input_path.is_file() {
        return Err(RequestError::file(
            "File not found.",
            format!("The file '{}' does not exist.", input_path.display()),
        ));
    }

    let base_name = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            RequestError::input("Invalid input path.", "Input path has no file name.")
        })?;
    let extension = validate::input_extension(&base_name)?;

    let input = AcquiredFile {
        path: input_path.to_path_buf(),
        base_name,
        extension,
        origin: FileOrigin::Upload,
    };

    let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
    let mut logs = Vec::new();

    // Same gates as convert_acquired, but output lands beside the input.
    if formats::allowed_outputs(&input.extension).is_none() {
        return Err(RequestError::validation(format!(
            "Input format '{}' is not supported.",
            input.extension
        )));
    }
    if !formats::is_allowed(&input.extension, &target) {
        return Err(RequestError::validation(format!(
            "Conversion from '{}' to '{}' is not allowed.",
            input.extension, target
        )));
    }
    let profile = formats::encoder_profile(&target, cfg.kilobitrate).ok_or_else(|| {
        RequestError::server(
            "Configuration error.",
            format!("No encoder profile is mapped for '{}'.", target),
        )
    })?;

    if let Some(duration) = converter::probe_duration(&input.path, &tools.ffprobe).await {
        logs.push(format!("Input duration: {:.2}s.", duration));
    }
    for line in &logs {
        println!("{}", line);
    }

    let new_file = converter::output_file_name(&input.base_name, &target);
    let output = parent.join(&new_file);
    let job = ConversionJob {
        input,
        target: target.clone(),
        output: output.clone(),
    };

    let timeout = Duration::from_secs(cfg.conversion_timeout_seconds);
    match converter::run(&job, &tools.ffmpeg, &profile, timeout).await {
        Ok(_) => Ok(output),
        Err(ConvertError::TimedOut(secs)) => Err(RequestError::new(
            crate::error::ErrorKind::Conversion,
            "Conversion failed.",
        )
        .details(format!("Conversion timed out after {} seconds.", secs))),
        Err(ConvertError::Failed { status, log }) => Err(RequestError::new(
            crate::error::ErrorKind::Conversion,
            "Conversion failed.",
        )
        .details(format!("ffmpeg exited with status {}.", status))
        .log(log)),
        Err(ConvertError::Spawn(e)) => Err(RequestError::server(
            "Conversion failed.",
            format!("Failed to execute ffmpeg: {}.", e),
        )),
    }
}
