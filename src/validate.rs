// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use crate::error::RequestError;
use std::path::Path;
use url::Url;

/// Strips everything outside [a-zA-Z0-9] and lower-cases. Runs before the
/// format is used anywhere, including in output file names.
pub fn sanitize_target_format(raw: &str) -> Result<String, RequestError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        return Err(RequestError::input(
            "Invalid 'to' parameter.",
            "Target format is empty after sanitization.",
        ));
    }

    Ok(cleaned)
}

/// Rejects anything that is not a plain base name. Must be called before any
/// filesystem access with the value.
pub fn validate_local_filename(raw: &str) -> Result<String, RequestError> {
    let traversal_error = || {
        RequestError::input(
            "Invalid 'filename'.",
            "Filename cannot contain path traversal elements (e.g., '..', '/').",
        )
    };

    if raw.is_empty() || raw.contains("..") || raw.contains('\\') {
        return Err(traversal_error());
    }

    let base = Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    if base != raw {
        return Err(traversal_error());
    }

    Ok(raw.to_string())
}

/// Well-formedness plus a scheme allow-list. This request path is a
/// server-side fetch surface, so everything outside http/https/file is
/// refused up front; resolving the target host against private-network
/// ranges is a documented gap.
pub fn validate_url(raw: &str) -> Result<Url, RequestError> {
    let parsed = Url::parse(raw).map_err(|_| {
        RequestError::input("Invalid 'url' parameter.", "The provided URL is not valid.")
    })?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(parsed),
        _ => Err(RequestError::input(
            "Invalid URL scheme.",
            "Only 'http', 'https', and 'file' URLs are allowed.",
        )),
    }
}

/// Base name of the URL path, used to pre-check the input format before any
/// bytes are transferred.
pub fn url_base_name(url: &Url) -> Result<String, RequestError> {
    let name = Path::new(url.path())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");

    if name.is_empty() {
        return Err(RequestError::input(
            "Could not determine filename from URL.",
            "URL must end with a filename (e.g., /video.mp4).",
        ));
    }

    Ok(name.to_string())
}

/// Lower-cased extension of a file name; absence is a Validation Error since
/// the compatibility table is keyed on extensions.
pub fn input_extension(name: &str) -> Result<String, RequestError> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .ok_or_else(|| {
            RequestError::validation(format!("Could not determine input format of '{}'.", name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_sanitize_target_format_strips_and_lowercases() {
        assert_eq!(sanitize_target_format("MP4!!").unwrap(), "mp4");
        assert_eq!(sanitize_target_format("web-m").unwrap(), "webm");
        assert_eq!(sanitize_target_format("mp3").unwrap(), "mp3");
    }

    #[test]
    fn test_sanitize_target_format_empty_after_strip() {
        let err = sanitize_target_format("###").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Input);
        assert!(sanitize_target_format("").is_err());
        assert!(sanitize_target_format("../").is_err());
    }

    #[test]
    fn test_validate_local_filename_accepts_plain_names() {
        assert_eq!(validate_local_filename("clip.mp4").unwrap(), "clip.mp4");
        assert_eq!(
            validate_local_filename("some video (1).mkv").unwrap(),
            "some video (1).mkv"
        );
    }

    #[test]
    fn test_validate_local_filename_rejects_traversal() {
        for bad in [
            "../../etc/passwd",
            "..",
            "a/../b.mp4",
            "dir/clip.mp4",
            "/etc/passwd",
            "..\\clip.mp4",
            "",
        ] {
            let err = validate_local_filename(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Input, "expected rejection of {:?}", bad);
        }
    }

    #[test]
    fn test_validate_url_schemes() {
        assert!(validate_url("http://example.com/a.mp4").is_ok());
        assert!(validate_url("https://example.com/a.mp4").is_ok());
        assert!(validate_url("file:///tmp/a.mp4").is_ok());

        let err = validate_url("ftp://example.com/a.mp4").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Input);
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_url_base_name() {
        let url = validate_url("http://example.com/media/clip.mp4?x=1").unwrap();
        assert_eq!(url_base_name(&url).unwrap(), "clip.mp4");

        let bare = validate_url("http://example.com/").unwrap();
        let err = url_base_name(&bare).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Input);
    }

    #[test]
    fn test_input_extension() {
        assert_eq!(input_extension("clip.MP4").unwrap(), "mp4");
        assert_eq!(input_extension("a.b.flac").unwrap(), "flac");

        let err = input_extension("noextension").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
