use fforge::config::FforgeConfig;
use fforge::{storage, web};
use rocket::http::Status;
use rocket::local::blocking::Client;
use serde_json::Value;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use tempfile::TempDir;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Client over a fully wired service rooted in a temp directory. The tool
/// paths point at /usr/bin/false so requests that reach ffmpeg fail fast
/// instead of needing a real encoder.
fn test_client() -> (Client, TempDir, FforgeConfig) {
    let tmp = TempDir::new().unwrap();
    let cfg = FforgeConfig {
        ffmpeg_path: "/usr/bin/false".to_string(),
        ffprobe_path: "/usr/bin/false".to_string(),
        media_root: tmp.path().to_string_lossy().to_string(),
        ..FforgeConfig::default()
    };
    let boot_logs = storage::ensure_directories(&cfg).unwrap();
    let rocket = web::build(cfg.clone(), boot_logs, LOCALHOST, 0);
    (Client::tracked(rocket).unwrap(), tmp, cfg)
}

fn body_json(response: rocket::local::blocking::LocalResponse) -> Value {
    serde_json::from_str(&response.into_string().unwrap()).unwrap()
}

fn envelope_keys_present(json: &Value) {
    for key in ["code", "message", "ts", "data", "errors", "logs", "exec_time"] {
        assert!(json.get(key).is_some(), "missing envelope key '{}'", key);
    }
}

#[test]
fn test_missing_to_parameter() {
    let (client, _tmp, _cfg) = test_client();
    let response = client.get("/api/convert?filename=clip.mp4").dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    envelope_keys_present(&json);
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "Missing 'to' parameter.");
    assert_eq!(json["errors"]["type"], "Input Error");
    assert_eq!(json["data"], Value::Null);
}

#[test]
fn test_missing_source_parameters() {
    let (client, _tmp, _cfg) = test_client();
    let response = client.get("/api/convert?to=mp3").dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Missing 'filename' or 'url' parameter.");
    assert_eq!(json["errors"]["type"], "Input Error");
    assert_eq!(
        json["errors"]["details"],
        "Please provide either a local 'filename' or a 'url' to download."
    );
}

#[test]
fn test_both_source_parameters() {
    let (client, _tmp, _cfg) = test_client();
    let response = client
        .get("/api/convert?to=mp3&filename=a.mp4&url=http://example.com/a.mp4")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Ambiguous request.");
}

#[test]
fn test_traversal_filename_rejected() {
    let (client, _tmp, _cfg) = test_client();
    let response = client
        .get("/api/convert?to=mp3&filename=..%2F..%2Fetc%2Fpasswd")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Invalid 'filename'.");
    assert_eq!(json["errors"]["type"], "Input Error");
}

#[test]
fn test_missing_upload_is_404() {
    let (client, _tmp, _cfg) = test_client();
    let response = client
        .get("/api/convert?to=mp3&filename=absent.mp4")
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);

    let json = body_json(response);
    assert_eq!(json["code"], 404);
    assert_eq!(json["message"], "File not found.");
    assert_eq!(json["errors"]["type"], "File Error");
}

#[test]
fn test_disallowed_conversion_pair() {
    let (client, tmp, _cfg) = test_client();
    fs::write(tmp.path().join("uploads").join("song.mp3"), b"x").unwrap();

    let response = client
        .get("/api/convert?to=mp4&filename=song.mp3")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Conversion from 'mp3' to 'mp4' is not allowed.");
    assert_eq!(json["errors"]["type"], "Validation Error");
}

#[test]
fn test_unsupported_input_format() {
    let (client, tmp, _cfg) = test_client();
    fs::write(tmp.path().join("uploads").join("clip.exe"), b"x").unwrap();

    let response = client
        .get("/api/convert?to=mp3&filename=clip.exe")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Input format 'exe' is not supported.");
    assert_eq!(json["errors"]["type"], "Validation Error");
}

#[test]
fn test_invalid_url_scheme() {
    let (client, _tmp, _cfg) = test_client();
    let response = client
        .get("/api/convert?to=mp3&url=ftp%3A%2F%2Fexample.com%2Fa.mp4")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Invalid URL scheme.");
}

#[test]
fn test_url_without_filename() {
    let (client, _tmp, _cfg) = test_client();
    let response = client
        .get("/api/convert?to=mp3&url=http%3A%2F%2Fexample.com%2F")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Could not determine filename from URL.");
}

#[test]
fn test_url_format_precheck_runs_before_download() {
    let (client, _tmp, _cfg) = test_client();
    // TEST-NET-1 host: a download attempt would hang or fail with a
    // Download Error, not a Validation Error.
    let response = client
        .get("/api/convert?to=mp3&url=http%3A%2F%2F192.0.2.1%2Freport.pdf")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let json = body_json(response);
    assert_eq!(json["message"], "Input format 'pdf' from URL is not supported.");
    assert_eq!(json["errors"]["type"], "Validation Error");
}

#[test]
fn test_unconfigured_tools_are_server_error() {
    let tmp = TempDir::new().unwrap();
    let cfg = FforgeConfig {
        ffmpeg_path: String::new(),
        ffprobe_path: String::new(),
        media_root: tmp.path().to_string_lossy().to_string(),
        ..FforgeConfig::default()
    };
    let boot_logs = storage::ensure_directories(&cfg).unwrap();
    let client = Client::tracked(web::build(cfg, boot_logs, LOCALHOST, 0)).unwrap();

    let response = client
        .get("/api/convert?to=mp3&filename=clip.mp4")
        .dispatch();
    assert_eq!(response.status(), Status::InternalServerError);

    let json = body_json(response);
    assert_eq!(json["message"], "Configuration error.");
    assert_eq!(json["errors"]["type"], "Server Error");
}

#[test]
fn test_failed_conversion_reports_conversion_error() {
    let (client, tmp, _cfg) = test_client();
    fs::write(tmp.path().join("uploads").join("clip.mp4"), b"garbage").unwrap();

    // /usr/bin/false stands in for ffmpeg and exits 1.
    let response = client
        .get("/api/convert?to=mp3&filename=clip.mp4")
        .dispatch();
    assert_eq!(response.status(), Status::InternalServerError);

    let json = body_json(response);
    assert_eq!(json["message"], "Conversion failed.");
    assert_eq!(json["errors"]["type"], "Conversion Error");

    // No partial artifact appears in the converted directory.
    let leftovers: Vec<_> = fs::read_dir(tmp.path().join("converted")).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_boot_logs_echoed_in_responses() {
    let (client, _tmp, _cfg) = test_client();
    let response = client.get("/api/convert?to=mp3").dispatch();

    let json = body_json(response);
    let logs: Vec<String> = json["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(logs.iter().any(|l| l.contains("'uploads'")));
    assert!(logs.iter().any(|l| l.contains("'converted'")));
}

#[test]
fn test_health_endpoint() {
    let (client, _tmp, cfg) = test_client();
    let response = client.get("/api/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let json = body_json(response);
    envelope_keys_present(&json);
    assert_eq!(json["code"], 200);
    assert_eq!(json["message"], "OK");
    assert_eq!(
        json["data"]["max_concurrent_jobs"],
        cfg.max_concurrent_jobs
    );
    assert!(json["data"]["formats"].as_array().unwrap().len() >= 14);
}

#[test]
fn test_converted_serves_existing_file() {
    let (client, tmp, _cfg) = test_client();
    fs::write(tmp.path().join("converted").join("clip_123.mp3"), b"audio").unwrap();

    let response = client.get("/converted/clip_123.mp3").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_bytes().unwrap(), b"audio");
}

#[test]
fn test_converted_missing_file_is_404() {
    let (client, _tmp, _cfg) = test_client();
    let response = client.get("/converted/absent.mp3").dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn test_converted_rejects_traversal() {
    let (client, tmp, _cfg) = test_client();
    fs::write(tmp.path().join("secret.txt"), b"top secret").unwrap();

    let response = client.get("/converted/..%2Fsecret.txt").dispatch();
    assert_ne!(response.status(), Status::Ok);
    if let Some(body) = response.into_string() {
        assert!(!body.contains("top secret"));
    }
}

#[test]
fn test_success_envelope_shape_on_real_conversion() {
    // Only runs where a real ffmpeg can synthesize and convert media.
    let Ok(ffmpeg) = which::which("ffmpeg") else {
        return;
    };
    let Ok(ffprobe) = which::which("ffprobe") else {
        return;
    };

    let tmp = TempDir::new().unwrap();
    let cfg = FforgeConfig {
        ffmpeg_path: ffmpeg.to_string_lossy().to_string(),
        ffprobe_path: ffprobe.to_string_lossy().to_string(),
        media_root: tmp.path().to_string_lossy().to_string(),
        ..FforgeConfig::default()
    };
    let boot_logs = storage::ensure_directories(&cfg).unwrap();

    // One second of silence in a wav container.
    let status = std::process::Command::new(&ffmpeg)
        .args([
            "-f",
            "lavfi",
            "-i",
            "anullsrc=r=8000:cl=mono",
            "-t",
            "1",
            "-y",
        ])
        .arg(tmp.path().join("uploads").join("silence.wav"))
        .status()
        .unwrap();
    assert!(status.success());

    let client = Client::tracked(web::build(cfg, boot_logs, LOCALHOST, 0)).unwrap();
    let response = client
        .get("/api/convert?to=mp3&filename=silence.wav")
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let json = body_json(response);
    envelope_keys_present(&json);
    assert_eq!(json["code"], 200);
    assert_eq!(json["message"], "File converted successfully.");
    assert_eq!(json["errors"], Value::Null);
    assert_eq!(json["data"]["original_file"], "silence.wav");

    let new_file = json["data"]["new_file"].as_str().unwrap();
    assert!(new_file.starts_with("silence_"));
    assert!(new_file.ends_with(".mp3"));
    assert!(tmp.path().join("converted").join(new_file).is_file());

    let file_url = json["data"]["file_url"].as_str().unwrap();
    assert!(file_url.ends_with(new_file));

    // The artifact is downloadable through the service itself.
    let served = client.get(format!("/converted/{}", new_file)).dispatch();
    assert_eq!(served.status(), Status::Ok);
}
