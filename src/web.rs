// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use crate::config::FforgeConfig;
use crate::error::RequestError;
use crate::pipeline::{self, ConversionRequest};
use crate::storage;
use crate::validate;
use rocket::http::{ContentType, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State, get, routes};
use serde::Serialize;
use serde_json::{Value, json};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// The fixed response shape shared by every endpoint: success and failure
/// differ only in `code`, `data` and `errors`.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub code: u16,
    pub message: String,
    pub ts: i64,
    pub data: Value,
    pub errors: Value,
    pub logs: Vec<String>,
    pub exec_time: f64,
}

impl Envelope {
    fn success(message: &str, data: Value, logs: Vec<String>, started: Instant) -> Self {
        Self {
            code: 200,
            message: message.to_string(),
            ts: chrono::Utc::now().timestamp(),
            data,
            errors: Value::Null,
            logs,
            exec_time: started.elapsed().as_secs_f64(),
        }
    }

    fn failure(err: &RequestError, logs: Vec<String>, started: Instant) -> Self {
        let mut errors = json!({ "type": err.kind.label() });
        if let Some(details) = &err.details {
            errors["details"] = json!(details);
        }
        if let Some(log) = &err.log {
            errors["log"] = json!(log);
        }

        Self {
            code: err.kind.http_code(),
            message: err.message.clone(),
            ts: chrono::Utc::now().timestamp(),
            data: Value::Null,
            errors,
            logs,
            exec_time: started.elapsed().as_secs_f64(),
        }
    }
}

pub struct AppState {
    pub config: FforgeConfig,
    /// Caps concurrent ffmpeg invocations; requests past the cap queue here.
    pub jobs: Arc<Semaphore>,
    /// Directory setup lines from startup, replayed into every response.
    pub boot_logs: Vec<String>,
}

impl AppState {
    pub fn new(config: FforgeConfig, boot_logs: Vec<String>) -> Self {
        let permits = config.max_concurrent_jobs.max(1);
        Self {
            config,
            jobs: Arc::new(Semaphore::new(permits)),
            boot_logs,
        }
    }
}

fn respond(envelope: Envelope) -> (Status, Json<Envelope>) {
    let status = Status::from_code(envelope.code).unwrap_or(Status::InternalServerError);
    (status, Json(envelope))
}

#[get("/api/convert?<url>&<filename>&<to>")]
pub async fn convert(
    url: Option<String>,
    filename: Option<String>,
    to: Option<String>,
    state: &State<AppState>,
) -> (Status, Json<Envelope>) {
    let started = Instant::now();
    let mut logs = state.boot_logs.clone();

    let Some(to) = to.filter(|t| !t.is_empty()) else {
        let err = RequestError::input(
            "Missing 'to' parameter.",
            "Please provide the target format.",
        );
        return respond(Envelope::failure(&err, logs, started));
    };

    // Queue behind the job cap before touching the network or ffmpeg.
    let _permit = state.jobs.acquire().await;

    let request = ConversionRequest { url, filename, to };
    match pipeline::handle_request(&request, &state.config, &mut logs).await {
        Ok(outcome) => {
            let data = serde_json::to_value(&outcome).unwrap_or(Value::Null);
            respond(Envelope::success(
                "File converted successfully.",
                data,
                logs,
                started,
            ))
        }
        Err(err) => respond(Envelope::failure(&err, logs, started)),
    }
}

#[get("/api/health")]
pub async fn health(state: &State<AppState>) -> (Status, Json<Envelope>) {
    let started = Instant::now();
    let data = json!({
        "formats": crate::formats::input_formats(),
        "max_concurrent_jobs": state.config.max_concurrent_jobs,
    });
    respond(Envelope::success("OK", data, Vec::new(), started))
}

#[get("/converted/<name>")]
pub async fn converted(
    name: &str,
    state: &State<AppState>,
) -> Result<(ContentType, Vec<u8>), status::NotFound<String>> {
    let base_name = validate::validate_local_filename(name)
        .map_err(|_| status::NotFound("File not found.".to_string()))?;

    let path = storage::converted_dir(&state.config).join(&base_name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| status::NotFound("File not found.".to_string()))?;

    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentType::from_extension)
        .unwrap_or(ContentType::Binary);

    Ok((content_type, bytes))
}

/// Assembles the Rocket instance; tests drive the same build through
/// `rocket::local`.
pub fn build(config: FforgeConfig, boot_logs: Vec<String>, host: IpAddr, port: u16) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", host))
        .merge(("port", port))
        .merge(("log_level", if cfg!(debug_assertions) { "normal" } else { "off" }));

    rocket::custom(figment)
        .manage(AppState::new(config, boot_logs))
        .mount("/", routes![convert, health, converted])
}

pub async fn launch_server(
    config: FforgeConfig,
    boot_logs: Vec<String>,
    host: IpAddr,
    port: u16,
) -> Result<(), rocket::Error> {
    build(config, boot_logs, host, port).launch().await?;
    Ok(())
}
