// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use thiserror::Error;

/// The fixed error taxonomy surfaced in the `errors.type` field of every
/// failure response. Input and Validation are the client's fault, File means
/// the referenced upload is absent, and the 500-class kinds cover downloads,
/// ffmpeg failures, and operator misconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Validation,
    File,
    Download,
    Conversion,
    Server,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Input => "Input Error",
            ErrorKind::Validation => "Validation Error",
            ErrorKind::File => "File Error",
            ErrorKind::Download => "Download Error",
            ErrorKind::Conversion => "Conversion Error",
            ErrorKind::Server => "Server Error",
        }
    }

    pub fn http_code(&self) -> u16 {
        match self {
            ErrorKind::Input | ErrorKind::Validation => 400,
            ErrorKind::File => 404,
            ErrorKind::Download | ErrorKind::Conversion | ErrorKind::Server => 500,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<String>,
    pub log: Option<String>,
}

impl RequestError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            log: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    pub fn input(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message).details(details)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn file(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::File, message).details(details)
    }

    pub fn download(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Download, message).details(details)
    }

    pub fn server(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message).details(details)
    }
}
