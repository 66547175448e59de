// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

pub mod config;
pub mod converter;
pub mod error;
pub mod fetcher;
pub mod formats;
pub mod pipeline;
pub mod storage;
pub mod validate;
pub mod web;

pub use config::FforgeConfig;
