// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

/// Allowed output extensions for a given input extension. The table is
/// asymmetric and hand-curated: video containers convert to the full
/// audio+video set, pure audio formats only within the audio set. Inputs not
/// listed here are rejected outright.
pub fn allowed_outputs(input_ext: &str) -> Option<&'static [&'static str]> {
    let outputs: &'static [&'static str] = match input_ext {
        "mp4" => &["avi", "mov", "wmv", "mkv", "flv", "webm", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "avi" => &["mp4", "mov", "wmv", "mkv", "flv", "webm", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "mov" => &["mp4", "avi", "wmv", "mkv", "flv", "webm", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "wmv" => &["mp4", "avi", "mov", "mkv", "flv", "webm", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "mkv" => &["mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "flv" => &["mp4", "avi", "mov", "wmv", "mkv", "webm", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "webm" => &["mp4", "avi", "mov", "wmv", "mkv", "flv", "m4v", "mp3", "wav", "aac", "ogg", "flac"],
        "m4v" => &["mp4", "avi", "mov", "wmv", "mkv", "flv", "webm", "mp3", "wav", "aac", "ogg", "flac"],
        "mp3" => &["wav", "aac", "ogg", "flac"],
        "wav" => &["mp3", "aac", "ogg", "flac"],
        "aac" => &["mp3", "wav", "ogg", "flac"],
        "ogg" => &["mp3", "wav", "aac", "flac"],
        "flac" => &["mp3", "wav", "aac", "ogg"],
        "m4a" => &["mp3", "wav", "aac", "ogg", "flac"],
        _ => return None,
    };
    Some(outputs)
}

pub fn input_formats() -> Vec<&'static str> {
    vec![
        "mp4", "avi", "mov", "wmv", "mkv", "flv", "webm", "m4v", "mp3", "wav", "aac", "ogg",
        "flac", "m4a",
    ]
}

/// Case-insensitive compatibility check. Unknown input extensions are always
/// rejected; there are no wildcard rules.
pub fn is_allowed(input_ext: &str, output_ext: &str) -> bool {
    let input = input_ext.to_lowercase();
    let output = output_ext.to_lowercase();
    allowed_outputs(&input)
        .map(|outputs| outputs.contains(&output.as_str()))
        .unwrap_or(false)
}

fn is_video_target(target: &str) -> bool {
    matches!(
        target,
        "mp4" | "m4v" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm"
    )
}

/// ffmpeg codec arguments for a target format. Returns None for formats with
/// no mapped profile; callers treat that as an internal configuration gap,
/// and a test asserts it cannot happen for any format the compatibility table
/// permits as an output.
pub fn encoder_profile(target: &str, kilobitrate: u32) -> Option<Vec<String>> {
    let base: &[&str] = match target {
        // H.264 video + MP3 audio, speed-optimized preset
        "mp4" | "m4v" | "avi" | "mov" | "mkv" => &[
            "-c:v",
            "libx264",
            "-preset",
            "ultrafast",
            "-crf",
            "28",
            "-c:a",
            "libmp3lame",
        ],
        "wmv" => &["-c:v", "wmv2", "-c:a", "wmav2"],
        "flv" => &["-c:v", "flv", "-c:a", "libmp3lame"],
        "webm" => &["-c:v", "libvpx", "-c:a", "libvorbis"],
        "mp3" => &["-vn", "-c:a", "libmp3lame"],
        "wav" => &["-vn", "-c:a", "pcm_s16le"],
        "aac" => &["-vn", "-c:a", "aac"],
        "ogg" => &["-vn", "-c:a", "libvorbis"],
        "flac" => &["-vn", "-c:a", "flac"],
        _ => return None,
    };

    let mut args: Vec<String> = base.iter().map(|s| s.to_string()).collect();

    // Bitrate ceiling. Lossless targets (wav, flac) ignore it.
    if is_video_target(target) {
        args.push("-b:v".to_string());
        args.push(format!("{}k", kilobitrate));
    } else if matches!(target, "mp3" | "aac" | "ogg") {
        args.push("-b:a".to_string());
        args.push(format!("{}k", kilobitrate));
    }

    Some(args)
}
