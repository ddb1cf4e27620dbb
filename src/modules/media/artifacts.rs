//! Local artifact names and the remote key layout derived from a source key.
//!
//! Keys are a pure function of the source key so re-processing the same
//! object overwrites its previous output instead of accumulating copies.

use std::path::Path;

pub const MASTER_MANIFEST: &str = "master.m3u8";
pub const AUDIO_FILE: &str = "audio.mp3";
pub const CAPTION_FILE: &str = "captions.vtt";

/// `raw/course-1/intro.mp4` -> `raw/course-1/intro`
pub fn key_prefix(source_key: &str) -> &str {
    let name_start = source_key.rfind('/').map(|i| i + 1).unwrap_or(0);
    match source_key[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &source_key[..name_start + dot],
        _ => source_key,
    }
}

pub fn stream_key(source_key: &str, file_name: &str) -> String {
    format!("{}/hls/{}", key_prefix(source_key), file_name)
}

pub fn audio_key(source_key: &str) -> String {
    format!("{}/{}", key_prefix(source_key), AUDIO_FILE)
}

pub fn caption_key(source_key: &str) -> String {
    format!("{}/{}", key_prefix(source_key), CAPTION_FILE)
}

/// Files with their own pipeline step; never part of the bulk upload.
pub fn is_side_artifact(file_name: &str) -> bool {
    file_name == AUDIO_FILE || file_name == CAPTION_FILE
}

pub fn content_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("m3u8") => "application/vnd.apple.mpegurl".to_string(),
        Some("ts") => "video/mp2t".to_string(),
        Some("m4s") => "video/iso.segment".to_string(),
        Some("vtt") => "text/vtt".to_string(),
        _ => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
