//! Argument builders for ffprobe/ffmpeg.

use std::path::Path;

use serde::Deserialize;

use crate::modules::media::artifacts::{AUDIO_FILE, MASTER_MANIFEST};

/// Frames between forced keyframes, so segment cuts line up across renditions.
const KEYFRAME_INTERVAL: &str = "48";

/// One rung of the adaptive bitrate ladder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rendition {
    pub height: u32,
    pub video_bitrate: String,
    pub audio_bitrate: String,
}

#[derive(Debug, Clone)]
pub struct HlsOptions {
    pub renditions: Vec<Rendition>,
    pub segment_seconds: u32,
}

pub fn probe_duration_args(input: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "default=noprint_wrappers=1:nokey=1".into(),
        input.to_string_lossy().into_owned(),
    ]
}

pub fn probe_audio_args(input: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "a".into(),
        "-show_entries".into(),
        "stream=index".into(),
        "-of".into(),
        "csv=p=0".into(),
        input.to_string_lossy().into_owned(),
    ]
}

/// Single ffmpeg invocation writing every rendition, the master playlist and,
/// when the source has audio, the standalone audio extraction.
pub fn hls_args(input: &Path, output_dir: &Path, options: &HlsOptions, has_audio: bool) -> Vec<String> {
    let count = options.renditions.len();
    let out = |name: &str| output_dir.join(name).to_string_lossy().into_owned();

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    let split_labels: String = (0..count).map(|i| format!("[v{i}]")).collect();
    let mut filter = format!("[0:v]split={count}{split_labels}");
    for (i, rendition) in options.renditions.iter().enumerate() {
        filter.push_str(&format!(";[v{i}]scale=-2:{}[v{i}out]", rendition.height));
    }
    args.push("-filter_complex".into());
    args.push(filter);

    for (i, rendition) in options.renditions.iter().enumerate() {
        args.extend([
            "-map".into(),
            format!("[v{i}out]"),
            format!("-c:v:{i}"),
            "libx264".into(),
            format!("-b:v:{i}"),
            rendition.video_bitrate.clone(),
        ]);
    }
    args.extend([
        "-preset".into(),
        "veryfast".into(),
        "-g".into(),
        KEYFRAME_INTERVAL.into(),
        "-sc_threshold".into(),
        "0".into(),
    ]);

    if has_audio {
        for (i, rendition) in options.renditions.iter().enumerate() {
            args.extend([
                "-map".into(),
                "0:a:0".into(),
                format!("-c:a:{i}"),
                "aac".into(),
                format!("-b:a:{i}"),
                rendition.audio_bitrate.clone(),
            ]);
        }
    }

    let stream_map = (0..count)
        .map(|i| if has_audio { format!("v:{i},a:{i}") } else { format!("v:{i}") })
        .collect::<Vec<_>>()
        .join(" ");

    args.extend([
        "-f".into(),
        "hls".into(),
        "-hls_time".into(),
        options.segment_seconds.to_string(),
        "-hls_playlist_type".into(),
        "vod".into(),
        "-hls_segment_filename".into(),
        out("stream_%v_%03d.ts"),
        "-master_pl_name".into(),
        MASTER_MANIFEST.into(),
        "-var_stream_map".into(),
        stream_map,
        out("stream_%v.m3u8"),
    ]);

    if has_audio {
        args.extend([
            "-map".into(),
            "0:a:0".into(),
            "-vn".into(),
            "-c:a".into(),
            "libmp3lame".into(),
            "-b:a".into(),
            "64k".into(),
            out(AUDIO_FILE),
        ]);
    }

    args
}
