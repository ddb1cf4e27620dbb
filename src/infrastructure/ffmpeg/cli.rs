use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::command::{self, HlsOptions};
use crate::modules::media::error::ToolError;
use crate::modules::media::ports::MediaTool;

const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// ffprobe/ffmpeg binaries on the host.
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    ffmpeg: String,
    ffprobe: String,
    hls: HlsOptions,
}

impl FfmpegCli {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>, hls: HlsOptions) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            hls,
        }
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<Output, ToolError> {
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                tool: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Exit {
                tool: program.to_string(),
                exit_code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(output)
    }

    async fn has_audio_stream(&self, input: &Path) -> Result<bool, ToolError> {
        let output = self.run(&self.ffprobe, &command::probe_audio_args(input)).await?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }
}

#[async_trait]
impl MediaTool for FfmpegCli {
    async fn probe_duration(&self, input: &Path) -> Result<f64, ToolError> {
        let output = self.run(&self.ffprobe, &command::probe_duration_args(input)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        parse_duration(&stdout).ok_or_else(|| ToolError::Output {
            tool: self.ffprobe.clone(),
            output: stdout.trim().to_string(),
        })
    }

    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<(), ToolError> {
        let has_audio = self.has_audio_stream(input).await?;
        info!(
            renditions = self.hls.renditions.len(),
            has_audio, "Starting HLS encode"
        );

        let args = command::hls_args(input, output_dir, &self.hls, has_audio);
        self.run(&self.ffmpeg, &args).await?;
        Ok(())
    }
}

/// ffprobe prints `125.400000`; `N/A` and garbage yield `None`.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }

    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
