//! Duration probe: the cheap validation gate in front of the encoder.

use std::path::Path;

use tracing::{info, warn};

use super::error::{PipelineError, PipelineResult};
use super::ports::MediaTool;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbedDuration {
    pub seconds: f64,
    /// `hh:mm:ss`, truncated to whole seconds.
    pub formatted: String,
}

/// Every probe failure is reported as an invalid duration so the job stops
/// before any encoding is paid for.
pub async fn probe(tool: &dyn MediaTool, input: &Path) -> PipelineResult<ProbedDuration> {
    let seconds = tool.probe_duration(input).await.map_err(|e| {
        warn!("Probe failed for {}: {}", input.display(), e);
        PipelineError::InvalidDuration {
            reason: e.to_string(),
        }
    })?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(PipelineError::InvalidDuration {
            reason: format!("probed duration {seconds} is not positive"),
        });
    }

    let formatted = format_duration(seconds);
    info!("⏱️ Source duration {}s ({})", seconds, formatted);

    Ok(ProbedDuration { seconds, formatted })
}

pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
