use std::path::Path;

use tracing::{error, info};

use super::error::{PipelineError, PipelineResult};
use super::ports::MediaTool;

/// Runs the encoder once. Any failure is fatal for the job; there is no
/// partial-success mode.
pub async fn transcode(tool: &dyn MediaTool, input: &Path, output_dir: &Path) -> PipelineResult<()> {
    info!("🎥 Transcoding {} into {}", input.display(), output_dir.display());

    tool.transcode(input, output_dir).await.map_err(|e| {
        error!("Encoder failed: {}", e);
        PipelineError::from(e)
    })?;

    info!("🎥 Transcode finished");
    Ok(())
}
