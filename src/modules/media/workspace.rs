//! Per-job scratch space on local disk.
//!
//! Each job gets `<root>/<uuid>/` holding the downloaded source and an
//! `output/` directory for the encoder. The whole tree is removed when the
//! job finishes through [`JobWorkspace::dispose`], and again on drop as a
//! fallback so a cancelled future cleans up too.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{PipelineError, PipelineResult, StorageError};
use super::ports::ObjectStorage;

#[derive(Debug)]
pub struct JobWorkspace {
    correlation_id: Uuid,
    root: PathBuf,
    input_path: PathBuf,
    output_dir: PathBuf,
}

impl JobWorkspace {
    /// Creates a fresh workspace under `base`. The output directory exists on
    /// return; the input file does not until [`download`](Self::download).
    pub async fn create(base: &Path, source_key: &str) -> PipelineResult<Self> {
        let correlation_id = Uuid::new_v4();
        let root = base.join(correlation_id.to_string());
        let output_dir = root.join("output");
        tokio::fs::create_dir_all(&output_dir).await?;

        let input_name = match Path::new(source_key).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("input.{ext}"),
            None => "input".to_string(),
        };
        let input_path = root.join(input_name);

        debug!(%correlation_id, root = %root.display(), "Created job workspace");

        Ok(Self {
            correlation_id,
            root,
            input_path,
            output_dir,
        })
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Streams the source object straight to `input_path`.
    pub async fn download(
        &self,
        storage: &dyn ObjectStorage,
        bucket: &str,
        key: &str,
    ) -> PipelineResult<u64> {
        let object = storage.get_object(bucket, key).await.map_err(|e| match e {
            StorageError::NotFound { .. } => PipelineError::SourceNotFound {
                key: key.to_string(),
            },
            other => PipelineError::Storage(other),
        })?;

        if object.content_length == Some(0) {
            return Err(PipelineError::SourceNotFound {
                key: key.to_string(),
            });
        }

        let content_type = object.content_type.unwrap_or_else(|| "unknown".to_string());
        let mut body = object.body;
        let mut file = BufWriter::new(File::create(&self.input_path).await?);
        let written = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        if written == 0 {
            return Err(PipelineError::SourceNotFound {
                key: key.to_string(),
            });
        }

        info!(
            "⬇️ Downloaded {} bytes ({}) to {}",
            written,
            content_type,
            self.input_path.display()
        );
        Ok(written)
    }

    /// Removes the workspace tree without blocking the runtime. Never fails;
    /// problems are logged. Dropping the workspace afterwards is a no-op.
    pub async fn dispose(&mut self) {
        if self.root.as_os_str().is_empty() {
            return;
        }

        let root = std::mem::take(&mut self.root);
        let result = tokio::fs::remove_dir_all(&root).await;
        self.report_removal(&root, result);
    }

    fn report_removal(&self, root: &Path, result: std::io::Result<()>) {
        match result {
            Ok(()) => debug!(correlation_id = %self.correlation_id, "Removed job workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                correlation_id = %self.correlation_id,
                "Failed to remove workspace {}: {}",
                root.display(),
                e
            ),
        }
    }
}

impl Drop for JobWorkspace {
    // Only reached with a live tree when the job future was dropped early.
    fn drop(&mut self) {
        if self.root.as_os_str().is_empty() {
            return;
        }

        let root = std::mem::take(&mut self.root);
        let result = std::fs::remove_dir_all(&root);
        self.report_removal(&root, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_makes_output_dir_under_unique_root() {
        let base = tempfile::tempdir().unwrap();

        let a = JobWorkspace::create(base.path(), "raw/a.mp4").await.unwrap();
        let b = JobWorkspace::create(base.path(), "raw/a.mp4").await.unwrap();

        assert!(a.output_dir().is_dir());
        assert_ne!(a.root(), b.root());
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert!(a.input_path().ends_with("input.mp4"));
        assert!(!a.input_path().exists());
    }

    #[tokio::test]
    async fn drop_removes_everything() {
        let base = tempfile::tempdir().unwrap();
        let root;
        {
            let ws = JobWorkspace::create(base.path(), "clip").await.unwrap();
            tokio::fs::write(ws.output_dir().join("master.m3u8"), b"#EXTM3U")
                .await
                .unwrap();
            root = ws.root().to_path_buf();
            assert!(ws.input_path().ends_with("input"));
        }

        assert!(!root.exists());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dispose_tolerates_missing_tree() {
        let base = tempfile::tempdir().unwrap();
        let mut ws = JobWorkspace::create(base.path(), "clip.mp4").await.unwrap();
        std::fs::remove_dir_all(ws.root()).unwrap();

        ws.dispose().await;
        ws.dispose().await;
    }

    #[tokio::test]
    async fn dispose_clears_tree_before_drop() {
        let base = tempfile::tempdir().unwrap();
        let mut ws = JobWorkspace::create(base.path(), "raw/a.mp4").await.unwrap();
        tokio::fs::write(ws.input_path(), b"source").await.unwrap();
        tokio::fs::write(ws.output_dir().join("stream_0_000.ts"), b"segment")
            .await
            .unwrap();
        let root = ws.root().to_path_buf();

        ws.dispose().await;

        assert!(!root.exists());
        assert!(ws.root().as_os_str().is_empty());

        // A new workspace under the same base must survive the old one's drop.
        let next = JobWorkspace::create(base.path(), "raw/b.mp4").await.unwrap();
        drop(ws);
        assert!(next.output_dir().is_dir());
    }
}
