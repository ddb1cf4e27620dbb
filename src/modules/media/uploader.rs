//! Bounded fan-out upload of everything the encoder wrote.
//!
//! Failure policy is drain: after the first failed transfer no new uploads
//! start, transfers already in flight run to completion, and the first
//! failure (in completion order) is returned once all of them settled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::artifacts::{self, MASTER_MANIFEST};
use super::error::{PipelineError, PipelineResult, StorageError};
use super::ports::ObjectStorage;

/// Local file name -> remote object key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadedArtifacts {
    keys: BTreeMap<String, String>,
}

impl UploadedArtifacts {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.keys.get(file_name).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.values().map(String::as_str)
    }

    /// Master manifest key; falls back to the first key in file-name order
    /// when the encoder did not write a manifest.
    pub fn primary_key(&self) -> Option<&str> {
        if let Some(key) = self.get(MASTER_MANIFEST) {
            return Some(key);
        }

        let fallback = self.keys().next();
        if let Some(key) = fallback {
            warn!("No {} among uploaded artifacts, using {} as primary key", MASTER_MANIFEST, key);
        }
        fallback
    }
}

impl FromIterator<(String, String)> for UploadedArtifacts {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Regular files in `output_dir` excluding the audio and caption artifacts,
/// sorted by name.
pub async fn eligible_files(output_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!("Skipping non UTF-8 artifact {:?}", entry.path());
            continue;
        };
        if artifacts::is_side_artifact(name) {
            continue;
        }
        files.push(entry.path());
    }

    files.sort();
    Ok(files)
}

pub async fn upload_all(
    storage: Arc<dyn ObjectStorage>,
    output_dir: &Path,
    bucket: &str,
    source_key: &str,
    concurrency: usize,
    cancel: &CancellationToken,
) -> PipelineResult<UploadedArtifacts> {
    let files = eligible_files(output_dir).await?;
    if files.is_empty() {
        return Err(PipelineError::EmptyOutput {
            dir: output_dir.display().to_string(),
        });
    }

    info!("⬆️ Uploading {} artifacts (max {} concurrent)", files.len(), concurrency);

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let uploaded = Arc::new(Mutex::new(BTreeMap::new()));
    let halt = cancel.child_token();
    let mut tasks = JoinSet::new();

    for path in files {
        let permit = tokio::select! {
            biased;
            _ = halt.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let key = artifacts::stream_key(source_key, &file_name);
        let content_type = artifacts::content_type_for(&path);
        let storage = storage.clone();
        let uploaded = uploaded.clone();
        let halt = halt.clone();
        let bucket = bucket.to_string();

        tasks.spawn(async move {
            let _permit = permit;
            debug!("Uploading {} -> {}", file_name, key);

            match storage.upload_file(&bucket, &key, &path, &content_type).await {
                Ok(remote_key) => {
                    uploaded.lock().await.insert(file_name, remote_key);
                    Ok(())
                }
                Err(e) => {
                    error!("Upload of {} failed: {}", file_name, e);
                    halt.cancel();
                    Err(PipelineError::Storage(e))
                }
            }
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.unwrap_or_else(|e| {
            halt.cancel();
            Err(PipelineError::Storage(StorageError::upload_failed(
                source_key,
                format!("upload task aborted: {e}"),
            )))
        });
        if let Err(e) = outcome {
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let keys = std::mem::take(&mut *uploaded.lock().await);
    info!("⬆️ Uploaded {} artifacts", keys.len());

    Ok(UploadedArtifacts { keys })
}
