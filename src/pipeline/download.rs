use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tracing::info;

use super::retry::{RetryConfig, with_retry};
use super::stage::Stage;
use crate::error::{DownloadFailure, PipelineError};
use crate::ui::ProgressReporter;
use crate::videos::{VideoApiError, VideoService, VideoVariant};

/// A downloaded rendition of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub job_id: String,
    pub variant: VideoVariant,
    /// `<output_dir>/<job_id>.<ext>`, as computed from the configuration.
    pub path: PathBuf,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
}

/// Local path for an artifact: `<output_dir>/<job_id>.<ext>`.
pub fn artifact_path(output_dir: &Path, job_id: &str, variant: VideoVariant) -> PathBuf {
    output_dir.join(format!("{job_id}.{}", variant.extension()))
}

/// Rejects ids that would escape the output directory or name no file.
fn check_job_id(job_id: &str) -> Result<(), DownloadFailure> {
    let unusable = job_id.is_empty()
        || job_id == "."
        || job_id == ".."
        || job_id.contains(['/', '\\'])
        || job_id.contains('\0');
    if unusable {
        Err(DownloadFailure::InvalidJobId(job_id.to_string()))
    } else {
        Ok(())
    }
}

/// Creates `dir` (and parents) if missing. Returns whether it was created.
pub async fn ensure_output_dir(dir: &Path) -> std::io::Result<bool> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(false);
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(true)
}

/// Fetches the content of a completed job and writes it to disk.
pub struct ArtifactDownloader<'a, S> {
    service: &'a S,
    output_dir: &'a Path,
    retry: &'a RetryConfig,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: VideoService> ArtifactDownloader<'a, S> {
    pub fn new(
        service: &'a S,
        output_dir: &'a Path,
        retry: &'a RetryConfig,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            service,
            output_dir,
            retry,
            reporter,
        }
    }

    /// Downloads `variant` of `job_id`, overwriting any previous file at the
    /// same path.
    pub async fn download(
        &self,
        job_id: &str,
        variant: VideoVariant,
    ) -> Result<Artifact, PipelineError> {
        self.reporter.stage_started(Stage::Download);
        let fail = |source| PipelineError::Download {
            job_id: job_id.to_string(),
            source,
        };

        check_job_id(job_id).map_err(fail)?;
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| DownloadFailure::Io { path, source }
        };

        if ensure_output_dir(self.output_dir)
            .await
            .map_err(io_err(self.output_dir))
            .map_err(fail)?
        {
            info!(dir = %self.output_dir.display(), "created output directory");
            self.reporter.created_directory(self.output_dir);
        }

        let path = artifact_path(self.output_dir, job_id, variant);
        self.reporter
            .download_started(&format!("videos/{job_id}/content"), job_id, &path);

        // Each attempt recreates the file so a retried stream never appends
        // to a partial one.
        let service = self.service;
        let target = path.as_path();
        let size_bytes = with_retry(self.retry, Stage::Download, self.reporter, None, move || async move {
            let mut file = File::create(target).await?;
            let written = service.download_content(job_id, variant, &mut file).await?;
            Ok::<_, VideoApiError>(written)
        })
        .await
        .map_err(|failure| match failure.error {
            VideoApiError::Io(source) => fail(io_err(&path)(source)),
            error => fail(DownloadFailure::Remote(error)),
        })?;

        let absolute_path = tokio::fs::canonicalize(&path)
            .await
            .map_err(io_err(&path))
            .map_err(fail)?;

        let artifact = Artifact {
            job_id: job_id.to_string(),
            variant,
            path,
            absolute_path,
            size_bytes,
        };
        info!(
            job_id,
            path = %artifact.absolute_path.display(),
            size_bytes = artifact.size_bytes,
            "artifact saved"
        );
        self.reporter.downloaded(&artifact);
        Ok(artifact)
    }
}
