use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::pipeline::Stage;
use crate::videos::{VideoApiError, VideoStatus};

/// Everything that can stop a run before it reaches a terminal outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("request rejected during {stage}: {source}")]
    Request {
        stage: Stage,
        #[source]
        source: VideoApiError,
    },

    #[error("remote service unavailable during {stage} after {attempts} attempt(s): {source}")]
    TransientRemote {
        stage: Stage,
        attempts: u32,
        #[source]
        source: VideoApiError,
    },

    #[error(
        "gave up waiting for video {job_id} after {}s (last status: {last_status})",
        .elapsed.as_secs()
    )]
    Timeout {
        job_id: String,
        elapsed: Duration,
        last_status: VideoStatus,
    },

    #[error("download of video {job_id} failed: {source}")]
    Download {
        job_id: String,
        #[source]
        source: DownloadFailure,
    },
}

/// Why an artifact could not be saved.
#[derive(Debug, Error)]
pub enum DownloadFailure {
    #[error("fetching content: {0}")]
    Remote(#[source] VideoApiError),

    #[error("writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("video id {0:?} cannot be used as a file name")]
    InvalidJobId(String),
}

/// Coarse category of a [`PipelineError`] or job outcome, used for exit
/// codes and troubleshooting hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The service finished the job with `failed` or `cancelled`.
    JobFailed,
    Configuration,
    Request,
    TransientRemote,
    Timeout,
    Download,
}

impl ErrorKind {
    /// Failure kind implied by a job snapshot: `JobFailed` for a failed or
    /// cancelled job, nothing for a completed or still running one.
    pub fn for_status(status: VideoStatus) -> Option<ErrorKind> {
        (status.is_terminal() && !status.is_success()).then_some(ErrorKind::JobFailed)
    }

    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::JobFailed => 1,
            ErrorKind::Configuration => 2,
            ErrorKind::Request => 3,
            ErrorKind::TransientRemote => 4,
            ErrorKind::Timeout => 5,
            ErrorKind::Download => 6,
        }
    }

    /// Static hints printed after a failure of this kind.
    pub fn guidance(self) -> &'static [&'static str] {
        match self {
            ErrorKind::JobFailed => &[
                "Copyrighted characters (Elmo, Mickey Mouse, etc.)",
                "Real celebrities or public figures",
                "Violent or inappropriate content",
                "Trademarked content",
            ],
            ErrorKind::Configuration => &[
                "Copy videogen.example.toml or .env.sample and fill in your values",
                "Set AZURE_API_KEY, AZURE_RESOURCE_NAME and AZURE_MODEL_NAME",
                "Provide a prompt with --prompt, --prompt-file or the config file",
            ],
            ErrorKind::Request => &[
                "Verify your API key is correct",
                "Check that your Azure resource name is correct",
                "Ensure your Azure subscription has access to the video model",
                "Verify the prompt and parameters are valid",
            ],
            ErrorKind::TransientRemote => &[
                "Check your network connection",
                "The service may be overloaded; try again later",
                "Raise max_retries or base_delay_ms in the config file",
            ],
            ErrorKind::Timeout => &[
                "The job may still finish; check it later with `videogen status <id>`",
                "Raise max_wait_secs (0 disables the limit)",
            ],
            ErrorKind::Download => &[
                "Check that the output directory is writable and the disk is not full",
                "Retry with `videogen download <id>`",
            ],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::JobFailed => write!(f, "RemoteJobFailure"),
            ErrorKind::Configuration => write!(f, "ConfigurationError"),
            ErrorKind::Request => write!(f, "RequestError"),
            ErrorKind::TransientRemote => write!(f, "TransientRemoteError"),
            ErrorKind::Timeout => write!(f, "TimeoutError"),
            ErrorKind::Download => write!(f, "DownloadError"),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Config(_) => ErrorKind::Configuration,
            PipelineError::Request { .. } => ErrorKind::Request,
            PipelineError::TransientRemote { .. } => ErrorKind::TransientRemote,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::Download { .. } => ErrorKind::Download,
        }
    }

    /// Classifies a failed remote call made during `stage`.
    pub(crate) fn remote(stage: Stage, attempts: u32, source: VideoApiError) -> Self {
        if source.is_transient() {
            PipelineError::TransientRemote {
                stage,
                attempts,
                source,
            }
        } else {
            PipelineError::Request { stage, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::JobFailed,
            ErrorKind::Configuration,
            ErrorKind::Request,
            ErrorKind::TransientRemote,
            ErrorKind::Timeout,
            ErrorKind::Download,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(kinds.iter().all(|k| !k.guidance().is_empty()));
    }

    #[test]
    fn remote_classification() {
        let err = PipelineError::remote(
            Stage::Poll,
            4,
            VideoApiError::ApiError {
                status: 502,
                message: "bad gateway".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::TransientRemote);
        assert_eq!(
            err.to_string(),
            "remote service unavailable during POLL after 4 attempt(s): API error (status 502): bad gateway"
        );

        let err = PipelineError::remote(
            Stage::Submit,
            1,
            VideoApiError::ApiError {
                status: 400,
                message: "invalid seconds".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::Request);
    }

    #[test]
    fn timeout_display() {
        let err = PipelineError::Timeout {
            job_id: "video_9".into(),
            elapsed: Duration::from_secs(1800),
            last_status: VideoStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "gave up waiting for video video_9 after 1800s (last status: in_progress)"
        );
        assert_eq!(err.kind().exit_code(), 5);
    }

    #[test]
    fn job_status_maps_to_failure_kind() {
        assert_eq!(
            ErrorKind::for_status(VideoStatus::Failed),
            Some(ErrorKind::JobFailed)
        );
        assert_eq!(
            ErrorKind::for_status(VideoStatus::Cancelled),
            Some(ErrorKind::JobFailed)
        );
        for status in [
            VideoStatus::Completed,
            VideoStatus::Queued,
            VideoStatus::InProgress,
            VideoStatus::Unknown,
        ] {
            assert_eq!(ErrorKind::for_status(status), None, "{status}");
        }
    }

    #[test]
    fn config_error_converts() {
        let err: PipelineError = ConfigError::Missing("api_key").into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineError>();
    }
}
