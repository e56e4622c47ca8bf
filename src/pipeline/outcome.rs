use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::download::Artifact;
use super::stage::Stage;
use crate::error::{ErrorKind, PipelineError};
use crate::videos::{CreateVideoRequest, VideoJob, VideoStatus};

/// How a run ended when no [`PipelineError`] occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The job completed and its video is on disk.
    Downloaded { job: VideoJob, artifact: Artifact },
    /// The service finished the job as `failed` or `cancelled`.
    JobFailed { job: VideoJob },
}

impl PipelineOutcome {
    pub fn job(&self) -> &VideoJob {
        match self {
            PipelineOutcome::Downloaded { job, .. } | PipelineOutcome::JobFailed { job } => job,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineOutcome::Downloaded { .. } => 0,
            PipelineOutcome::JobFailed { .. } => ErrorKind::JobFailed.exit_code(),
        }
    }
}

/// What the orchestrator observed while running, whatever the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTrace {
    pub job_id: Option<String>,
    pub stages: Vec<Stage>,
    pub polls: u32,
    pub final_status: Option<VideoStatus>,
}

impl RunTrace {
    pub(crate) fn enter(&mut self, stage: Stage) {
        self.stages.push(stage);
    }
}

/// Structured record of one `generate` run, printed with `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub job_id: Option<String>,
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub seconds: String,
    pub final_status: Option<VideoStatus>,
    pub stages: Vec<Stage>,
    pub poll_count: u32,
    pub output_path: Option<PathBuf>,
    pub size_bytes: Option<u64>,
    pub failure_reason: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunReport {
    /// Builds the report for a finished run.
    pub fn new(
        req: &CreateVideoRequest,
        trace: &RunTrace,
        result: &Result<PipelineOutcome, PipelineError>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let completed_at = Utc::now();
        let (output_path, size_bytes, failure_reason) = match result {
            Ok(PipelineOutcome::Downloaded { artifact, .. }) => (
                Some(artifact.absolute_path.clone()),
                Some(artifact.size_bytes),
                None,
            ),
            Ok(PipelineOutcome::JobFailed { job }) => (None, None, job.failure_detail()),
            Err(_) => (None, None, None),
        };
        let (error_kind, error) = match result {
            Ok(PipelineOutcome::JobFailed { .. }) => (Some(ErrorKind::JobFailed), None),
            Ok(_) => (None, None),
            Err(err) => (Some(err.kind()), Some(err.to_string())),
        };

        Self {
            job_id: trace.job_id.clone(),
            model: req.model.clone(),
            prompt: req.prompt.clone(),
            size: req.size.clone(),
            seconds: req.seconds.clone(),
            final_status: trace.final_status,
            stages: trace.stages.clone(),
            poll_count: trace.polls,
            output_path,
            size_bytes,
            failure_reason,
            error_kind,
            error,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        }
    }
}
