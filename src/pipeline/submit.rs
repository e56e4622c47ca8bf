use tracing::info;

use super::stage::Stage;
use crate::error::PipelineError;
use crate::ui::ProgressReporter;
use crate::videos::{CreateVideoRequest, VideoApiError, VideoJob, VideoService};

/// Sends the creation request. This call is never retried.
pub struct RequestSubmitter<'a, S> {
    service: &'a S,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: VideoService> RequestSubmitter<'a, S> {
    pub fn new(service: &'a S, reporter: &'a dyn ProgressReporter) -> Self {
        Self { service, reporter }
    }

    pub async fn submit(&self, req: &CreateVideoRequest) -> Result<VideoJob, PipelineError> {
        self.reporter.stage_started(Stage::Submit);
        self.reporter.submitting("videos", req);

        let job = self
            .service
            .create(req)
            .await
            .map_err(|err| PipelineError::remote(Stage::Submit, 1, err))?;

        if job.id.trim().is_empty() {
            return Err(PipelineError::Request {
                stage: Stage::Submit,
                source: VideoApiError::ParseError("service returned an empty video id".into()),
            });
        }

        info!(job_id = %job.id, status = %job.status, "video generation started");
        self.reporter.submitted(&job);
        Ok(job)
    }
}
