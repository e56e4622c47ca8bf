use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, VideoGenConfig};
use crate::error::PipelineError;
use crate::pipeline::{
    ArtifactDownloader, PipelineOutcome, PollSettings, RequestSubmitter, RetryConfig, RunReport,
    RunTrace, Stage, StatusPoller,
};
use crate::ui::ProgressReporter;
use crate::videos::{CreateVideoRequest, VideoService, VideoVariant, VideosClient};

/// Drives one generation request through submit, poll and download.
pub struct PipelineOrchestrator<'a, S> {
    service: &'a S,
    request: CreateVideoRequest,
    poll: PollSettings,
    retry: RetryConfig,
    output_dir: PathBuf,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: VideoService> PipelineOrchestrator<'a, S> {
    /// Takes everything it needs from an already validated `config`.
    pub fn new(service: &'a S, config: &VideoGenConfig, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            service,
            request: config.video_request(),
            poll: config.poll_settings(),
            retry: config.retry_config(),
            output_dir: config.output_dir.clone(),
            reporter,
        }
    }

    /// Overrides the poll timing derived from the config.
    #[cfg(test)]
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Runs the whole pipeline without building a report.
    #[cfg(test)]
    pub async fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        let mut trace = RunTrace::default();
        self.run_traced(&mut trace).await
    }

    /// Runs the whole pipeline and also returns its [`RunReport`].
    pub async fn run_with_report(&self) -> (Result<PipelineOutcome, PipelineError>, RunReport) {
        let started_at = Utc::now();
        let mut trace = RunTrace::default();
        let result = self.run_traced(&mut trace).await;
        let report = RunReport::new(&self.request, &trace, &result, started_at);
        (result, report)
    }

    async fn run_traced(&self, trace: &mut RunTrace) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();

        // SUBMIT
        trace.enter(Stage::Submit);
        let job = RequestSubmitter::new(self.service, self.reporter)
            .submit(&self.request)
            .await?;
        trace.job_id = Some(job.id.clone());
        trace.final_status = Some(job.status);

        // POLL
        trace.enter(Stage::Poll);
        let polled = StatusPoller::new(self.service, self.poll, &self.retry, self.reporter)
            .wait(&job.id, started)
            .await?;
        trace.polls = polled.polls;
        trace.final_status = Some(polled.job.status);

        let job = polled.job;
        if !job.status.is_success() {
            warn!(
                job_id = %job.id,
                status = %job.status,
                reason = job.failure_detail().as_deref().unwrap_or("none given"),
                "job did not complete"
            );
            return Ok(PipelineOutcome::JobFailed { job });
        }

        // DOWNLOAD
        trace.enter(Stage::Download);
        let artifact =
            ArtifactDownloader::new(self.service, &self.output_dir, &self.retry, self.reporter)
                .download(&job.id, VideoVariant::Video)
                .await?;

        info!(job_id = %job.id, path = %artifact.path.display(), "pipeline complete");
        Ok(PipelineOutcome::Downloaded { job, artifact })
    }
}

/// Builds an HTTP client after checking the credentials in `config`.
pub fn connect(config: &VideoGenConfig) -> Result<VideosClient, PipelineError> {
    config.validate_credentials()?;
    let client = VideosClient::new(
        config.api_key.clone(),
        &config.base_url(),
        config.request_timeout(),
    )
    .map_err(|err| ConfigError::Client(err.to_string()))?;
    debug!(base_url = client.base_url(), "videos client ready");
    Ok(client)
}

/// Validates `config`, connects, and runs the whole pipeline.
///
/// Configuration problems are reported before any network traffic.
pub async fn generate(
    config: &VideoGenConfig,
    reporter: &dyn ProgressReporter,
) -> (Result<PipelineOutcome, PipelineError>, RunReport) {
    let started_at = Utc::now();
    let client = config
        .validate_generation()
        .map_err(PipelineError::from)
        .and_then(|()| connect(config));

    match client {
        Ok(client) => {
            PipelineOrchestrator::new(&client, config, reporter)
                .run_with_report()
                .await
        }
        Err(err) => {
            let result = Err(err);
            let report =
                RunReport::new(&config.video_request(), &RunTrace::default(), &result, started_at);
            (result, report)
        }
    }
}
