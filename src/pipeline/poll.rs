use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info};

use super::retry::{RetryConfig, with_retry};
use super::stage::Stage;
use crate::error::PipelineError;
use crate::ui::ProgressReporter;
use crate::videos::{VideoJob, VideoService, VideoStatus};

/// Timing of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed wait between two status checks.
    pub interval: Duration,
    /// Give up once this much time has passed since the run started.
    /// `None` polls until the service reports a terminal status.
    pub max_wait: Option<Duration>,
}

/// Progress sample emitted right before each sleep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollTick {
    /// Number of status checks made so far.
    pub attempt: u32,
    pub status: VideoStatus,
    pub progress: Option<u8>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    pub next_check_in: Duration,
}

/// Terminal snapshot plus loop statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub job: VideoJob,
    pub polls: u32,
}

/// Re-fetches a job until the service reports a terminal status.
pub struct StatusPoller<'a, S> {
    service: &'a S,
    settings: PollSettings,
    retry: &'a RetryConfig,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: VideoService> StatusPoller<'a, S> {
    pub fn new(
        service: &'a S,
        settings: PollSettings,
        retry: &'a RetryConfig,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            service,
            settings,
            retry,
            reporter,
        }
    }

    /// Polls `job_id` until it is completed, failed or cancelled.
    ///
    /// The first check happens immediately. `started` is the instant the
    /// run began; elapsed time and the `max_wait` bound are measured from it.
    /// The bound also covers retry backoff, so a rate-limited service ends
    /// the loop with [`PipelineError::Timeout`].
    pub async fn wait(&self, job_id: &str, started: Instant) -> Result<PollResult, PipelineError> {
        self.reporter.stage_started(Stage::Poll);
        self.reporter.polling_started(job_id);
        let deadline = self.settings.max_wait.map(|max_wait| started + max_wait);

        let mut job = self
            .retrieve(job_id, started, deadline, VideoStatus::Unknown)
            .await?;
        let mut polls = 1u32;
        self.reporter.initial_status(&job);

        while !job.status.is_terminal() {
            let elapsed = started.elapsed();
            if let Some(max_wait) = self.settings.max_wait {
                if elapsed >= max_wait {
                    return Err(PipelineError::Timeout {
                        job_id: job_id.to_string(),
                        elapsed,
                        last_status: job.status,
                    });
                }
            }

            let next_check_in = match deadline {
                Some(deadline) => self
                    .settings
                    .interval
                    .min(deadline.saturating_duration_since(Instant::now())),
                None => self.settings.interval,
            };
            debug!(job_id, status = %job.status, polls, elapsed_secs = elapsed.as_secs(), "job not finished");
            self.reporter.poll_tick(&PollTick {
                attempt: polls,
                status: job.status,
                progress: job.progress,
                elapsed,
                next_check_in,
            });
            sleep(next_check_in).await;

            job = self.retrieve(job_id, started, deadline, job.status).await?;
            polls += 1;
        }

        let elapsed = started.elapsed();
        info!(job_id, status = %job.status, polls, elapsed_secs = elapsed.as_secs(), "job reached terminal status");
        self.reporter.polling_finished(&job, elapsed);
        Ok(PollResult { job, polls })
    }

    /// One status check through the retry policy. `last_status` is what the
    /// previous check saw, reported if the deadline passes meanwhile.
    async fn retrieve(
        &self,
        job_id: &str,
        started: Instant,
        deadline: Option<Instant>,
        last_status: VideoStatus,
    ) -> Result<VideoJob, PipelineError> {
        let service = self.service;
        with_retry(self.retry, Stage::Poll, self.reporter, deadline, move || {
            service.retrieve(job_id)
        })
        .await
        .map_err(|failure| {
            if failure.deadline_reached {
                PipelineError::Timeout {
                    job_id: job_id.to_string(),
                    elapsed: started.elapsed(),
                    last_status,
                }
            } else {
                PipelineError::remote(Stage::Poll, failure.attempts, failure.error)
            }
        })
    }
}
