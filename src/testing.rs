//! In-memory fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::pipeline::{Artifact, PollTick, Stage};
use crate::ui::ProgressReporter;
use crate::videos::types::VideoJobError;
use crate::videos::{
    CreateVideoRequest, VideoApiError, VideoJob, VideoService, VideoStatus, VideoVariant,
};

/// Something observable that happened during a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Create,
    Retrieve,
    Download,
    /// A poll tick, i.e. the poller is about to sleep.
    Tick,
}

/// Ordered record shared between a fake service and a reporter.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.0.borrow().iter().filter(|e| **e == event).count()
    }
}

/// Scripted answer to one `retrieve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Status(VideoStatus),
    /// HTTP error with this status code.
    Error(u16),
    /// HTTP 429 asking to wait this many milliseconds.
    RateLimited(u64),
}

/// Scripted [`VideoService`]. The last step repeats once the script runs out.
pub struct FakeVideoService {
    job_id: String,
    steps: RefCell<VecDeque<Step>>,
    create_error: Option<u16>,
    content: Vec<u8>,
    failure_reason: Option<String>,
    log: EventLog,
    retrieve_calls: Cell<u32>,
    download_calls: Cell<u32>,
    broken_downloads: Cell<u32>,
}

impl FakeVideoService {
    pub fn new(job_id: &str, steps: impl IntoIterator<Item = Step>, log: EventLog) -> Self {
        Self {
            job_id: job_id.to_string(),
            steps: RefCell::new(steps.into_iter().collect()),
            create_error: None,
            content: vec![0u8; 16],
            failure_reason: None,
            log,
            retrieve_calls: Cell::new(0),
            download_calls: Cell::new(0),
            broken_downloads: Cell::new(0),
        }
    }

    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.content = content;
        self
    }

    pub fn with_failure_reason(mut self, reason: &str) -> Self {
        self.failure_reason = Some(reason.to_string());
        self
    }

    /// The first `count` downloads write half the content, then fail with 503.
    pub fn with_broken_downloads(self, count: u32) -> Self {
        self.broken_downloads.set(count);
        self
    }

    pub fn rejecting_create(mut self, status: u16) -> Self {
        self.create_error = Some(status);
        self
    }

    pub fn retrieve_calls(&self) -> u32 {
        self.retrieve_calls.get()
    }

    pub fn download_calls(&self) -> u32 {
        self.download_calls.get()
    }

    fn snapshot(&self, status: VideoStatus) -> VideoJob {
        let failed = matches!(status, VideoStatus::Failed | VideoStatus::Cancelled);
        VideoJob {
            id: self.job_id.clone(),
            status,
            created_at: None,
            model: Some("sora-2".into()),
            size: None,
            seconds: None,
            progress: None,
            error: (failed && self.failure_reason.is_some()).then(|| VideoJobError {
                code: Some("job_failed".into()),
                message: self.failure_reason.clone(),
            }),
            failure_reason: if failed {
                self.failure_reason.clone()
            } else {
                None
            },
        }
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.borrow_mut();
        if steps.len() > 1 {
            steps.pop_front().unwrap_or(Step::Error(500))
        } else {
            steps.front().cloned().unwrap_or(Step::Error(500))
        }
    }
}

fn api_error(status: u16) -> VideoApiError {
    VideoApiError::ApiError {
        status,
        message: format!("scripted {status}"),
    }
}

impl VideoService for FakeVideoService {
    async fn create(&self, _req: &CreateVideoRequest) -> Result<VideoJob, VideoApiError> {
        self.log.push(Event::Create);
        match self.create_error {
            Some(status) => Err(api_error(status)),
            None => Ok(self.snapshot(VideoStatus::Queued)),
        }
    }

    async fn retrieve(&self, video_id: &str) -> Result<VideoJob, VideoApiError> {
        assert_eq!(video_id, self.job_id);
        self.log.push(Event::Retrieve);
        self.retrieve_calls.set(self.retrieve_calls.get() + 1);
        match self.next_step() {
            Step::Status(status) => Ok(self.snapshot(status)),
            Step::Error(status) => Err(api_error(status)),
            Step::RateLimited(retry_after_ms) => Err(VideoApiError::RateLimited { retry_after_ms }),
        }
    }

    async fn download_content<W>(
        &self,
        video_id: &str,
        _variant: VideoVariant,
        out: &mut W,
    ) -> Result<u64, VideoApiError>
    where
        W: AsyncWrite + Unpin,
    {
        assert_eq!(video_id, self.job_id);
        self.log.push(Event::Download);
        self.download_calls.set(self.download_calls.get() + 1);
        // Two writes, like a body arriving in chunks.
        let (head, tail) = self.content.split_at(self.content.len() / 2);
        out.write_all(head).await?;
        if self.broken_downloads.get() > 0 {
            self.broken_downloads.set(self.broken_downloads.get() - 1);
            return Err(api_error(503));
        }
        out.write_all(tail).await?;
        out.flush().await?;
        Ok(self.content.len() as u64)
    }
}

/// Reporter that remembers poll ticks and retries.
pub struct RecordingReporter {
    log: EventLog,
    ticks: RefCell<Vec<PollTick>>,
    retries: Cell<u32>,
    artifacts: RefCell<Vec<Artifact>>,
}

impl RecordingReporter {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ticks: RefCell::new(Vec::new()),
            retries: Cell::new(0),
            artifacts: RefCell::new(Vec::new()),
        }
    }

    pub fn ticks(&self) -> Vec<PollTick> {
        self.ticks.borrow().clone()
    }

    pub fn retries(&self) -> u32 {
        self.retries.get()
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.borrow().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn poll_tick(&self, tick: &PollTick) {
        self.log.push(Event::Tick);
        self.ticks.borrow_mut().push(tick.clone());
    }

    fn retrying(&self, _stage: Stage, _attempt: u32, _max: u32, _reason: &str, _delay: Duration) {
        self.retries.set(self.retries.get() + 1);
    }

    fn downloaded(&self, artifact: &Artifact) {
        self.artifacts.borrow_mut().push(artifact.clone());
    }
}
