mod download;
mod outcome;
mod poll;
mod retry;
mod stage;
mod submit;

pub use download::{Artifact, ArtifactDownloader};
pub use outcome::{PipelineOutcome, RunReport, RunTrace};
pub use poll::{PollSettings, PollTick, StatusPoller};
pub use retry::RetryConfig;
pub use stage::Stage;
pub use submit::RequestSubmitter;
