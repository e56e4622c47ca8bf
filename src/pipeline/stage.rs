use std::fmt;

use serde::{Deserialize, Serialize};

/// The three stages of a generation run.
///
/// Each run flows through: SUBMIT → POLL → DOWNLOAD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Submit,
    Poll,
    Download,
}

impl Stage {
    /// One-based step number shown in console banners.
    pub fn step(self) -> u8 {
        match self {
            Stage::Submit => 1,
            Stage::Poll => 2,
            Stage::Download => 3,
        }
    }

    /// Banner title for this step.
    pub fn title(self) -> &'static str {
        match self {
            Stage::Submit => "Starting Video Generation",
            Stage::Poll => "Waiting for Video Generation",
            Stage::Download => "Downloading Video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Submit => write!(f, "SUBMIT"),
            Stage::Poll => write!(f, "POLL"),
            Stage::Download => write!(f, "DOWNLOAD"),
        }
    }
}
