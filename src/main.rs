mod cli;
mod config;
mod error;
mod orchestrator;
mod pipeline;
#[cfg(test)]
mod testing;
mod ui;
mod videos;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, GenerateArgs, VariantArg};
use config::{ConfigError, Overrides, VideoGenConfig};
use error::{ErrorKind, PipelineError};
use pipeline::{ArtifactDownloader, Stage, StatusPoller};
use ui::ConsoleReporter;
use videos::{VideoJob, VideoService};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match VideoGenConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return fail(&ConsoleReporter::new(""), err.into()),
    };
    let reporter = ConsoleReporter::new(config.base_url());

    let result = match cli.command {
        Command::Generate(args) => generate(config, args, &reporter).await,
        Command::Status { video_id, wait } => status(&config, &video_id, wait, &reporter).await,
        Command::Download {
            video_id,
            variant,
            output_dir,
        } => download(config, &video_id, variant, output_dir, &reporter).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => fail(&reporter, err),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "videogen=debug"
    } else {
        "videogen=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(reporter: &ConsoleReporter, err: PipelineError) -> ExitCode {
    debug!(kind = %err.kind(), error = ?err, "run failed");
    reporter.print_error(&err);
    ExitCode::from(err.kind().exit_code())
}

async fn generate(
    mut config: VideoGenConfig,
    args: GenerateArgs,
    reporter: &ConsoleReporter,
) -> Result<u8, PipelineError> {
    let prompt = match &args.prompt_file {
        Some(path) => Some(read_prompt_file(path)?),
        None => args.prompt.clone(),
    };
    config.apply_overrides(args.overrides(prompt));

    let (result, report) = orchestrator::generate(&config, reporter).await;
    if args.report {
        reporter.print_report(&report);
    }
    let outcome = result?;
    debug!(job_id = %outcome.job().id, status = %outcome.job().status, "generate finished");
    reporter.print_outcome(&outcome);
    Ok(outcome.exit_code())
}

async fn status(
    config: &VideoGenConfig,
    video_id: &str,
    wait: bool,
    reporter: &ConsoleReporter,
) -> Result<u8, PipelineError> {
    let client = orchestrator::connect(config)?;

    if !wait {
        let job = client
            .retrieve(video_id)
            .await
            .map_err(|err| PipelineError::remote(Stage::Poll, 1, err))?;
        reporter.print_job(&job);
        return Ok(status_exit_code(&job));
    }

    config.validate_polling()?;
    let retry = config.retry_config();
    let polled = StatusPoller::new(&client, config.poll_settings(), &retry, reporter)
        .wait(video_id, Instant::now())
        .await?;
    reporter.print_job(&polled.job);
    Ok(status_exit_code(&polled.job))
}

/// 1 for a failed or cancelled job, 0 otherwise.
fn status_exit_code(job: &VideoJob) -> u8 {
    ErrorKind::for_status(job.status).map_or(0, ErrorKind::exit_code)
}

async fn download(
    mut config: VideoGenConfig,
    video_id: &str,
    variant: VariantArg,
    output_dir: Option<PathBuf>,
    reporter: &ConsoleReporter,
) -> Result<u8, PipelineError> {
    config.apply_overrides(Overrides {
        output_dir,
        ..Default::default()
    });
    let client = orchestrator::connect(&config)?;
    let retry = config.retry_config();
    ArtifactDownloader::new(&client, &config.output_dir, &retry, reporter)
        .download(video_id, variant.into())
        .await?;
    Ok(0)
}

fn read_prompt_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::videos::VideoStatus;

    fn job(status: VideoStatus) -> VideoJob {
        serde_json::from_value(serde_json::json!({ "id": "video_1", "status": status }))
            .unwrap()
    }

    #[test]
    fn status_exit_code_follows_job_status() {
        assert_eq!(status_exit_code(&job(VideoStatus::Completed)), 0);
        assert_eq!(status_exit_code(&job(VideoStatus::InProgress)), 0);
        assert_eq!(status_exit_code(&job(VideoStatus::Failed)), 1);
        assert_eq!(status_exit_code(&job(VideoStatus::Cancelled)), 1);
    }
}
