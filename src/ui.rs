//! Interface de terminal do videogen: banners de etapa, saída colorida e
//! spinner de polling.
//!
//! O pipeline só conversa com o trait [`ProgressReporter`]. O
//! [`ConsoleReporter`] o renderiza com estilos da crate `console` e um
//! spinner da crate `indicatif`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::{Artifact, PipelineOutcome, PollTick, RunReport, Stage};
use crate::videos::{CreateVideoRequest, VideoJob};

const RULE_WIDTH: usize = 60;

/// Observador do progresso do pipeline. Apenas informativo: nada aqui
/// altera o fluxo de controle.
pub trait ProgressReporter {
    fn stage_started(&self, _stage: Stage) {}

    /// `path` é relativo à base da API, ex.: `videos`.
    fn submitting(&self, _path: &str, _req: &CreateVideoRequest) {}

    fn submitted(&self, _job: &VideoJob) {}

    fn polling_started(&self, _job_id: &str) {}

    fn initial_status(&self, _job: &VideoJob) {}

    /// Chamado antes de cada espera do loop de polling.
    fn poll_tick(&self, _tick: &PollTick) {}

    fn polling_finished(&self, _job: &VideoJob, _elapsed: Duration) {}

    fn retrying(&self, _stage: Stage, _attempt: u32, _max: u32, _reason: &str, _delay: Duration) {}

    fn created_directory(&self, _dir: &Path) {}

    fn download_started(&self, _path: &str, _job_id: &str, _output: &Path) {}

    fn downloaded(&self, _artifact: &Artifact) {}
}

/// Reporter que não imprime nada.
#[cfg(test)]
pub struct NullReporter;

#[cfg(test)]
impl ProgressReporter for NullReporter {}

/// Saída legível no console para uma execução interativa.
///
/// Exibe banners por etapa, um spinner durante o polling e mensagens
/// coloridas para sucesso (verde), falha (vermelho) e retentativa (amarelo).
pub struct ConsoleReporter {
    // Prefixo para os caminhos relativos de endpoint informados pelo pipeline.
    base_url: String,
    // Spinner do indicatif, ativo apenas durante o polling.
    spinner: Mutex<Option<ProgressBar>>,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para mensagens de retentativa e status em andamento.
    yellow: Style,
    // Negrito para títulos dos banners.
    bold: Style,
}

impl ConsoleReporter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            spinner: Mutex::new(None),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            bold: Style::new().bold(),
        }
    }

    fn banner(&self, title: &str) {
        println!();
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("{}", self.bold.apply_to(title));
        println!("{}", "=".repeat(RULE_WIDTH));
    }

    fn rule(&self) {
        println!("{}", "-".repeat(RULE_WIDTH));
    }

    /// Imprime através do spinner quando ele está ativo, sem quebrar linhas.
    fn line(&self, text: String) {
        let guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(pb) => pb.println(text),
            None => println!("{text}"),
        }
    }

    fn finish_spinner(&self) {
        let mut guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    /// Resumo final de uma execução de `generate`.
    pub fn print_outcome(&self, outcome: &PipelineOutcome) {
        match outcome {
            PipelineOutcome::Downloaded { job, artifact } => {
                self.banner("PIPELINE COMPLETE");
                println!("Video ID: {}", job.id);
                println!("Saved to: {}", artifact.path.display());
            }
            PipelineOutcome::JobFailed { job } => {
                self.banner("PIPELINE FAILED");
                println!("Video generation did not complete successfully.");
                println!("Final status: {}", self.red.apply_to(job.status));
                if let Some(detail) = job.failure_detail() {
                    println!("Failure reason: {detail}");
                }
                println!();
                println!("Common failure reasons:");
                for hint in ErrorKind::JobFailed.guidance() {
                    println!("  - {hint}");
                }
            }
        }
    }

    /// Mensagem de erro categorizada e dicas de solução, no stderr.
    pub fn print_error(&self, err: &PipelineError) {
        self.finish_spinner();
        let kind = err.kind();
        eprintln!();
        eprintln!("{} Error: {err}", self.red.apply_to("✗"));
        eprintln!("Error type: {kind}");
        eprintln!();
        eprintln!("Troubleshooting:");
        for hint in kind.guidance() {
            eprintln!("  - {hint}");
        }
    }

    /// Um snapshot do job, como exibido por `videogen status`.
    pub fn print_job(&self, job: &VideoJob) {
        let style = if job.status.is_success() {
            &self.green
        } else if job.status.is_terminal() {
            &self.red
        } else {
            &self.yellow
        };
        println!("Video ID: {}", job.id);
        println!("Status: {}", style.apply_to(job.status));
        if let Some(progress) = job.progress {
            println!("Progress: {progress}%");
        }
        if let Some(model) = &job.model {
            println!("Model: {model}");
        }
        if let Some(created_at) = job.created_at {
            println!("Created At: {created_at}");
        }
        if let Some(detail) = job.failure_detail() {
            println!("Failure reason: {detail}");
        }
    }

    /// Imprime o relatório da execução como JSON formatado.
    pub fn print_report(&self, report: &RunReport) {
        let style = if report.error_kind.is_some() {
            &self.red
        } else {
            &self.green
        };
        println!();
        println!("{}", style.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

impl ProgressReporter for ConsoleReporter {
    fn stage_started(&self, stage: Stage) {
        self.banner(&format!("STEP {}: {}", stage.step(), stage.title()));
    }

    fn submitting(&self, path: &str, req: &CreateVideoRequest) {
        println!("Endpoint URL: {}{path}", self.base_url);
        println!("Prompt: {}", req.prompt);
        println!("Duration: {} seconds", req.seconds);
        println!("Resolution: {}", req.size);
        println!("Model: {}", req.model);
        self.rule();
    }

    fn submitted(&self, job: &VideoJob) {
        println!();
        println!(
            "{} Video generation started successfully!",
            self.green.apply_to("✓")
        );
        println!("  Video ID: {}", job.id);
        println!("  Status: {}", job.status);
        if let Some(model) = &job.model {
            println!("  Model: {model}");
        }
        if let Some(created_at) = job.created_at {
            println!("  Created At: {created_at}");
        }
    }

    fn polling_started(&self, job_id: &str) {
        println!("Video ID: {job_id}");
        self.rule();
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn initial_status(&self, job: &VideoJob) {
        self.line(format!("Initial status: {}", job.status));
    }

    fn poll_tick(&self, tick: &PollTick) {
        let progress = tick
            .progress
            .map(|p| format!(" ({p}%)"))
            .unwrap_or_default();
        let message = format!(
            "Status: {}{progress} | Elapsed: {} seconds | Waiting {}s...",
            tick.status,
            tick.elapsed.as_secs(),
            tick.next_check_in.as_secs()
        );
        let guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(pb) => pb.set_message(message),
            None => println!("{message}"),
        }
    }

    fn polling_finished(&self, job: &VideoJob, elapsed: Duration) {
        self.finish_spinner();
        println!();
        if job.status.is_success() {
            println!("{} Video generation completed!", self.green.apply_to("✓"));
        } else {
            println!(
                "{} Video generation ended with status: {}",
                self.red.apply_to("✗"),
                job.status
            );
        }
        println!("  Total time: {} seconds", elapsed.as_secs());
        if !job.status.is_success() {
            if let Some(err) = &job.error {
                println!("  Error: {err}");
            }
            if let Some(reason) = &job.failure_reason {
                println!("  Failure reason: {reason}");
            }
        }
    }

    fn retrying(&self, stage: Stage, attempt: u32, max: u32, reason: &str, delay: Duration) {
        self.line(format!(
            "  {} {stage} retry {attempt}/{max}: {reason} (waiting {}ms)",
            self.yellow.apply_to("↻"),
            delay.as_millis()
        ));
    }

    fn created_directory(&self, dir: &Path) {
        println!("Created directory: {}", dir.display());
    }

    fn download_started(&self, path: &str, job_id: &str, output: &Path) {
        println!("Downloading video...");
        println!("  Endpoint URL: {}{path}", self.base_url);
        println!("  Video ID: {job_id}");
        println!("  Output Path: {}", output.display());
        self.rule();
    }

    fn downloaded(&self, artifact: &Artifact) {
        println!();
        println!("{} Video saved successfully!", self.green.apply_to("✓"));
        println!("  Location: {}", artifact.absolute_path.display());
        println!("  File size: {} bytes", group_thousands(artifact.size_bytes));
    }
}

/// Formata `1234567` como `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1024), "1,024");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
