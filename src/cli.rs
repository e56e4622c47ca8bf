//! Interface de linha de comando do videogen baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (generate, status,
//! download) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Overrides;
use crate::videos::VideoVariant;

/// videogen: gera um vídeo a partir de um prompt de texto e faz o download.
#[derive(Debug, Parser)]
#[command(name = "videogen", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração TOML (padrão: ./videogen.toml, se existir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita logs de depuração no stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Envia um prompt, aguarda o job e baixa o vídeo.
    Generate(GenerateArgs),

    /// Mostra o status atual de um job existente.
    Status {
        /// Id retornado na criação do job.
        video_id: String,

        /// Continua consultando até o job chegar a um status terminal.
        #[arg(long, default_value_t = false)]
        wait: bool,
    },

    /// Baixa o conteúdo de um job concluído.
    Download {
        /// Id de um job concluído.
        video_id: String,

        /// Qual versão do conteúdo baixar.
        #[arg(long, value_enum, default_value_t = VariantArg::Video)]
        variant: VariantArg,

        /// Diretório de destino.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Prompt de texto descrevendo o vídeo.
    #[arg(long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Lê o prompt de um arquivo.
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Resolução no formato <largura>x<altura>, ex.: 720x1280.
    #[arg(long)]
    pub size: Option<String>,

    /// Duração do clipe em segundos.
    #[arg(long)]
    pub seconds: Option<String>,

    /// Nome do deployment do modelo.
    #[arg(long)]
    pub model: Option<String>,

    /// Diretório onde o vídeo será salvo.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Segundos entre consultas de status.
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Desiste após esta quantidade de segundos de espera (0 espera indefinidamente).
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Imprime um relatório JSON da execução ao final.
    #[arg(long, default_value_t = false)]
    pub report: bool,
}

impl GenerateArgs {
    /// Overrides de configuração vindos destas flags. `prompt` é o texto já
    /// resolvido, seja inline ou lido de `--prompt-file`.
    pub fn overrides(&self, prompt: Option<String>) -> Overrides {
        Overrides {
            prompt,
            size: self.size.clone(),
            seconds: self.seconds.clone(),
            model: self.model.clone(),
            output_dir: self.output_dir.clone(),
            poll_interval_secs: self.poll_interval,
            max_wait_secs: self.max_wait,
        }
    }
}

/// Variante aceita pela CLI, mapeada para [`VideoVariant`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    /// O vídeo MP4.
    Video,
    /// Uma imagem estática de prévia.
    Thumbnail,
    /// Uma grade de quadros.
    Spritesheet,
}

impl From<VariantArg> for VideoVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Video => VideoVariant::Video,
            VariantArg::Thumbnail => VideoVariant::Thumbnail,
            VariantArg::Spritesheet => VideoVariant::Spritesheet,
        }
    }
}
