//! Tipos de dados para requisições e respostas dos endpoints `/videos`.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON.
//! Um [`VideoJob`] é um snapshot do job remoto na última consulta; só o
//! serviço avança o seu [`VideoStatus`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Corpo de `POST videos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVideoRequest {
    /// Nome do deployment/modelo, ex.: "sora-2".
    pub model: String,
    pub prompt: String,
    /// Resolução no formato `<largura>x<altura>`.
    pub size: String,
    /// Duração do clipe em segundos. A API recebe o valor como string.
    pub seconds: String,
}

/// Status do ciclo de vida informado pelo serviço.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    /// Qualquer valor ainda desconhecido por este cliente. Tratado como não terminal.
    #[serde(other)]
    Unknown,
}

impl VideoStatus {
    /// Status terminais nunca mudam de novo.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            VideoStatus::Completed | VideoStatus::Failed | VideoStatus::Cancelled
        )
    }

    pub fn is_success(self) -> bool {
        self == VideoStatus::Completed
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VideoStatus::Queued => "queued",
            VideoStatus::InProgress => "in_progress",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
            VideoStatus::Cancelled => "cancelled",
            VideoStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Objeto de erro anexado a um job que falhou.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJobError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for VideoJobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{message} ({code})"),
            (None, Some(message)) => f.write_str(message),
            (Some(code), None) => f.write_str(code),
            (None, None) => f.write_str("unspecified error"),
        }
    }
}

/// Snapshot de um job de geração.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: String,
    pub status: VideoStatus,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub seconds: Option<String>,
    /// Percentual informado durante a renderização.
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub error: Option<VideoJobError>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl VideoJob {
    /// Motivo legível de um job que falhou ou foi cancelado, se o serviço
    /// informou algum.
    pub fn failure_detail(&self) -> Option<String> {
        match (&self.error, &self.failure_reason) {
            (Some(err), Some(reason)) => Some(format!("{err}; {reason}")),
            (Some(err), None) => Some(err.to_string()),
            (None, Some(reason)) => Some(reason.clone()),
            (None, None) => None,
        }
    }
}

/// Qual versão de um job concluído baixar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoVariant {
    #[default]
    Video,
    Thumbnail,
    Spritesheet,
}

impl VideoVariant {
    /// Valor do parâmetro de query `variant`.
    pub fn as_query(self) -> &'static str {
        match self {
            VideoVariant::Video => "video",
            VideoVariant::Thumbnail => "thumbnail",
            VideoVariant::Spritesheet => "spritesheet",
        }
    }

    /// Extensão de arquivo usada para o artefato salvo.
    pub fn extension(self) -> &'static str {
        match self {
            VideoVariant::Video => "mp4",
            VideoVariant::Thumbnail => "webp",
            VideoVariant::Spritesheet => "jpg",
        }
    }
}

impl fmt::Display for VideoVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}
