//! Configuração do videogen carregada a partir de `videogen.toml`.
//!
//! A struct [`VideoGenConfig`] contém todos os parâmetros de uma execução.
//! Chaves ausentes no arquivo usam defaults. Variáveis de ambiente têm
//! precedência sobre o arquivo, e flags da CLI sobre ambos. O valor é
//! montado uma vez em `main` e repassado explicitamente.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::{PollSettings, RetryConfig};
use crate::videos::CreateVideoRequest;

/// Arquivo de configuração procurado no diretório de trabalho.
pub const DEFAULT_CONFIG_FILE: &str = "videogen.toml";

pub const ENV_API_KEY: &str = "AZURE_API_KEY";
pub const ENV_RESOURCE_NAME: &str = "AZURE_RESOURCE_NAME";
pub const ENV_MODEL_NAME: &str = "AZURE_MODEL_NAME";
pub const ENV_OUTPUT_DIR: &str = "VIDEOGEN_OUTPUT_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Configuração de nível superior carregada de `videogen.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoGenConfig {
    /// Chave da API de vídeos, enviada como bearer token.
    #[serde(default)]
    pub api_key: String,

    /// Host do recurso Azure, ex.: `my-resource.openai.azure.com`.
    #[serde(default)]
    pub resource_name: String,

    /// URL base completa da API. Quando presente, substitui `resource_name`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Nome do deployment do modelo.
    #[serde(default)]
    pub model: String,

    /// Texto descrevendo o vídeo.
    #[serde(default)]
    pub prompt: String,

    /// Resolução no formato `<largura>x<altura>`.
    #[serde(default = "default_size")]
    pub size: String,

    /// Duração do clipe em segundos.
    #[serde(default = "default_seconds")]
    pub seconds: String,

    /// Diretório onde os vídeos baixados são salvos.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Intervalo fixo entre consultas de status.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Tempo máximo de espera pelo job, em segundos. 0 desativa o limite.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Máximo de retentativas para falhas transitórias.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Atraso base em milissegundos para backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

// Valor padrão para a resolução: "720x1280" (retrato).
fn default_size() -> String {
    "720x1280".to_string()
}

// Valor padrão para a duração: "12" segundos.
fn default_seconds() -> String {
    "12".to_string()
}

// Valor padrão para o diretório de saída: "videos".
fn default_output_dir() -> PathBuf {
    PathBuf::from("videos")
}

// Valor padrão para o intervalo de polling: 10 segundos.
fn default_poll_interval_secs() -> u64 {
    10
}

// Valor padrão para a espera máxima: 30 minutos.
fn default_max_wait_secs() -> u64 {
    1800
}

// Valor padrão para o timeout de cada requisição: 300 segundos.
fn default_request_timeout_secs() -> u64 {
    300
}

// Valor padrão para retentativas máximas: 3.
fn default_max_retries() -> u32 {
    3
}

// Valor padrão para o atraso base: 1000ms.
fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for VideoGenConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            resource_name: String::new(),
            base_url: None,
            model: String::new(),
            prompt: String::new(),
            size: default_size(),
            seconds: default_seconds(),
            output_dir: default_output_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Valores vindos da linha de comando. `None` mantém o valor carregado.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub prompt: Option<String>,
    pub size: Option<String>,
    pub seconds: Option<String>,
    pub model: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
}

impl VideoGenConfig {
    /// Carrega `path`, ou `videogen.toml` do diretório atual quando nenhum
    /// caminho é informado, e depois aplica as variáveis de ambiente.
    ///
    /// Um caminho explícito precisa existir; o arquivo padrão é opcional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// O ambiente tem precedência sobre o arquivo. Valores vazios são ignorados.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(resource) = var(ENV_RESOURCE_NAME) {
            self.resource_name = resource;
        }
        if let Some(model) = var(ENV_MODEL_NAME) {
            self.model = model;
        }
        if let Some(dir) = var(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        let Overrides {
            prompt,
            size,
            seconds,
            model,
            output_dir,
            poll_interval_secs,
            max_wait_secs,
        } = overrides;

        if let Some(prompt) = prompt {
            self.prompt = prompt;
        }
        if let Some(size) = size {
            self.size = size;
        }
        if let Some(seconds) = seconds {
            self.seconds = seconds;
        }
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        if let Some(secs) = poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = max_wait_secs {
            self.max_wait_secs = secs;
        }
    }

    /// Valida o que toda chamada remota exige: chave e endereço.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        let has_base = self.base_url.as_deref().is_some_and(|b| !b.trim().is_empty());
        if !has_base && self.resource_name.trim().is_empty() {
            return Err(ConfigError::Missing("resource_name"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Valida tudo que uma execução de `generate` exige, inclusive credenciais.
    pub fn validate_generation(&self) -> Result<(), ConfigError> {
        self.validate_credentials()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::Missing("model"));
        }
        if self.prompt.trim().is_empty() {
            return Err(ConfigError::Missing("prompt"));
        }
        parse_size(&self.size).map_err(|reason| ConfigError::Invalid {
            field: "size",
            reason,
        })?;
        match self.seconds.trim().parse::<u32>() {
            Ok(secs) if secs > 0 => {}
            _ => {
                return Err(ConfigError::Invalid {
                    field: "seconds",
                    reason: format!("expected a positive whole number, got {:?}", self.seconds),
                });
            }
        }
        self.validate_polling()
    }

    /// Valida os tempos do loop de polling.
    pub fn validate_polling(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Endereço base da API, sempre terminado em `/`.
    pub fn base_url(&self) -> String {
        let base = match self.base_url.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => base.to_string(),
            _ => format!("https://{}/openai/v1/", self.resource_name.trim()),
        };
        if base.ends_with('/') {
            base
        } else {
            format!("{base}/")
        }
    }

    pub fn video_request(&self) -> CreateVideoRequest {
        CreateVideoRequest {
            model: self.model.trim().to_string(),
            prompt: self.prompt.trim().to_string(),
            size: self.size.trim().to_string(),
            seconds: self.seconds.trim().to_string(),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs)),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Interpreta `<largura>x<altura>` como dimensões positivas.
fn parse_size(size: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("expected <width>x<height>, got {size:?}");
    let (w, h) = size.trim().split_once('x').ok_or_else(invalid)?;
    let w: u32 = w.parse().map_err(|_| invalid())?;
    let h: u32 = h.parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}
