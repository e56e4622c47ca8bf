//! Tipos de erro para o cliente da API de vídeos.
//!
//! Define [`VideoApiError`] com variantes para rate limiting, erros da API,
//! erros de rede, respostas ilegíveis e falhas de escrita. Usa `thiserror`
//! para derivar `Display` e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com a API de vídeos.
///
/// [`is_transient`](VideoApiError::is_transient) separa as falhas que podem
/// ser retentadas das permanentes.
#[derive(Debug, Error)]
pub enum VideoApiError {
    /// O servidor retornou HTTP 429 (rate limit).
    /// O campo `retry_after_ms` indica quantos milissegundos esperar antes de retentar.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Qualquer outra resposta fora de 2xx (401 chave inválida, 400 prompt inválido, 500 ...).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha na camada de rede (DNS, conexão recusada, timeout, corpo interrompido).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// O corpo de uma resposta 2xx não pôde ser decodificado.
    #[error("failed to parse API response: {0}")]
    ParseError(String),

    /// Falha ao gravar o conteúdo recebido no destino.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

impl VideoApiError {
    /// Indica se repetir a mesma chamada mais tarde pode dar certo.
    ///
    /// Rate limit, timeout de requisição, respostas 5xx e falhas de conexão
    /// são transitórias. Falhas de autenticação, validação, decodificação e
    /// escrita não são.
    pub fn is_transient(&self) -> bool {
        match self {
            VideoApiError::RateLimited { .. } => true,
            VideoApiError::ApiError { status, .. } => *status == 408 || *status >= 500,
            VideoApiError::NetworkError(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            VideoApiError::ParseError(_) | VideoApiError::Io(_) => false,
        }
    }

    /// Espera mínima pedida pelo servidor, se houver.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            VideoApiError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
