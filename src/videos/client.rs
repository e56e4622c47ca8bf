use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::error::VideoApiError;
use super::types::{CreateVideoRequest, VideoJob, VideoVariant};

/// The three remote operations the pipeline depends on.
///
/// Implemented by [`VideosClient`] for real traffic and by fakes in tests.
#[allow(async_fn_in_trait)]
pub trait VideoService {
    async fn create(&self, req: &CreateVideoRequest) -> Result<VideoJob, VideoApiError>;

    async fn retrieve(&self, video_id: &str) -> Result<VideoJob, VideoApiError>;

    /// Streams the content of `variant` into `out` and returns the number
    /// of bytes written.
    async fn download_content<W>(
        &self,
        video_id: &str,
        variant: VideoVariant,
        out: &mut W,
    ) -> Result<u64, VideoApiError>
    where
        W: AsyncWrite + Unpin;
}

/// HTTP client for the OpenAI-compatible `/videos` API.
pub struct VideosClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl VideosClient {
    /// Builds a client for `base_url`, e.g. `https://<resource>/openai/v1/`.
    pub fn new(
        api_key: String,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self, VideoApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base, e.g. `videos/abc`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, VideoApiError> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| VideoApiError::ParseError(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, VideoApiError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(1000);
            return Err(VideoApiError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let raw = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(VideoApiError::ApiError {
                status: status.as_u16(),
                message: extract_error_message(&raw),
            });
        }

        Ok(response)
    }
}

/// Pulls `error.message` out of an OpenAI-style error body, falling back to
/// the raw text.
fn extract_error_message(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|root| {
            root.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| raw.trim().to_string())
}

impl VideoService for VideosClient {
    async fn create(&self, req: &CreateVideoRequest) -> Result<VideoJob, VideoApiError> {
        let url = self.endpoint("videos");
        debug!(%url, model = %req.model, size = %req.size, seconds = %req.seconds, "creating video");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;
        Self::parse_json(response).await
    }

    async fn retrieve(&self, video_id: &str) -> Result<VideoJob, VideoApiError> {
        let url = self.endpoint(&format!("videos/{video_id}"));
        debug!(%url, "retrieving video");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::parse_json(response).await
    }

    async fn download_content<W>(
        &self,
        video_id: &str,
        variant: VideoVariant,
        out: &mut W,
    ) -> Result<u64, VideoApiError>
    where
        W: AsyncWrite + Unpin,
    {
        let url = self.endpoint(&format!("videos/{video_id}/content"));
        debug!(%url, %variant, "downloading content");
        let response = self
            .client
            .get(&url)
            .query(&[("variant", variant.as_query())])
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let mut response = Self::check_status(response).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::videos::VideoStatus;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> VideosClient {
        VideosClient::new(
            "test-key".into(),
            &format!("{}/openai/v1", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn base_url_gets_trailing_slash() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        assert!(client.base_url().ends_with("/openai/v1/"));
        assert_eq!(
            client.endpoint("videos"),
            format!("{}/openai/v1/videos", server.uri())
        );
    }

    #[tokio::test]
    async fn create_posts_json_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/videos"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "model": "sora-2",
                "prompt": "a lighthouse at dusk",
                "size": "720x1280",
                "seconds": "12"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "video_1",
                "object": "video",
                "status": "queued",
                "created_at": 1700000000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let job = client
            .create(&CreateVideoRequest {
                model: "sora-2".into(),
                prompt: "a lighthouse at dusk".into(),
                size: "720x1280".into(),
                seconds: "12".into(),
            })
            .await
            .unwrap();
        assert_eq!(job.id, "video_1");
        assert_eq!(job.status, VideoStatus::Queued);
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/v1/videos/video_1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Access denied due to invalid subscription key.", "code": "401"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.retrieve("video_1").await.unwrap_err();
        match err {
            VideoApiError::ApiError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Access denied due to invalid subscription key.");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/v1/videos/video_1"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.retrieve("video_1").await.unwrap_err();
        assert!(matches!(
            err,
            VideoApiError::RateLimited {
                retry_after_ms: 3000
            }
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/v1/videos/video_1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.retrieve("video_1").await.unwrap_err();
        assert!(matches!(err, VideoApiError::ParseError(_)));
    }

    #[tokio::test]
    async fn download_requests_variant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openai/v1/videos/video_1/content"))
            .and(query_param("variant", "video"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut bytes = Vec::new();
        let written = client
            .download_content("video_1", VideoVariant::Video, &mut bytes)
            .await
            .unwrap();
        assert_eq!(written, 64);
        assert_eq!(bytes.len(), 64);
        assert!(bytes.iter().all(|b| *b == 7));
    }

    #[tokio::test]
    async fn unreachable_host_is_transient() {
        // Nothing listens on port 9 of localhost in the test environment.
        let client =
            VideosClient::new("k".into(), "http://127.0.0.1:9/openai/v1/", Duration::from_secs(2))
                .unwrap();
        let err = client.retrieve("video_1").await.unwrap_err();
        assert!(matches!(err, VideoApiError::NetworkError(_)));
        assert!(err.is_transient());
    }
}
