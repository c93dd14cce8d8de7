use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::{process_sse, text_fragments};
use crate::transport::{CompletionTransport, FragmentStream};
use crate::types::ChatCompletionRequest;

/// Default base URL of the completion service.
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/";
const CLIENT_TITLE: &str = "multichat";

/// Client for OpenAI-compatible `chat/completions` endpoints, OpenRouter by default.
///
/// The client holds no credential; the key is supplied per request so that
/// each model can authenticate with its own secret.
#[derive(Clone)]
pub struct OpenRouter {
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl OpenRouter {
    /// Create a new client for the default endpoint, with no request timeout.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// A base URL without a trailing slash is treated as a directory.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that observes every request and fragment.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn endpoint(&self) -> Result<Url> {
        Ok(self.base_url.join("chat/completions")?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            Error::configuration("API key contains characters not allowed in a header", None)
        })?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert("X-Title", HeaderValue::from_static(CLIENT_TITLE));
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<crate::types::ErrorObject>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = parsed
            .as_ref()
            .and_then(|e| e.error_type.clone().or_else(|| e.code_string()));
        let error_message = parsed
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(error_body);

        match status_code {
            400 => Error::bad_request(error_message),
            401 => Error::authentication(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500..=599 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message),
        }
    }

    /// Send a request and get a stream of its reply's text fragments.
    ///
    /// The returned stream yields non-empty fragments in arrival order and
    /// ends at `[DONE]`.  Errors in the middle of the stream are yielded as
    /// the final item.
    pub async fn stream(
        &self,
        api_key: &str,
        mut request: ChatCompletionRequest,
    ) -> Result<FragmentStream> {
        request.stream = true;
        let url = self.endpoint()?;
        let headers = Self::default_headers(api_key)?;

        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e));
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match response {
            Ok(response) => response,
            Err(e) => return Err(self.record_failure(e)),
        };
        if !response.status().is_success() {
            let e = Self::process_error_response(response).await;
            return Err(self.record_failure(e));
        }

        let fragments = text_fragments(process_sse(response.bytes_stream()));
        let logger = self.logger.clone();
        let fragments = fragments.inspect(move |item| {
            if let Some(logger) = &logger {
                match item {
                    Ok(fragment) => logger.log_fragment(fragment),
                    Err(e) => logger.log_error(e),
                }
            }
        });
        Ok(Box::pin(fragments))
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    fn record_failure(&self, e: Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if let Some(logger) = &self.logger {
            logger.log_error(&e);
        }
        e
    }
}

impl fmt::Debug for OpenRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouter")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl CompletionTransport for OpenRouter {
    async fn open_stream(
        &self,
        api_key: &str,
        request: ChatCompletionRequest,
    ) -> Result<FragmentStream> {
        self.stream(api_key, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response on a local port.
    ///
    /// Returns the base URL to point a client at and a handle yielding the
    /// raw request the server received.
    async fn serve_once(
        status: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut response = format!("HTTP/1.1 {status}\r\n");
        for (name, value) in headers {
            response.push_str(&format!("{name}: {value}\r\n"));
        }
        response.push_str(&format!(
            "content-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        ));
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}/v1/"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buffer);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buffer).unwrap()
    }

    async fn stream_from(base_url: String) -> Result<FragmentStream> {
        let client = OpenRouter::with_options(Some(base_url), None).unwrap();
        let model = crate::ModelCatalog::builtin().default_model().clone();
        let request = ChatCompletionRequest::for_turn(&model, "hello", None);
        client.stream("sk-local", request).await
    }

    fn expect_error(result: Result<FragmentStream>) -> Error {
        match result {
            Ok(_) => panic!("expected an error response"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = OpenRouter::new().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout(), None);
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );

        let client = OpenRouter::with_options(
            Some("http://localhost:8080/v1".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/v1/");
        assert_eq!(client.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn invalid_base_url() {
        let err = OpenRouter::with_options(Some("not a url".to_string()), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn headers_carry_bearer_token() {
        let headers = OpenRouter::default_headers("sk-or-test").unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer sk-or-test"
        );
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "text/event-stream");
    }

    #[test]
    fn header_unsafe_key_is_configuration_error() {
        let err = OpenRouter::default_headers("bad\nkey").unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_completion_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client =
            OpenRouter::with_options(Some("http://127.0.0.1:9/v1/".to_string()), None).unwrap();
        let model = crate::ModelCatalog::builtin().default_model().clone();
        let request = ChatCompletionRequest::for_turn(&model, "hello", None);
        let result = client.stream("sk-test", request).await;
        let err = match result {
            Ok(_) => panic!("expected connection failure"),
            Err(err) => err,
        };
        assert!(err.is_completion());
    }

    #[tokio::test]
    async fn streamed_body_yields_fragments() {
        let body = concat!(
            ": OPENROUTER PROCESSING\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\r\n\r\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let (base_url, server) =
            serve_once("200 OK", &[("content-type", "text/event-stream")], body).await;
        let mut stream = stream_from(base_url).await.unwrap();
        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["Hel", "lo"]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-local"));
        assert!(request.contains("\"stream\":true"));
        assert!(request.contains("allenai/molmo-2-8b:free"));
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_error() {
        let (base_url, _server) = serve_once(
            "401 Unauthorized",
            &[("content-type", "application/json")],
            r#"{"error":{"message":"No auth credentials found","code":401}}"#,
        )
        .await;
        let err = expect_error(stream_from(base_url).await);
        assert!(err.is_authentication());
        assert!(err.is_completion());
        assert!(err.to_string().contains("No auth credentials found"));
    }

    #[tokio::test]
    async fn too_many_requests_carries_retry_after() {
        let (base_url, _server) = serve_once(
            "429 Too Many Requests",
            &[("content-type", "application/json"), ("retry-after", "7")],
            r#"{"error":{"message":"Rate limit exceeded","code":429}}"#,
        )
        .await;
        let err = expect_error(stream_from(base_url).await);
        assert!(err.is_rate_limit());
        match err {
            Error::RateLimit {
                message,
                retry_after,
            } => {
                assert_eq!(retry_after, Some(7));
                assert_eq!(message, "Rate limit exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unavailable_is_service_unavailable() {
        let (base_url, _server) =
            serve_once("503 Service Unavailable", &[], "upstream overloaded").await;
        let err = expect_error(stream_from(base_url).await);
        match err {
            Error::ServiceUnavailable {
                message,
                retry_after,
            } => {
                assert_eq!(message, "upstream overloaded");
                assert_eq!(retry_after, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_request_and_other_statuses() {
        let (base_url, _server) = serve_once(
            "400 Bad Request",
            &[("content-type", "application/json")],
            r#"{"error":{"message":"model is required","code":400}}"#,
        )
        .await;
        let err = expect_error(stream_from(base_url).await);
        assert!(matches!(err, Error::BadRequest { ref message } if message == "model is required"));

        let (base_url, _server) = serve_once(
            "402 Payment Required",
            &[("content-type", "application/json")],
            r#"{"error":{"message":"Insufficient credits","code":402}}"#,
        )
        .await;
        let err = expect_error(stream_from(base_url).await);
        assert_eq!(err.status_code(), Some(402));
        assert!(err.to_string().contains("Insufficient credits"));
    }
}
