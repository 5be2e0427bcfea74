use std::env;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::chat_stream::{ChatStream, EventStream};
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_DURATION,
    STREAM_ERRORS, STREAM_TTFB,
};
use crate::sse::{cancelled, decode_stream};
use crate::types::{
    ChatRequest, ChatResponse, CompletionRequest, CompletionResponse, EditRequest, EditResponse,
};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable holding the bearer token.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Endpoint of chat completions, relative to the base URL.
pub const CHAT_ENDPOINT: &str = "chat/completions";
/// Endpoint of legacy text completions, relative to the base URL.
pub const COMPLETIONS_ENDPOINT: &str = "completions";
/// Endpoint of edits, relative to the base URL.
pub const EDITS_ENDPOINT: &str = "edits";

const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";
const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Client for OpenAI-compatible APIs.
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAi")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl OpenAi {
    /// Create a new client.
    ///
    /// The API key can be provided directly or read from the OPENAI_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// Without an explicit `base_url` the OPENAI_BASE_URL environment
    /// variable is consulted before falling back to the public API.  The
    /// timeout bounds connecting and every buffered request; streams are only
    /// bounded by the connect timeout.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::authentication(format!(
                    "API key not provided and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }

        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::request_construction(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Install a logger that observes every request made through this client.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The base URL endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The timeout applied to buffered requests.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self, accept: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
            Error::request_construction("API key is not a valid header value", Some(Box::new(e)))
        })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        Ok(headers)
    }

    /// Serialize `body` and POST it, racing the call against `cancel`.
    async fn post<Req: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &Req,
        accept: &'static str,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let body = serde_json::to_vec(body).map_err(|e| {
            Error::request_construction(
                format!("failed to serialize the request: {e}"),
                Some(Box::new(e)),
            )
        })?;
        if let Some(logger) = &self.logger {
            logger.log_request(url.as_str(), &body);
        }

        let mut builder = self
            .client
            .post(url.clone())
            .headers(self.default_headers(accept)?)
            .body(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            response = builder.send() => response,
        };
        response.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {e}"),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::transport(format!("Connection error: {e}"), Some(Box::new(e)))
            } else {
                Error::from(e)
            }
        })
    }

    /// Read a whole response body, racing the read against `cancel`.
    async fn read_body(response: Response, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            body = response.bytes() => body,
        };
        body.map(|bytes| bytes.to_vec()).map_err(|e| {
            if e.is_timeout() {
                Error::timeout(format!("Request timed out: {e}"), None)
            } else {
                Error::transport(
                    format!("failed to read the response body: {e}"),
                    Some(Box::new(e)),
                )
            }
        })
    }

    /// Convert a non-2xx response into [`Error::UnexpectedStatus`].
    async fn unexpected_status(
        &self,
        url: &Url,
        response: Response,
        cancel: &CancellationToken,
    ) -> Error {
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);
        match Self::read_body(response, cancel).await {
            Ok(body) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(url.as_str(), status, &body);
                }
                Error::unexpected_status(status, String::from_utf8_lossy(&body), request_id)
            }
            Err(err) => err,
        }
    }

    /// POST `body` to `endpoint` and decode the fully buffered JSON response.
    ///
    /// This is the one buffered call every endpoint goes through.  Non-2xx
    /// statuses become [`Error::UnexpectedStatus`] carrying the raw body;
    /// bodies that are not valid `Resp` become [`Error::Decode`].
    pub async fn request<Req, Resp>(
        &self,
        endpoint: &str,
        body: &Req,
        cancel: &CancellationToken,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let url = self.endpoint_url(endpoint)?;
        let result = self.request_inner(&url, body, cancel).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            if let Some(logger) = &self.logger {
                logger.log_error(url.as_str(), err);
            }
        }
        result
    }

    async fn request_inner<Req, Resp>(
        &self,
        url: &Url,
        body: &Req,
        cancel: &CancellationToken,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .post(url, body, "application/json", Some(self.timeout), cancel)
            .await?;
        if !response.status().is_success() {
            return Err(self.unexpected_status(url, response, cancel).await);
        }
        let status = response.status().as_u16();
        let data = Self::read_body(response, cancel).await?;
        if let Some(logger) = &self.logger {
            logger.log_response(url.as_str(), status, &data);
        }
        serde_json::from_slice(&data).map_err(|e| {
            Error::decode(
                format!("failed to parse {} response: {e}", url.path()),
                Some(Box::new(e)),
            )
        })
    }

    /// POST `body` to `endpoint` and decode its event stream onto `out`.
    ///
    /// Returns once the stream ends: `Ok(())` after the `[DONE]` sentinel,
    /// otherwise the first error encountered.  The connection is released on
    /// return.  Callers usually run this on its own task; see
    /// [`OpenAi::chat`].
    pub async fn stream_request<Req, Resp>(
        &self,
        endpoint: &str,
        body: &Req,
        out: &mpsc::Sender<Resp>,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let url = self.endpoint_url(endpoint)?;
        let result = self.stream_inner(&url, body, out, cancel, start).await;
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            STREAM_ERRORS.click();
            if let Some(logger) = &self.logger {
                logger.log_error(url.as_str(), err);
            }
        }
        result
    }

    async fn stream_inner<Req, Resp>(
        &self,
        url: &Url,
        body: &Req,
        out: &mpsc::Sender<Resp>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<()>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .post(url, body, ACCEPT_EVENT_STREAM, None, cancel)
            .await?;
        STREAM_TTFB.add(start.elapsed().as_secs_f64());
        if !response.status().is_success() {
            return Err(self.unexpected_status(url, response, cancel).await);
        }

        let body = StreamReader::new(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(io::Error::other)),
        ));
        let logger = self.logger.as_deref();
        decode_stream(body, out, cancel, |frame| {
            if let Some(logger) = logger {
                logger.log_stream_frame(url.as_str(), frame);
            }
        })
        .await
    }

    /// Run one request on a background task and report through two channels.
    ///
    /// With `stream` set the events of the stream are relayed as they are
    /// decoded; otherwise the single buffered response is sent.  The message
    /// channel is closed before the outcome is sent.
    fn spawn_request<Req, Resp>(
        &self,
        endpoint: &'static str,
        body: Req,
        stream: bool,
        cancel: CancellationToken,
    ) -> EventStream<Resp>
    where
        Req: Serialize + Send + Sync + 'static,
        Resp: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();
        let client = self.clone();
        tokio::spawn(async move {
            let outcome = if stream {
                client.stream_request(endpoint, &body, &tx, &cancel).await
            } else {
                match client.request::<Req, Resp>(endpoint, &body, &cancel).await {
                    Ok(response) => tx
                        .send(response)
                        .await
                        .map_err(|_| Error::abort("response receiver dropped")),
                    Err(err) => Err(err),
                }
            };
            drop(tx);
            let _ = done_tx.send(outcome);
        });
        EventStream::new(rx, done_rx)
    }

    /// Start a chat completion and return immediately.
    ///
    /// `request.stream` picks the mode once, up front:
    ///
    /// - `false`: one buffered call; on success exactly one response arrives
    ///   on the message channel.
    /// - `true`: every streamed chunk arrives on the message channel in the
    ///   order the server sent it.
    ///
    /// Either way the outcome channel receives exactly one value after the
    /// message channel closes.  Cancelling `cancel` aborts the HTTP call and
    /// yields a cancellation error as the outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn chat(&self, request: ChatRequest, cancel: CancellationToken) -> ChatStream {
        let stream = request.stream;
        self.spawn_request(CHAT_ENDPOINT, request, stream, cancel)
    }

    /// Send a chat completion and wait for the whole response.
    pub async fn chat_once(
        &self,
        mut request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        request.stream = false;
        self.request(CHAT_ENDPOINT, &request, cancel).await
    }

    /// Complete a prompt and wait for the whole response.
    pub async fn completion(
        &self,
        mut request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse> {
        request.stream = false;
        self.request(COMPLETIONS_ENDPOINT, &request, cancel).await
    }

    /// Complete a prompt, streaming the completion as it is generated.
    pub fn completion_stream(
        &self,
        mut request: CompletionRequest,
        cancel: CancellationToken,
    ) -> EventStream<CompletionResponse> {
        request.stream = true;
        self.spawn_request(COMPLETIONS_ENDPOINT, request, true, cancel)
    }

    /// Edit the input text according to the instruction.
    pub async fn edit(
        &self,
        request: EditRequest,
        cancel: &CancellationToken,
    ) -> Result<EditResponse> {
        self.request(EDITS_ENDPOINT, &request, cancel).await
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::request_construction(
            format!("base URL cannot be a base: {base_url}"),
            None,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::{ChatMessage, KnownModel};

    #[derive(Default)]
    struct RecordingLogger {
        entries: Mutex<Vec<String>>,
    }

    impl ClientLogger for RecordingLogger {
        fn log_request(&self, _url: &str, _body: &[u8]) {
            self.entries.lock().unwrap().push("request".to_string());
        }

        fn log_response(&self, _url: &str, status: u16, _body: &[u8]) {
            self.entries.lock().unwrap().push(format!("response {status}"));
        }

        fn log_stream_frame(&self, _url: &str, payload: &[u8]) {
            let payload = String::from_utf8_lossy(payload).to_string();
            self.entries.lock().unwrap().push(format!("frame {payload}"));
        }

        fn log_error(&self, _url: &str, error: &Error) {
            self.entries.lock().unwrap().push(format!("error {}", error.status_code().unwrap_or(0)));
        }
    }

    fn client_for(server: &MockServer) -> OpenAi {
        OpenAi::with_options(
            Some("test-key".to_string()),
            Some(format!("{}/v1", server.uri())),
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    fn chat_request() -> ChatRequest {
        ChatRequest::new(
            KnownModel::Gpt35Turbo0301,
            vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user("What can you do?"),
            ],
        )
    }

    #[test]
    fn client_creation() {
        let client = OpenAi::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = OpenAi::with_options(
            Some("test-key".to_string()),
            Some("https://llm.example.com/openai/v1".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://llm.example.com/openai/v1/");
        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert_eq!(
            client.endpoint_url(CHAT_ENDPOINT).unwrap().as_str(),
            "https://llm.example.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn debug_redacts_key() {
        let client = OpenAi::new(Some("sk-secret".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn rejects_bad_configuration() {
        let err = OpenAi::new(Some("  ".to_string())).unwrap_err();
        assert!(err.is_authentication());

        let err = OpenAi::with_options(Some("k".to_string()), Some("not a url".to_string()), None)
            .unwrap_err();
        assert!(err.is_request_construction());

        let err = OpenAi::with_options(Some("k".to_string()), Some("mailto:x@y.z".to_string()), None)
            .unwrap_err();
        assert!(err.is_request_construction());
    }

    #[tokio::test]
    async fn request_sends_headers_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json; charset=UTF-8"))
            .and(body_json(json!({
                "model": "gpt-3.5-turbo-0301",
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "What can you do?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1677652288,
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Many things."},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response: ChatResponse = client
            .request(CHAT_ENDPOINT, &chat_request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.text(), "Many things.");
    }

    #[tokio::test]
    async fn request_non_2xx_is_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("x-request-id", "req_42")
                    .set_body_string(r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#),
            )
            .mount(&server)
            .await;

        let logger = Arc::new(RecordingLogger::default());
        let client = client_for(&server).with_logger(logger.clone());
        let err = client
            .request::<_, ChatResponse>(CHAT_ENDPOINT, &chat_request(), &CancellationToken::new())
            .await
            .unwrap_err();
        match &err {
            Error::UnexpectedStatus {
                status_code,
                body,
                request_id,
                ..
            } => {
                assert_eq!(*status_code, 429);
                assert!(body.contains("Rate limit reached"));
                assert_eq!(request_id.as_deref(), Some("req_42"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_rate_limit());
        assert_eq!(
            *logger.entries.lock().unwrap(),
            vec!["request", "response 429", "error 429"]
        );
    }

    #[tokio::test]
    async fn request_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .request::<_, ChatResponse>(CHAT_ENDPOINT, &chat_request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn request_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = OpenAi::with_options(
            Some("test-key".to_string()),
            Some(format!("http://{addr}/v1")),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let err = client
            .request::<_, ChatResponse>(CHAT_ENDPOINT, &chat_request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_unexpected_status());
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;
        let client = OpenAi::with_options(
            Some("test-key".to_string()),
            Some(server.uri()),
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        let err = client
            .request::<_, ChatResponse>(CHAT_ENDPOINT, &chat_request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn request_cancelled_while_waiting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            client.request::<_, ChatResponse>(CHAT_ENDPOINT, &chat_request(), &cancel),
        )
        .await
        .expect("request did not observe cancellation")
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn stream_request_logs_frames() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(header("accept", "text/event-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "data: {\"choices\":[{\"text\":\"Hi\",\"index\":0}]}\n\ndata: [DONE]\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let logger = Arc::new(RecordingLogger::default());
        let client = client_for(&server).with_logger(logger.clone());
        let events = client
            .completion_stream(
                CompletionRequest::new(KnownModel::TextDavinci003, "Say hi"),
                CancellationToken::new(),
            )
            .collect()
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].choices[0].text, "Hi");
        assert_eq!(
            *logger.entries.lock().unwrap(),
            vec![
                "request".to_string(),
                "frame {\"choices\":[{\"text\":\"Hi\",\"index\":0}]}".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn stream_request_non_2xx_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (tx, mut rx) = mpsc::channel::<ChatResponse>(1);
        let err = client
            .stream_request(
                CHAT_ENDPOINT,
                &chat_request().with_stream(true),
                &tx,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        drop(tx);
        assert!(err.is_authentication());
        assert_eq!(err.status_code(), Some(401));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn completion_and_edit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cmpl-1",
                "object": "text_completion",
                "created": 1589478378,
                "model": "text-davinci-003",
                "choices": [{"text": "This is a test", "index": 0, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/edits"))
            .and(body_json(json!({
                "model": "text-davinci-edit-001",
                "input": "What day of the wek is it?",
                "instruction": "Fix the spelling mistakes",
                "temperature": 0.5,
                "n": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "edit",
                "created": 1589478378,
                "choices": [{"text": "What day of the week is it?", "index": 0}],
                "usage": {"prompt_tokens": 25, "completion_tokens": 32, "total_tokens": 57}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let completion = client
            .completion(
                CompletionRequest::new(KnownModel::TextDavinci003, "Say this is a test"),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(completion.choices[0].text, "This is a test");

        let edit = client
            .edit(
                EditRequest::new(
                    KnownModel::TextDavinciEdit001,
                    "What day of the wek is it?",
                    "Fix the spelling mistakes",
                )
                .with_temperature(0.5)
                .with_n(1),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(edit.texts(), vec!["What day of the week is it?"]);
    }
}
