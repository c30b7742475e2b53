use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio_util::io::StreamReader;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::event_stream;
use crate::memory::ContextWindow;
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_BYTES, STREAM_ERRORS,
    STREAM_FRAGMENTS,
};
use crate::prompt::render_prompt;
use crate::sigv4::{BEDROCK_SERVICE, RequestSigner};
use crate::types::{DEFAULT_MAX_TOKENS_TO_SAMPLE, Model, TextCompletion, TextCompletionParams};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";

const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

/// Ordered text fragments of a streamed response.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A model that completes a conversation window.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Returns the whole response for the window.
    async fn complete(&self, window: &ContextWindow<'_>) -> Result<String>;

    /// Returns the response for the window as a stream of fragments.
    ///
    /// Concatenating every fragment yields the whole response.
    async fn complete_streaming(&self, window: &ContextWindow<'_>) -> Result<FragmentStream>;
}

/// The public Bedrock runtime endpoint for a region.
pub fn default_endpoint(region: &str) -> String {
    format!("https://bedrock-runtime.{region}.amazonaws.com")
}

/// Client for Claude text-completion models on Amazon Bedrock.
#[derive(Clone)]
pub struct Bedrock {
    client: ReqwestClient,
    signer: RequestSigner,
    endpoint: Url,
    model: Model,
    max_tokens: u32,
    temperature: Option<f32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    timeout: Option<Duration>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Bedrock {
    /// Create a client for the public endpoint of `region`.
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Result<Self> {
        Self::with_options(credentials, region, None, None)
    }

    /// Create a client with custom settings.
    ///
    /// `endpoint` replaces the regional endpoint (a VPC endpoint or a test
    /// server); requests are still signed for `region`.  Without a `timeout`
    /// the transport default applies.
    pub fn with_options(
        credentials: Credentials,
        region: impl Into<String>,
        endpoint: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let region = region.into();
        let endpoint = endpoint.unwrap_or_else(|| default_endpoint(&region));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::url(format!("Invalid endpoint {endpoint}: {e}"), Some(e)))?;

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
            signer: RequestSigner::new(credentials, region, BEDROCK_SERVICE),
            endpoint,
            model: Model::default(),
            max_tokens: DEFAULT_MAX_TOKENS_TO_SAMPLE,
            temperature: None,
            top_p: None,
            top_k: None,
            timeout,
            logger: None,
        })
    }

    /// Set the model to invoke.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the cap on generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the nucleus sampling cutoff.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Set the top-k cutoff.
    pub fn with_top_k(mut self, top_k: Option<u32>) -> Self {
        self.top_k = top_k;
        self
    }

    /// Install a logger that sees every request, response and chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The model this client invokes.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The region requests are signed for.
    pub fn region(&self) -> &str {
        self.signer.region()
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The request body for a window.
    pub fn params(&self, window: &ContextWindow<'_>) -> TextCompletionParams {
        TextCompletionParams::new(render_prompt(window))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_top_p(self.top_p)
            .with_top_k(self.top_k)
    }

    /// URL of a model action, e.g. `invoke`.  The model id is percent-encoded
    /// so that ids containing `:` survive.
    pub fn model_url(&self, action: &str) -> Url {
        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        let model = crate::sigv4::uri_encode(&self.model.to_string(), true);
        url.set_path(&format!("{base}/model/{model}/{action}"));
        url
    }

    fn log_request(&self, params: &TextCompletionParams) {
        if let Some(logger) = &self.logger {
            logger.log_request(&self.model.to_string(), params);
        }
    }

    /// Sign and send a POST, converting non-success statuses into errors.
    async fn post(&self, url: Url, body: Vec<u8>, accept: &'static str) -> Result<Response> {
        let signed = self.signer.sign(
            "POST",
            &url,
            &[("content-type", "application/json")],
            &body,
            OffsetDateTime::now_utc(),
        )?;

        let mut request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, accept)
            .header("x-amz-date", signed.amz_date)
            .header(header::AUTHORIZATION, signed.authorization);
        if let Some(token) = signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        CLIENT_REQUESTS.click();
        let response = request.body(body).send().await.map_err(|e| {
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
        });
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(err);
            }
        };

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Convert an error response into our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-amzn-RequestId")
            .and_then(|val| val.to_str().ok())
            .map(String::from);
        let header_type = response
            .headers()
            .get("x-amzn-ErrorType")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        #[derive(Deserialize)]
        struct ErrorResponse {
            #[serde(alias = "Message")]
            message: Option<String>,
            #[serde(rename = "__type")]
            error_type: Option<String>,
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

        let parsed = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let body_type = parsed.as_ref().and_then(|e| e.error_type.clone());
        let message = parsed
            .and_then(|e| e.message)
            .unwrap_or_else(|| error_body.clone());
        let error_type = header_type.or(body_type);
        Error::from_aws(status_code, error_type.as_deref(), message, request_id)
    }
}

impl fmt::Debug for Bedrock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bedrock")
            .field("signer", &self.signer)
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[async_trait]
impl ModelClient for Bedrock {
    async fn complete(&self, window: &ContextWindow<'_>) -> Result<String> {
        let params = self.params(window);
        self.log_request(&params);
        let body = serde_json::to_vec(&params)?;
        let start = Instant::now();

        let response = self
            .post(self.model_url("invoke"), body, "application/json")
            .await?;
        let completion = response.json::<TextCompletion>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if let Some(logger) = &self.logger {
            logger.log_response(&completion);
        }
        Ok(completion.completion)
    }

    async fn complete_streaming(&self, window: &ContextWindow<'_>) -> Result<FragmentStream> {
        let params = self.params(window);
        self.log_request(&params);
        let body = serde_json::to_vec(&params)?;
        let start = Instant::now();

        let response = self
            .post(
                self.model_url("invoke-with-response-stream"),
                body,
                EVENT_STREAM_CONTENT_TYPE,
            )
            .await?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let bytes = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other)),
        );
        let logger = self.logger.clone();
        let fragments = event_stream::completion_chunks(StreamReader::new(bytes)).map(
            move |chunk| match chunk {
                Ok(chunk) => {
                    STREAM_FRAGMENTS.click();
                    STREAM_BYTES.count(chunk.completion.len() as u64);
                    if let Some(logger) = &logger {
                        logger.log_stream_chunk(&chunk);
                    }
                    Ok(chunk.completion)
                }
                Err(err) => {
                    STREAM_ERRORS.click();
                    Err(err)
                }
            },
        );
        Ok(Box::pin(fragments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SessionMemory;
    use crate::types::{ChatTurn, KnownModel};

    fn client() -> Bedrock {
        Bedrock::new(Credentials::new("AKIDEXAMPLE", "secret", None), "us-east-1").unwrap()
    }

    #[test]
    fn default_endpoint_follows_region() {
        let client = client();
        assert_eq!(
            client.endpoint().as_str(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/"
        );
        assert_eq!(client.region(), "us-east-1");
        assert_eq!(client.model(), &Model::Known(KnownModel::ClaudeV2));
    }

    #[test]
    fn model_url_encodes_model_id() {
        let client = client().with_model(KnownModel::ClaudeV21);
        assert_eq!(
            client.model_url("invoke").as_str(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-v2%3A1/invoke"
        );
    }

    #[test]
    fn model_url_keeps_endpoint_path_prefix() {
        let client = Bedrock::with_options(
            Credentials::default(),
            DEFAULT_REGION,
            Some("http://localhost:9000/proxy/".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(
            client.model_url("invoke-with-response-stream").as_str(),
            "http://localhost:9000/proxy/model/anthropic.claude-v2/invoke-with-response-stream"
        );
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let err = Bedrock::with_options(
            Credentials::default(),
            DEFAULT_REGION,
            Some("not a url".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn params_render_the_window() {
        let client = client()
            .with_max_tokens(300)
            .with_temperature(Some(0.5))
            .with_top_p(Some(0.9))
            .with_top_k(Some(50));
        let mut memory = SessionMemory::new("sys");
        memory.append(ChatTurn::human("Hello"));
        let params = client.params(&memory.window(4));
        assert_eq!(params.prompt, "sys\n\nHuman: Hello\n\nAssistant:");
        assert_eq!(params.max_tokens_to_sample, 300);
        assert_eq!(params.temperature, Some(0.5));
        assert_eq!(params.top_p, Some(0.9));
        assert_eq!(params.top_k, Some(50));
        assert_eq!(params.stop_sequences, vec!["\n\nHuman:".to_string()]);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_sending() {
        let client = Bedrock::with_options(
            Credentials::default(),
            DEFAULT_REGION,
            Some("http://127.0.0.1:9".to_string()),
            None,
        )
        .unwrap();
        let memory = SessionMemory::new("sys");
        let err = client.complete(&memory.window(4)).await.unwrap_err();
        assert!(err.is_authentication());
    }
}
