use std::time::Duration;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, Response};
use serde::Serialize;
use serde_json::Value;

use crate::config::ChatGptConfig;
use crate::error::ChatGptError;
use crate::headers::build_headers;
use crate::url::resolve_base_url;

/// Thin HTTP layer over one `reqwest::Client`.
///
/// Owns the resolved base URL, the fixed header set, and the default
/// deadline. Everything above it speaks endpoint paths and JSON bodies.
#[derive(Debug)]
pub struct Transport {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl Transport {
    pub fn new(config: &ChatGptConfig) -> Result<Self, ChatGptError> {
        let headers = header_map(config)?;
        let mut builder = Client::builder().default_headers(headers);
        if let Some(proxy_url) = config.proxy_url.as_deref() {
            builder = builder.proxy(Proxy::all(proxy_url).map_err(ChatGptError::from)?);
        }
        let http = builder.build().map_err(ChatGptError::from)?;

        let puid_present = config
            .puid
            .as_deref()
            .is_some_and(|puid| !puid.trim().is_empty());
        Ok(Self {
            http,
            base_url: resolve_base_url(config.base_url.as_deref(), puid_present),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Open a streaming POST and return its body as a lazy line sequence.
    ///
    /// The connection stays open until the sequence is exhausted or dropped;
    /// dropping it early releases the connection. The deadline covers the
    /// whole exchange, streamed body included, and surfaces as
    /// [`ChatGptError::Timeout`].
    pub async fn post_stream<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<impl Stream<Item = Result<String, ChatGptError>> + 'static, ChatGptError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .timeout(timeout.unwrap_or(self.timeout))
            .json(body)
            .send()
            .await
            .map_err(ChatGptError::from)?;
        let response = check_status(response).await?;

        Ok(lines(response))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ChatGptError> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, ChatGptError> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: Value) -> Result<Value, ChatGptError> {
        self.request_json(Method::PATCH, path, Some(body)).await
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ChatGptError> {
        let mut request = self
            .http
            .request(method, self.endpoint(path))
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(ChatGptError::from)?;
        let response = check_status(response).await?;
        let text = response.text().await.map_err(ChatGptError::from)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(ChatGptError::from)
    }
}

async fn check_status(response: Response) -> Result<Response, ChatGptError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(ChatGptError::Transport { status, body })
}

fn lines(response: Response) -> impl Stream<Item = Result<String, ChatGptError>> {
    try_stream! {
        let mut bytes = response.bytes_stream();
        let mut buffer = LineBuffer::default();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(ChatGptError::from)?;
            for line in buffer.feed(&chunk) {
                yield line;
            }
        }
        if let Some(rest) = buffer.flush() {
            yield rest;
        }
    }
}

/// Reassembles text lines from arbitrarily chunked response bytes.
#[derive(Debug, Default)]
struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    /// Feed a chunk and drain every line completed by it.
    fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut lines = Vec::new();

        while let Some(split) = self.buffer.find('\n') {
            let line = self.buffer[..split].trim_end_matches('\r').to_string();
            self.buffer.drain(0..=split);
            lines.push(line);
        }

        lines
    }

    /// Drain a trailing unterminated line, if any.
    fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        let rest = self.buffer.trim_end_matches('\r').to_string();
        self.buffer.clear();
        Some(rest)
    }
}

fn header_map(config: &ChatGptConfig) -> Result<HeaderMap, ChatGptError> {
    let mut out = HeaderMap::new();
    for (key, value) in build_headers(config)? {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ChatGptError::InvalidConfig(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(&value).map_err(|_| {
                ChatGptError::InvalidConfig(format!("invalid header value for {key}"))
            })?,
        );
    }
    Ok(out)
}
