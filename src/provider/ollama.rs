//! Ollama HTTP backend.
//!
//! Talks to a local Ollama server:
//! - `POST /api/generate` for single and streamed replies
//! - `GET /api/tags` for the model list
//!
//! Streamed replies arrive as newline-delimited JSON objects. They are parsed
//! lazily from the HTTP body so that dropping the [`FragmentStream`] stops
//! reading from the connection.
//!
//! The request timeout bounds a whole single-shot request. For streams it
//! only bounds connecting and the gap between two chunks, so a long but
//! healthy generation is never cut off.

use crate::provider::traits::{FragmentStream, GenerationClient};
use crate::provider::types::{GenerateConfig, ModelDescriptor};
use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Generation client backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsReply {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

impl OllamaClient {
    /// Create a client for `base_url` using `model` when requests do not name one.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .read_timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            request_timeout,
        })
    }

    /// Base URL of the server, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, prompt: &str, config: &GenerateConfig, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": config.model_or(&self.model),
            "prompt": prompt,
            "stream": stream,
            "options": { "temperature": config.temperature },
        })
    }

    async fn post_generate(
        &self,
        prompt: &str,
        config: &GenerateConfig,
        stream: bool,
    ) -> Result<reqwest::Response> {
        config.validate()?;
        let url = format!("{}/api/generate", self.base_url);
        debug!(%url, model = config.model_or(&self.model), stream, "sending generate request");

        let mut request = self
            .client
            .post(&url)
            .json(&self.request_body(prompt, config, stream));
        if !stream {
            request = request.timeout(self.request_timeout);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error {}: {}", status, error_body);
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(&self, prompt: &str, config: &GenerateConfig) -> Result<String> {
        let response = self.post_generate(prompt, config, false).await?;
        let body = response
            .text()
            .await
            .context("Failed to read generate response body")?;

        let reply: GenerateReply =
            serde_json::from_str(&body).context("Invalid JSON in generate response")?;
        if let Some(error) = reply.error {
            anyhow::bail!("Ollama error: {}", error);
        }
        Ok(reply.response)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerateConfig,
    ) -> Result<FragmentStream> {
        let response = self.post_generate(prompt, config, true).await?;
        let bytes = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(ndjson_fragments(Box::pin(bytes)))
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.base_url))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error {}: {}", status, body);
        }
        parse_tags(&body)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> String {
        self.model.clone()
    }
}

/// Parse a `/api/tags` body into model descriptors.
pub fn parse_tags(body: &str) -> Result<Vec<ModelDescriptor>> {
    let reply: TagsReply = serde_json::from_str(body).context("Invalid JSON in model list")?;
    Ok(reply.models)
}

/// One decoded line of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLine {
    pub fragment: String,
    pub done: bool,
}

/// Decode one newline-delimited JSON line. Blank lines yield `None`.
pub fn parse_stream_line(line: &str) -> Result<Option<StreamLine>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let reply: GenerateReply =
        serde_json::from_str(line).with_context(|| format!("Invalid stream line: {}", line))?;
    if let Some(error) = reply.error {
        anyhow::bail!("Ollama error: {}", error);
    }

    Ok(Some(StreamLine {
        fragment: reply.response,
        done: reply.done,
    }))
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

struct NdjsonState {
    bytes: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl NdjsonState {
    fn push_line(&mut self, raw: &[u8]) {
        match parse_stream_line(&String::from_utf8_lossy(raw)) {
            Ok(Some(line)) => {
                if !line.fragment.is_empty() {
                    self.pending.push_back(Ok(line.fragment));
                }
                if line.done {
                    self.finished = true;
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }

    /// Move every complete line out of the buffer. Lines are split on raw
    /// bytes so a multi-byte character spanning two HTTP chunks stays intact.
    fn drain_lines(&mut self) {
        while !self.finished {
            let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&line);
        }
    }
}

/// Turn an NDJSON byte stream into a lazy fragment stream.
fn ndjson_fragments(bytes: ByteStream) -> FragmentStream {
    let state = NdjsonState {
        bytes,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(anyhow::anyhow!("Stream error: {}", e)), state));
                }
                None => {
                    // Last line may arrive without a trailing newline
                    let rest = std::mem::take(&mut state.buffer);
                    state.push_line(&rest);
                    state.finished = true;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn byte_stream(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, reqwest::Error>(c.as_bytes().to_vec())),
        ))
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[test]
    fn test_parse_stream_line() {
        let line = parse_stream_line(r#"{"model":"llama3","response":"Hel","done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.fragment, "Hel");
        assert!(!line.done);

        assert!(parse_stream_line("   ").unwrap().is_none());
        assert!(parse_stream_line(r#"{"error":"model not found"}"#).is_err());
        assert!(parse_stream_line("not json").is_err());
    }

    #[test]
    fn test_parse_tags() {
        let body = r#"{"models":[
            {"name":"llama3:latest","size":4661224676,"modified_at":"2024-05-01T10:00:00Z"},
            {"name":"codellama:7b"}
        ]}"#;
        let models = parse_tags(body).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3:latest");
        assert_eq!(models[0].size, Some(4661224676));
        assert_eq!(models[1], ModelDescriptor::named("codellama:7b"));

        assert!(parse_tags(r#"{}"#).unwrap().is_empty());
        assert!(parse_tags("<html>").is_err());
    }

    #[tokio::test]
    async fn test_fragments_split_across_chunks() {
        let stream = ndjson_fragments(byte_stream(vec![
            "{\"response\":\"Hel\",\"done\":false}\n{\"resp",
            "onse\":\"lo\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
        ]));

        let fragments: Vec<String> = collect(stream)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_stops_at_done_marker() {
        let stream = ndjson_fragments(byte_stream(vec![
            "{\"response\":\"a\",\"done\":false}\n{\"response\":\"b\",\"done\":true}\n",
            "{\"response\":\"ignored\",\"done\":false}\n",
        ]));

        let fragments: Vec<String> = collect(stream)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(fragments, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let stream = ndjson_fragments(byte_stream(vec!["{\"response\":\"tail\",\"done\":true}"]));
        let fragments = collect(stream).await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "tail");
    }

    #[tokio::test]
    async fn test_error_line_ends_stream() {
        let stream = ndjson_fragments(byte_stream(vec![
            "{\"response\":\"ok\",\"done\":false}\n",
            "{\"error\":\"out of memory\"}\n",
            "{\"response\":\"never\",\"done\":false}\n",
        ]));

        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        assert!(items[1]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("out of memory"));
    }

    #[tokio::test]
    async fn test_multibyte_character_across_chunks() {
        let line = "{\"response\":\"caf\u{e9}\",\"done\":true}\n".as_bytes().to_vec();
        let split = line.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let (first, second) = (line[..split].to_vec(), line[split..].to_vec());
        let bytes: ByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok::<_, reqwest::Error>(first),
            Ok(second),
        ]));

        let items = collect(ndjson_fragments(bytes)).await;
        assert_eq!(items[0].as_ref().unwrap(), "caf\u{e9}");
    }

    #[test]
    fn test_request_body_uses_default_model() {
        let client =
            OllamaClient::new("http://localhost:11434/", "llama3", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");

        let body = client.request_body("hi", &GenerateConfig::new(), true);
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], true);

        let body = client.request_body("hi", &GenerateConfig::new().with_model("phi3"), false);
        assert_eq!(body["model"], "phi3");
        assert_eq!(body["prompt"], "hi");
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            received.extend_from_slice(&buf[..n]);
            if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&received[..pos]).to_ascii_lowercase();
                let length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if received.len() >= pos + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serve one chunked NDJSON reply, sleeping before each line.
    async fn serve_ndjson(lines: Vec<(Duration, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\n\
                        content-type: application/x-ndjson\r\n\
                        transfer-encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for (delay, line) in lines {
                tokio::time::sleep(delay).await;
                let chunk = format!("{:x}\r\n{}\r\n", line.len(), line);
                if socket.write_all(chunk.as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        format!("http://{}", addr)
    }

    fn fragment_line(text: &str, done: bool) -> String {
        format!("{{\"response\":\"{}\",\"done\":{}}}\n", text, done)
    }

    #[tokio::test]
    async fn test_slow_stream_outlives_request_timeout() {
        let gap = Duration::from_millis(150);
        let mut lines: Vec<(Duration, String)> = (0..6)
            .map(|i| (gap, fragment_line(&format!("f{} ", i), false)))
            .collect();
        lines.push((gap, fragment_line("", true)));
        let base_url = serve_ndjson(lines).await;

        // Whole stream takes about a second, each gap stays under the timeout
        let client = OllamaClient::new(base_url, "llama3", Duration::from_millis(400)).unwrap();
        let stream = client
            .generate_stream("hi", &GenerateConfig::new())
            .await
            .unwrap();

        let items = collect(stream).await;
        assert_eq!(items.len(), 6);
        let text: String = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, "f0 f1 f2 f3 f4 f5 ");
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let base_url = serve_ndjson(vec![
            (Duration::ZERO, fragment_line("first", false)),
            (Duration::from_secs(5), fragment_line("late", true)),
        ])
        .await;

        let client = OllamaClient::new(base_url, "llama3", Duration::from_millis(300)).unwrap();
        let stream = client
            .generate_stream("hi", &GenerateConfig::new())
            .await
            .unwrap();

        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "first");
        assert!(items[1].is_err());
    }
}
