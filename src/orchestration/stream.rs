//! Stream session controller with cooperative, fragment-granular cancellation.
//!
//! At most one session is active per controller. The guard is an owned
//! `tokio::sync::Mutex` permit held by the [`StreamSession`]; it is released
//! when the session is finished or dropped, which also resets the controller
//! to [`StreamState::Idle`].
//!
//! The cancellation token is published before the upstream is opened, so
//! [`StreamSessionController::cancel`] also aborts a session that is still
//! waiting for its first byte.

use super::error::{AgentError, AgentResult};
use crate::config::Configuration;
use crate::observability::Logger;
use crate::provider::{FragmentStream, GenerateConfig, GenerationClient};
use futures_util::{stream, StreamExt};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    Cancelled,
    /// Upstream produced an error mid-stream.
    Failed,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Streaming => "streaming",
            StreamState::Completed => "completed",
            StreamState::Cancelled => "cancelled",
            StreamState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Cancelled | StreamState::Failed
        )
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancels one session from any task or thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    /// Request cancellation; observed at the next fragment boundary.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// What a finished session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub state: StreamState,
    pub text: String,
    pub fragments: usize,
}

#[derive(Debug)]
struct Shared {
    state: StreamState,
    token: Option<CancellationToken>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared state of a session whose upstream is still opening. Dropped
/// without [`Opening::keep`], it rolls the controller back to idle.
struct Opening<'a> {
    shared: &'a Mutex<Shared>,
    armed: bool,
}

impl<'a> Opening<'a> {
    fn publish(shared: &'a Mutex<Shared>, token: CancellationToken) -> Self {
        {
            let mut guard = lock(shared);
            guard.state = StreamState::Streaming;
            guard.token = Some(token);
        }
        Self {
            shared,
            armed: true,
        }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for Opening<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut shared = lock(self.shared);
            shared.state = StreamState::Idle;
            shared.token = None;
        }
    }
}

/// Owns the single active generation and hands out [`StreamSession`]s.
pub struct StreamSessionController {
    client: Arc<dyn GenerationClient>,
    generate_config: GenerateConfig,
    finalization_marker: String,
    logger: Option<Arc<Logger>>,
    guard: Arc<AsyncMutex<()>>,
    shared: Arc<Mutex<Shared>>,
}

impl StreamSessionController {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            generate_config: GenerateConfig::new().with_streaming(true),
            finalization_marker: "\n".to_string(),
            logger: None,
            guard: Arc::new(AsyncMutex::new(())),
            shared: Arc::new(Mutex::new(Shared {
                state: StreamState::Idle,
                token: None,
            })),
        }
    }

    /// Build a controller from the `[llm]` and `[stream]` sections.
    pub fn from_config(client: Arc<dyn GenerationClient>, config: &Configuration) -> Self {
        Self::new(client)
            .with_generate_config(
                GenerateConfig::new()
                    .with_temperature(config.llm.temperature)
                    .with_streaming(config.llm.enable_streaming),
            )
            .with_finalization_marker(config.stream.finalization_marker.clone())
    }

    /// With `enable_streaming` off the whole reply is fetched in one request
    /// and delivered as a single fragment.
    pub fn with_generate_config(mut self, config: GenerateConfig) -> Self {
        self.generate_config = config;
        self
    }

    /// Text emitted once on normal completion; empty disables it.
    pub fn with_finalization_marker(mut self, marker: impl Into<String>) -> Self {
        self.finalization_marker = marker.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn set_model(&mut self, model: Option<String>) {
        self.generate_config.model = model;
    }

    pub fn client(&self) -> &Arc<dyn GenerationClient> {
        &self.client
    }

    pub fn state(&self) -> StreamState {
        lock(&self.shared).state
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared).token.is_some()
    }

    /// Start streaming `prompt`.
    ///
    /// Fails with [`AgentError::SessionBusy`] while another session from this
    /// controller is still alive, and with [`AgentError::Cancelled`] when
    /// cancelled before the upstream opened.
    pub async fn begin(&self, prompt: &str) -> AgentResult<StreamSession> {
        let permit = self
            .guard
            .clone()
            .try_lock_owned()
            .map_err(|_| AgentError::SessionBusy)?;

        let token = CancellationToken::new();
        let opening = Opening::publish(&self.shared, token.clone());

        let upstream = tokio::select! {
            _ = token.cancelled() => {
                debug!("stream session cancelled while opening");
                return Err(AgentError::Cancelled);
            }
            opened = self.open(prompt) => opened?,
        };
        opening.keep();
        debug!(chars = prompt.chars().count(), "stream session started");

        Ok(StreamSession {
            upstream: Some(upstream),
            token,
            text: String::new(),
            fragments: 0,
            state: StreamState::Streaming,
            finalization_marker: self.finalization_marker.clone(),
            logger: self.logger.clone(),
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    async fn open(&self, prompt: &str) -> AgentResult<FragmentStream> {
        if self.generate_config.enable_streaming {
            return self
                .client
                .generate_stream(prompt, &self.generate_config)
                .await
                .map_err(AgentError::client);
        }

        let reply = self
            .client
            .generate(prompt, &self.generate_config)
            .await
            .map_err(AgentError::client)?;
        let fragment = (!reply.is_empty()).then(|| Ok::<_, anyhow::Error>(reply));
        Ok(Box::pin(stream::iter(fragment)))
    }

    /// Cancel the active session, if any. Returns whether one was active.
    pub fn cancel(&self) -> bool {
        match &lock(&self.shared).token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// One in-progress generation.
pub struct StreamSession {
    upstream: Option<FragmentStream>,
    token: CancellationToken,
    text: String,
    fragments: usize,
    state: StreamState,
    finalization_marker: String,
    logger: Option<Arc<Logger>>,
    shared: Arc<Mutex<Shared>>,
    _permit: OwnedMutexGuard<()>,
}

impl StreamSession {
    /// Pull the next fragment.
    ///
    /// The cancellation flag is checked before anything is requested from
    /// upstream. Returns `None` once the session reached a terminal state.
    pub async fn next_fragment(&mut self) -> Option<AgentResult<String>> {
        if self.state.is_terminal() {
            return None;
        }

        if self.token.is_cancelled() {
            self.terminate(StreamState::Cancelled);
            return None;
        }

        let upstream = self.upstream.as_mut()?;
        match upstream.next().await {
            Some(Ok(fragment)) => {
                self.text.push_str(&fragment);
                self.fragments += 1;
                Some(Ok(fragment))
            }
            Some(Err(e)) => {
                self.terminate(StreamState::Failed);
                Some(Err(AgentError::client(e)))
            }
            None => {
                self.terminate(StreamState::Completed);
                if self.finalization_marker.is_empty() {
                    None
                } else {
                    self.text.push_str(&self.finalization_marker);
                    Some(Ok(self.finalization_marker.clone()))
                }
            }
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.token.clone())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Text delivered so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of upstream fragments delivered (the marker is not counted).
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// End the session and release the controller.
    ///
    /// A session still streaming is treated as cancelled.
    pub fn finish(mut self) -> StreamSummary {
        if !self.state.is_terminal() {
            self.terminate(StreamState::Cancelled);
        }
        StreamSummary {
            state: self.state,
            text: std::mem::take(&mut self.text),
            fragments: self.fragments,
        }
    }

    fn terminate(&mut self, state: StreamState) {
        self.state = state;
        self.upstream = None;
        lock(&self.shared).state = state;

        debug!(state = %state, fragments = self.fragments, "stream session ended");
        if let Some(logger) = &self.logger {
            let chars = self.text.chars().count();
            if let Err(e) = logger.log_stream_event(state.as_str(), self.fragments, chars) {
                warn!(error = %e, "failed to write session log");
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.terminate(StreamState::Cancelled);
        }
        let mut shared = lock(&self.shared);
        shared.state = StreamState::Idle;
        shared.token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ModelDescriptor;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedStream(Vec<&'static str>);

    #[async_trait]
    impl GenerationClient for FixedStream {
        async fn generate(&self, _prompt: &str, _config: &GenerateConfig) -> Result<String> {
            Ok(self.0.concat())
        }

        async fn generate_stream(&self, _prompt: &str, _config: &GenerateConfig) -> Result<FragmentStream> {
            let items: Vec<Result<String>> = self.0.iter().map(|s| Ok(s.to_string())).collect();
            Ok(Box::pin(stream::iter(items)))
        }

        async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
            Ok(Vec::new())
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> String {
            "fixed".to_string()
        }
    }

    /// Never finishes opening.
    struct Hanging;

    #[async_trait]
    impl GenerationClient for Hanging {
        async fn generate(&self, _prompt: &str, _config: &GenerateConfig) -> Result<String> {
            std::future::pending::<Result<String>>().await
        }

        async fn generate_stream(&self, _prompt: &str, _config: &GenerateConfig) -> Result<FragmentStream> {
            std::future::pending::<Result<FragmentStream>>().await
        }

        async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
            Ok(Vec::new())
        }

        fn provider_name(&self) -> &str {
            "hanging"
        }

        fn default_model(&self) -> String {
            "hanging".to_string()
        }
    }

    fn controller(fragments: Vec<&'static str>) -> StreamSessionController {
        StreamSessionController::new(Arc::new(FixedStream(fragments)))
    }

    #[tokio::test]
    async fn test_completes_with_marker() {
        let controller = controller(vec!["Hel", "lo"]);
        let mut session = controller.begin("hi").await.unwrap();
        assert_eq!(controller.state(), StreamState::Streaming);

        let mut seen = Vec::new();
        while let Some(fragment) = session.next_fragment().await {
            seen.push(fragment.unwrap());
        }

        assert_eq!(seen, vec!["Hel", "lo", "\n"]);
        assert_eq!(session.state(), StreamState::Completed);
        assert_eq!(controller.state(), StreamState::Completed);

        let summary = session.finish();
        assert_eq!(summary.text, "Hello\n");
        assert_eq!(summary.fragments, 2);
        assert_eq!(controller.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn test_empty_marker_disabled() {
        let controller = controller(vec!["a"]).with_finalization_marker("");
        let mut session = controller.begin("x").await.unwrap();
        while session.next_fragment().await.is_some() {}
        assert_eq!(session.finish().text, "a");
    }

    #[tokio::test]
    async fn test_second_begin_rejected_until_released() {
        let controller = controller(vec!["a", "b"]);
        let session = controller.begin("one").await.unwrap();

        assert!(matches!(
            controller.begin("two").await,
            Err(AgentError::SessionBusy)
        ));

        drop(session);
        assert_eq!(controller.state(), StreamState::Idle);
        assert!(controller.begin("three").await.is_ok());
    }

    #[tokio::test]
    async fn test_controller_cancel() {
        let controller = controller(vec!["a", "b", "c"]);
        assert!(!controller.cancel());

        let mut session = controller.begin("x").await.unwrap();
        assert_eq!(session.next_fragment().await.unwrap().unwrap(), "a");
        assert!(controller.cancel());

        assert!(session.next_fragment().await.is_none());
        let summary = session.finish();
        assert_eq!(summary.state, StreamState::Cancelled);
        assert_eq!(summary.text, "a");
    }

    #[tokio::test]
    async fn test_finish_while_streaming_counts_as_cancelled() {
        let controller = controller(vec!["a", "b"]);
        let mut session = controller.begin("x").await.unwrap();
        session.next_fragment().await;

        let summary = session.finish();
        assert_eq!(summary.state, StreamState::Cancelled);
        assert_eq!(summary.fragments, 1);
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn test_cancel_while_opening() {
        let controller = Arc::new(StreamSessionController::new(Arc::new(Hanging)));
        let opener = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.begin("x").await.map(|_| ()) })
        };

        while !controller.is_active() {
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.state(), StreamState::Streaming);
        assert!(controller.cancel());

        assert!(matches!(opener.await.unwrap(), Err(AgentError::Cancelled)));
        assert_eq!(controller.state(), StreamState::Idle);
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn test_abandoned_begin_resets_controller() {
        let controller = StreamSessionController::new(Arc::new(Hanging));

        let first = tokio::time::timeout(Duration::from_millis(20), controller.begin("x")).await;
        assert!(first.is_err());
        assert_eq!(controller.state(), StreamState::Idle);
        assert!(!controller.is_active());

        // Guard was released, so a new attempt is not rejected as busy
        let second = tokio::time::timeout(Duration::from_millis(20), controller.begin("y")).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_streaming_disabled_delivers_one_fragment() {
        let controller = controller(vec!["Hel", "lo"]).with_generate_config(GenerateConfig::new());
        let mut session = controller.begin("hi").await.unwrap();

        let mut seen = Vec::new();
        while let Some(fragment) = session.next_fragment().await {
            seen.push(fragment.unwrap());
        }

        assert_eq!(seen, vec!["Hello", "\n"]);
        let summary = session.finish();
        assert_eq!(summary.state, StreamState::Completed);
        assert_eq!(summary.fragments, 1);
    }

    #[tokio::test]
    async fn test_from_config_honours_streaming_flag() {
        let mut config = Configuration::default();
        config.llm.enable_streaming = false;
        config.stream.finalization_marker = String::new();
        let controller =
            StreamSessionController::from_config(Arc::new(FixedStream(vec!["a", "b"])), &config);

        let mut session = controller.begin("x").await.unwrap();
        assert_eq!(session.next_fragment().await.unwrap().unwrap(), "ab");
        assert!(session.next_fragment().await.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!StreamState::Idle.is_terminal());
        assert!(!StreamState::Streaming.is_terminal());
        assert!(StreamState::Completed.is_terminal());
        assert!(StreamState::Cancelled.is_terminal());
        assert!(StreamState::Failed.is_terminal());
    }
}
