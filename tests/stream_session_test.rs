//! Integration test for stream sessions: cancellation, completion and the
//! single-active-session guard.

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream;
use llamaflow::orchestration::{AgentError, StreamSessionController, StreamState};
use llamaflow::provider::{FragmentStream, GenerateConfig, GenerationClient, ModelDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Streams `fragment-1 ... fragment-N`, counting how many were requested.
/// When `fail_at` is set, that fragment is an error instead.
struct CountingClient {
    total: usize,
    fail_at: Option<usize>,
    pulled: Arc<AtomicUsize>,
}

impl CountingClient {
    fn new(total: usize) -> Self {
        Self {
            total,
            fail_at: None,
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_at(total: usize, fail_at: usize) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::new(total)
        }
    }
}

fn fragment(i: usize) -> String {
    format!("fragment-{} ", i)
}

#[async_trait]
impl GenerationClient for CountingClient {
    async fn generate(&self, _prompt: &str, _config: &GenerateConfig) -> Result<String> {
        Ok((1..=self.total).map(fragment).collect())
    }

    async fn generate_stream(&self, _prompt: &str, _config: &GenerateConfig) -> Result<FragmentStream> {
        let total = self.total;
        let fail_at = self.fail_at;
        let pulled = self.pulled.clone();

        let fragments = stream::unfold(1usize, move |i| {
            let pulled = pulled.clone();
            async move {
                if i > total {
                    return None;
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                let item = if Some(i) == fail_at {
                    Err(anyhow::anyhow!("backend dropped the connection"))
                } else {
                    Ok(fragment(i))
                };
                Some((item, i + 1))
            }
        });
        Ok(Box::pin(fragments))
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        Ok(Vec::new())
    }

    fn provider_name(&self) -> &str {
        "counting"
    }

    fn default_model(&self) -> String {
        "counting".to_string()
    }
}

#[tokio::test]
async fn test_cancel_after_three_of_ten() {
    let client = CountingClient::new(10);
    let pulled = client.pulled.clone();
    let controller = StreamSessionController::new(Arc::new(client));

    let mut session = controller.begin("story").await.unwrap();
    let cancel = session.cancel_handle();

    let mut delivered = Vec::new();
    while let Some(item) = session.next_fragment().await {
        delivered.push(item.unwrap());
        if delivered.len() == 3 {
            cancel.cancel();
        }
    }

    let summary = session.finish();
    assert_eq!(summary.state, StreamState::Cancelled);
    assert_eq!(summary.text, (1..=3).map(fragment).collect::<String>());
    assert_eq!(summary.fragments, 3);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
    assert_eq!(controller.state(), StreamState::Idle);
}

#[tokio::test]
async fn test_cancel_from_another_task() {
    let controller = StreamSessionController::new(Arc::new(CountingClient::new(10)));
    let mut session = controller.begin("story").await.unwrap();

    let first = session.next_fragment().await.unwrap().unwrap();
    assert_eq!(first, fragment(1));

    let handle = session.cancel_handle();
    tokio::spawn(async move { handle.cancel() }).await.unwrap();

    assert!(session.next_fragment().await.is_none());
    assert_eq!(session.state(), StreamState::Cancelled);
    assert_eq!(session.text(), fragment(1));
}

#[tokio::test]
async fn test_completion_appends_marker_once() {
    let controller = StreamSessionController::new(Arc::new(CountingClient::new(4)))
        .with_finalization_marker("\n");
    let mut session = controller.begin("story").await.unwrap();

    let mut delivered = Vec::new();
    while let Some(item) = session.next_fragment().await {
        delivered.push(item.unwrap());
    }
    assert_eq!(delivered.len(), 5);
    assert_eq!(delivered.last().map(String::as_str), Some("\n"));
    assert!(session.next_fragment().await.is_none());

    let summary = session.finish();
    assert_eq!(summary.state, StreamState::Completed);
    assert_eq!(summary.text, format!("{}\n", (1..=4).map(fragment).collect::<String>()));
}

#[tokio::test]
async fn test_upstream_error_fails_session() {
    let controller = StreamSessionController::new(Arc::new(CountingClient::failing_at(10, 2)));
    let mut session = controller.begin("story").await.unwrap();

    assert!(session.next_fragment().await.unwrap().is_ok());
    let err = session.next_fragment().await.unwrap().unwrap_err();
    assert!(matches!(err, AgentError::Client { .. }));
    assert!(session.next_fragment().await.is_none());

    let summary = session.finish();
    assert_eq!(summary.state, StreamState::Failed);
    assert_eq!(summary.text, fragment(1));
    assert_eq!(controller.state(), StreamState::Idle);
}

#[tokio::test]
async fn test_only_one_active_session() {
    let controller = Arc::new(StreamSessionController::new(Arc::new(CountingClient::new(3))));
    let session = controller.begin("first").await.unwrap();

    let contender = controller.clone();
    let second = tokio::spawn(async move { contender.begin("second").await.map(|_| ()) })
        .await
        .unwrap();
    assert!(matches!(second, Err(AgentError::SessionBusy)));

    let summary = session.finish();
    assert_eq!(summary.state, StreamState::Cancelled);
    assert!(controller.begin("third").await.is_ok());
}
