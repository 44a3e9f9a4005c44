//! In-memory backend for tests.
//!
//! `ScriptedBackend` replays a fixed list of text increments and records every
//! request it receives, so callers can assert on what reached the backend.
//! It also counts how many increments were pulled from its streams and how
//! many stream handles were dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use crate::domain::BackendRequest;
use crate::ports::{BackendError, ChatBackendPort, TextStream};

/// Backend that answers from a script instead of a model.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    increments: Vec<String>,
    failure: Option<String>,
    open_failure: Option<String>,
    fail_after: Option<(usize, String)>,
    endless: bool,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<BackendRequest>>>,
    pulled: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

/// Counts a released stream handle when dropped.
#[derive(Debug)]
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedBackend {
    /// Backend whose stream yields `increments` in order and whose full
    /// response is their concatenation.
    pub fn replying<I, S>(increments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            increments: increments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Backend that fails every call with `BackendError::Internal(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            failure: Some(message.clone()),
            open_failure: Some(message),
            ..Self::default()
        }
    }

    /// Make the stream fail after yielding `count` increments.
    #[must_use]
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((count, message.into()));
        self
    }

    /// Make opening the stream fail.
    #[must_use]
    pub fn fail_on_open(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    /// Make the stream repeat its increments forever, like a backend that
    /// never finishes on its own.
    #[must_use]
    pub fn endless(mut self) -> Self {
        self.endless = true;
        self
    }

    /// Increments handed out by all streams so far.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Stream handles dropped so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Number of `complete` and `stream` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: &BackendRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request.clone());
        }
    }
}

#[async_trait]
impl ChatBackendPort for ScriptedBackend {
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError> {
        self.record(request);
        if let Some(message) = &self.failure {
            return Err(BackendError::Internal(message.clone()));
        }
        Ok(self.increments.concat())
    }

    async fn stream(&self, request: &BackendRequest) -> Result<TextStream, BackendError> {
        self.record(request);
        if let Some(message) = &self.open_failure {
            return Err(BackendError::Internal(message.clone()));
        }

        let source: TextStream = if self.endless {
            let repeated = self.increments.clone().into_iter().cycle();
            Box::pin(stream::iter(repeated).map(Ok::<String, BackendError>))
        } else {
            let mut items: Vec<Result<String, BackendError>> = match &self.fail_after {
                Some((count, _)) => {
                    self.increments.iter().take(*count).cloned().map(Ok).collect()
                }
                None => self.increments.iter().cloned().map(Ok).collect(),
            };
            if let Some((_, message)) = &self.fail_after {
                items.push(Err(BackendError::Transport(message.clone())));
            }
            Box::pin(stream::iter(items))
        };

        let state = (source, ReleaseGuard(self.released.clone()), self.pulled.clone());
        Ok(Box::pin(stream::unfold(
            state,
            |(mut source, guard, pulled)| async move {
                let item = source.next().await?;
                pulled.fetch_add(1, Ordering::SeqCst);
                Some((item, (source, guard, pulled)))
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendMessage, GenerationParams};
    use futures_util::StreamExt;
    use tokio_test::{assert_err, assert_ok};

    fn request() -> BackendRequest {
        BackendRequest::new(
            "m1",
            vec![BackendMessage::Human("hi".into())],
            GenerationParams::default(),
        )
    }

    #[tokio::test]
    async fn test_replying_backend() {
        let backend = ScriptedBackend::replying(["he", "llo"]);

        let text = assert_ok!(backend.complete(&request()).await);
        assert_eq!(text, "hello");

        let stream = assert_ok!(backend.stream(&request()).await);
        let parts: Vec<String> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(parts, vec!["he", "llo"]);

        assert_eq!(backend.calls(), 2);
        assert_eq!(backend.requests()[0].model, "m1");
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = ScriptedBackend::failing("boom");
        let err = assert_err!(backend.complete(&request()).await);
        assert_eq!(err.to_string(), "Internal error: boom");
        assert!(backend.stream(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_after() {
        let backend = ScriptedBackend::replying(["a", "b", "c"]).fail_after(1, "reset");
        let items: Vec<_> = assert_ok!(backend.stream(&request()).await).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().ok(), Some("a"));
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_it() {
        let backend = ScriptedBackend::replying(["tick"]).endless();
        let mut stream = assert_ok!(backend.stream(&request()).await);

        for _ in 0..3 {
            assert_eq!(stream.next().await.unwrap().unwrap(), "tick");
        }
        assert_eq!(backend.pulled(), 3);
        assert_eq!(backend.released(), 0);

        drop(stream);
        assert_eq!(backend.released(), 1);
        assert_eq!(backend.pulled(), 3);
    }
}
