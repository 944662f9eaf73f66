use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::client::{FragmentStream, GenerationClient};
use super::request::AnalysisRequest;
use crate::error::RequestError;

/// Canned generation backend. Replays a fixed fragment script without any
/// network traffic, optionally failing after a set number of fragments, and
/// counts how many upstream calls were attempted.
pub struct ScriptedClient {
    fragments: Vec<String>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new<I>(fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Delivers the first `deliver` fragments, then fails the stream. The
    /// blocking call fails outright since it has no partial output.
    pub fn failing_after<I>(fragments: I, deliver: usize) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            fail_after: Some(deliver),
            ..Self::new(fragments)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, _request: &AnalysisRequest) -> Result<String, RequestError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_after.is_some() {
            return Err(RequestError::new("scripted failure"));
        }
        Ok(self.fragments.concat())
    }

    async fn generate_stream(
        &self,
        _request: &AnalysisRequest,
    ) -> Result<FragmentStream, RequestError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut items: Vec<Result<String, RequestError>> = Vec::new();
        match self.fail_after {
            Some(deliver) => {
                for fragment in self.fragments.iter().take(deliver) {
                    items.push(Ok(fragment.clone()));
                }
                items.push(Err(RequestError::new("scripted stream failure")));
            }
            None => {
                for fragment in &self.fragments {
                    items.push(Ok(fragment.clone()));
                }
            }
        }
        Ok(Box::new(futures::stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioInput, AudioMime};
    use futures_util::StreamExt;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(
            AudioInput::new(vec![0u8; 16], AudioMime::Wav),
            "describe",
            "test-model",
        )
    }

    #[tokio::test]
    async fn test_generate_joins_script_in_order() {
        let client = ScriptedClient::new(["# Report\n", "first ", "second"]);
        let text = client.generate(&request()).await.unwrap();
        assert_eq!(text, "# Report\nfirst second");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let client = ScriptedClient::new(["a", "b", "c"]);
        let stream = client.generate_stream(&request()).await.unwrap();
        let items: Vec<_> = stream.collect().await;
        let fragments: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(fragments, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failing_after_delivers_then_errors() {
        let client = ScriptedClient::failing_after(["a", "b", "c", "d"], 2);
        let mut stream = client.generate_stream(&request()).await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next().await.unwrap().unwrap(), "b");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failing_after_blocks_whole_generate_call() {
        let client = ScriptedClient::failing_after(["a", "b"], 1);
        assert!(client.generate(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_call_count_tracks_both_modes() {
        let client = ScriptedClient::new(["x"]);
        let _ = client.generate(&request()).await;
        let _ = client.generate_stream(&request()).await;
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_scripted_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScriptedClient>();
    }
}
