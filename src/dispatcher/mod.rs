pub mod client;
pub mod gemini;
pub mod request;
pub mod scripted;

pub use client::*;
pub use gemini::*;
pub use request::*;
pub use scripted::*;

use std::sync::Arc;

use tracing::debug;

use crate::error::RequestError;

/// Routes one analysis at a time to the configured generation backend.
///
/// Holds no request state; callers own the request and the result buffer, so
/// two sessions dispatching concurrently never observe each other.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn GenerationClient>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Blocking mode: one upstream call, the whole text or the failure.
    pub async fn dispatch(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RequestError> {
        debug!("Dispatching analysis: model={}", request.model());
        let text = self.client.generate(request).await?;
        Ok(AnalysisResult::complete(text))
    }

    /// Streaming mode: opens the fragment stream for the caller to drain.
    /// The caller appends fragments to its own result buffer as they arrive.
    pub async fn open_stream(
        &self,
        request: &AnalysisRequest,
    ) -> Result<FragmentStream, RequestError> {
        debug!("Opening analysis stream: model={}", request.model());
        self.client.generate_stream(request).await
    }
}
