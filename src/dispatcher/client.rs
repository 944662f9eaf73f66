use async_trait::async_trait;
use futures::Stream;

use crate::error::RequestError;
use super::request::AnalysisRequest;

/// Ordered fragments pulled from an in-flight generation. Each item is either
/// the next piece of Markdown text or the error that ended the stream early.
pub type FragmentStream = Box<dyn Stream<Item = Result<String, RequestError>> + Send + Unpin>;

/// Interface for hosted generation backends.
///
/// Implementations hold their own credentials and HTTP client; callers hand
/// over a request and consume either the full text or a fragment stream.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// One blocking call: the entire generated text, or the failure.
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, RequestError>;

    /// Open a streaming call. Errors returned here occurred before any
    /// fragment arrived; later failures surface as stream items.
    async fn generate_stream(&self, request: &AnalysisRequest)
        -> Result<FragmentStream, RequestError>;
}
