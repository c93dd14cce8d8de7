//! The seam between a chat session and the completion service.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::types::ChatCompletionRequest;

/// A lazy, finite, non-restartable sequence of non-empty text fragments.
///
/// The stream ends when the reply is complete; an `Err` item means the reply
/// failed and no further items follow.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Something that can turn a chat-completion request into a fragment stream.
#[async_trait::async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Issue `request` authenticated with `api_key` and return its reply stream.
    ///
    /// Errors returned here happened before any fragment was produced.
    async fn open_stream(
        &self,
        api_key: &str,
        request: ChatCompletionRequest,
    ) -> Result<FragmentStream>;
}
