//! Client boundary for the report chat service.
//!
//! Everything the side panel needs from the backend goes through [`ChatApi`], so the panel
//! can be driven by [`HttpChatApi`] in production and by scripted fakes in tests.
use std::future::Future;
use std::pin::Pin;

pub mod error;
pub mod http;
pub mod ids;
pub mod types;

pub use error::{ChatApiError, ChatApiResult};
pub use http::{ChatApiConfig, DEFAULT_REQUEST_TIMEOUT, HttpChatApi};
pub use ids::{MessageId, SegmentId, SessionId, UserId};
pub use types::{
    MessageRecord, MessageSender, NewSession, SendMessageRequest, SendMessageResponse,
    SessionRecord,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat-service operations consumed by the panel.
pub trait ChatApi: Send + Sync {
    /// Prepares chat context for a segment before its first session is created.
    fn init_segment<'a>(&'a self, segment_id: &'a SegmentId) -> BoxFuture<'a, ChatApiResult<()>>;

    fn create_session<'a>(&'a self, input: NewSession)
    -> BoxFuture<'a, ChatApiResult<SessionRecord>>;

    fn list_sessions<'a>(
        &'a self,
        segment_id: &'a SegmentId,
    ) -> BoxFuture<'a, ChatApiResult<Vec<SessionRecord>>>;

    fn list_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, ChatApiResult<Vec<MessageRecord>>>;

    /// Sends one user message and returns the system's reply text.
    fn send_message<'a>(
        &'a self,
        segment_id: &'a SegmentId,
        session_id: &'a SessionId,
        content: &'a str,
    ) -> BoxFuture<'a, ChatApiResult<String>>;
}
