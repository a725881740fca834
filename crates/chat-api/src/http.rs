use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, ensure};
use url::Url;

use super::error::{
    BuildClientSnafu, ChatApiResult, DecodeSnafu, InvalidBaseUrlSnafu, TransportSnafu,
    UnexpectedStatusSnafu, UnsupportedBaseUrlSnafu,
};
use super::ids::{SegmentId, SessionId};
use super::types::{
    MessageRecord, NewSession, SendMessageRequest, SendMessageResponse, SessionRecord,
};
use super::{BoxFuture, ChatApi};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatApiConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub request_timeout: Duration,
}

impl ChatApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            bearer_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into().trim().to_string();
        self.bearer_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// reqwest-backed implementation of the chat-service endpoints.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    config: ChatApiConfig,
    base_url: Url,
    client: Client,
}

impl HttpChatApi {
    pub fn new(config: ChatApiConfig) -> ChatApiResult<Self> {
        let base_url = Url::parse(&config.base_url).context(InvalidBaseUrlSnafu {
            stage: "http-chat-api-new",
            url: config.base_url.clone(),
        })?;
        ensure!(
            !base_url.cannot_be_a_base(),
            UnsupportedBaseUrlSnafu {
                stage: "http-chat-api-new",
                url: config.base_url.clone(),
            }
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "http-chat-api-new",
            })?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    /// Appends each segment percent-encoded, so ids cannot inject `/`, `?` or `#`.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> (String, RequestBuilder) {
        let url = self.url(segments);
        let mut builder = self.client.request(method, url.clone());
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }
        (url.to_string(), builder)
    }

    async fn execute(
        stage: &'static str,
        url: String,
        builder: RequestBuilder,
    ) -> ChatApiResult<String> {
        tracing::debug!(stage, url = %url, "sending chat service request");

        let response = builder.send().await.context(TransportSnafu {
            stage,
            url: url.clone(),
        })?;
        let status = response.status();
        let body = response.text().await.context(TransportSnafu {
            stage,
            url: url.clone(),
        })?;

        if !status.is_success() {
            tracing::warn!(
                stage,
                url = %url,
                status = status.as_u16(),
                "chat service rejected request"
            );
            return UnexpectedStatusSnafu {
                stage,
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(body)
    }

    async fn execute_json<T>(
        stage: &'static str,
        url: String,
        builder: RequestBuilder,
    ) -> ChatApiResult<T>
    where
        T: DeserializeOwned,
    {
        let body = Self::execute(stage, url, builder).await?;
        serde_json::from_str(&body).context(DecodeSnafu { stage })
    }
}

impl ChatApi for HttpChatApi {
    fn init_segment<'a>(&'a self, segment_id: &'a SegmentId) -> BoxFuture<'a, ChatApiResult<()>> {
        Box::pin(async move {
            let (url, builder) =
                self.request(Method::POST, &["chat", "init", segment_id.as_str()]);
            Self::execute("init-segment", url, builder).await?;
            Ok(())
        })
    }

    fn create_session<'a>(
        &'a self,
        input: NewSession,
    ) -> BoxFuture<'a, ChatApiResult<SessionRecord>> {
        Box::pin(async move {
            let (url, builder) = self.request(Method::POST, &["chat", ""]);
            Self::execute_json("create-session", url, builder.json(&input)).await
        })
    }

    fn list_sessions<'a>(
        &'a self,
        segment_id: &'a SegmentId,
    ) -> BoxFuture<'a, ChatApiResult<Vec<SessionRecord>>> {
        Box::pin(async move {
            let (url, builder) =
                self.request(Method::GET, &["chat", "segment", segment_id.as_str()]);
            Self::execute_json("list-sessions", url, builder).await
        })
    }

    fn list_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, ChatApiResult<Vec<MessageRecord>>> {
        Box::pin(async move {
            let (url, builder) =
                self.request(Method::GET, &["chat", session_id.as_str(), "messages"]);
            Self::execute_json("list-messages", url, builder).await
        })
    }

    fn send_message<'a>(
        &'a self,
        segment_id: &'a SegmentId,
        session_id: &'a SessionId,
        content: &'a str,
    ) -> BoxFuture<'a, ChatApiResult<String>> {
        Box::pin(async move {
            let (url, builder) = self.request(
                Method::POST,
                &["chat", segment_id.as_str(), session_id.as_str(), "message"],
            );
            let body = SendMessageRequest {
                content: content.to_string(),
            };
            let reply: SendMessageResponse =
                Self::execute_json("send-message", url, builder.json(&body)).await?;
            Ok(reply.response)
        })
    }
}
