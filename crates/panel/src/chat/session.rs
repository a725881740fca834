use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use insight_chat_api::error::RequestTimeoutSnafu;
use insight_chat_api::{ChatApi, ChatApiResult, SegmentId, SessionId, UserId};

use super::message::{Message, Sender};
use super::phase::{ConversationPhase, resolve_phase, select_latest_session};

/// Report the panel is attached to, plus who is viewing it and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelContext {
    pub user_id: UserId,
    pub segment_id: SegmentId,
    pub report_title: String,
    /// Section of the report that was on screen when the panel opened.
    pub active_section: Option<String>,
}

impl PanelContext {
    pub fn new(user_id: UserId, segment_id: SegmentId, report_title: impl Into<String>) -> Self {
        Self {
            user_id,
            segment_id,
            report_title: report_title.into(),
            active_section: None,
        }
    }

    pub fn with_active_section(mut self, section: impl Into<String>) -> Self {
        let section = section.into().trim().to_string();
        self.active_section = (!section.is_empty()).then_some(section);
        self
    }

    /// Local-only opener shown for a session that has no history yet.
    pub fn greeting(&self, now: DateTime<Utc>) -> Message {
        let mut content = format!(
            "Hi! I'm your research assistant for \"{}\".",
            self.report_title.trim()
        );
        if let Some(section) = &self.active_section {
            content.push_str(&format!(" I see you're looking at the {section} section."));
        }
        content.push_str(" Ask me anything about this report.");
        Message::new(Sender::System, content, now)
    }
}

/// Outcome of looking up the segment's conversation on panel open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub phase: ConversationPhase,
    pub session_id: Option<SessionId>,
    pub messages: Vec<Message>,
}

/// Bounds one chat-service call by the panel's request timeout.
pub(crate) async fn bounded<T, F>(
    stage: &'static str,
    timeout: Duration,
    call: F,
) -> ChatApiResult<T>
where
    F: Future<Output = ChatApiResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => RequestTimeoutSnafu { stage, timeout }.fail(),
    }
}

/// Looks up existing sessions for the segment and loads the latest one's history.
///
/// Never creates a session; an empty lookup resolves to `Uninitiated`.
pub async fn check_session_state(
    api: &dyn ChatApi,
    context: &PanelContext,
    timeout: Duration,
) -> ChatApiResult<ResolvedSession> {
    let sessions = bounded(
        "list-sessions",
        timeout,
        api.list_sessions(&context.segment_id),
    )
    .await?;

    let Some(latest) = select_latest_session(&sessions) else {
        return Ok(ResolvedSession {
            phase: ConversationPhase::Uninitiated,
            session_id: None,
            messages: Vec::new(),
        });
    };

    let records = bounded("list-messages", timeout, api.list_messages(&latest.id)).await?;
    let phase = resolve_phase(&sessions, &records);
    let now = Utc::now();

    let messages = match phase {
        ConversationPhase::Active => records
            .into_iter()
            .map(|record| Message::from_record(record, now))
            .collect(),
        ConversationPhase::Initiated => vec![context.greeting(now)],
        ConversationPhase::Uninitiated => Vec::new(),
    };

    tracing::debug!(
        segment_id = %context.segment_id,
        session_id = %latest.id,
        session_count = sessions.len(),
        message_count = messages.len(),
        ?phase,
        "resolved existing chat session"
    );

    Ok(ResolvedSession {
        phase,
        session_id: Some(latest.id.clone()),
        messages,
    })
}
