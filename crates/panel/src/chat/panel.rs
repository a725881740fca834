use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use insight_chat_api::{
    ChatApi, ChatApiResult, DEFAULT_REQUEST_TIMEOUT, NewSession, SessionId, SessionRecord,
};
use tokio::sync::watch;

use super::message::{Message, MessageLog, SEND_FAILURE_MESSAGE, SESSION_LOAD_FAILURE_MESSAGE};
use super::phase::{ConversationPhase, PanelStatus, PhaseRegression};
use super::session::{PanelContext, bounded, check_session_state};

/// Render-facing view of the panel, republished after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelSnapshot {
    pub status: PanelStatus,
    pub session_id: Option<SessionId>,
    pub messages: Vec<Message>,
    /// Bumped whenever `messages` is replaced rather than appended to.
    pub message_generation: u64,
    /// Drives the typing indicator and disables the input while a send is in flight.
    pub is_loading: bool,
    pub draft: String,
}

/// Why an action was refused without touching the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRejection {
    StillLoading,
    WrongPhase {
        phase: ConversationPhase,
        action: &'static str,
    },
    SendInFlight,
    EmptyContent,
    MissingSession,
    Regression(PhaseRegression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiateOutcome {
    Initiated(SessionId),
    /// The service call failed; the panel stays `Uninitiated` and the user may retry.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Answered,
    /// The user message stays in place and a fallback reply follows it.
    Failed,
}

/// Conversation side-panel for one report segment.
///
/// Owns the phase lifecycle and the message exchange pipeline. Layout concerns live in
/// [`crate::layout`] and never touch conversation state.
pub struct ChatPanel {
    api: Arc<dyn ChatApi>,
    context: PanelContext,
    request_timeout: Duration,
    status: PanelStatus,
    session_id: Option<SessionId>,
    messages: MessageLog,
    is_loading: bool,
    draft: String,
    snapshot_tx: watch::Sender<PanelSnapshot>,
}

impl ChatPanel {
    pub fn new(api: Arc<dyn ChatApi>, context: PanelContext) -> Self {
        let (snapshot_tx, _) = watch::channel(PanelSnapshot::default());
        Self {
            api,
            context,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            status: PanelStatus::Loading,
            session_id: None,
            messages: MessageLog::new(),
            is_loading: false,
            draft: String::new(),
            snapshot_tx,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn context(&self) -> &PanelContext {
        &self.context
    }

    pub fn status(&self) -> PanelStatus {
        self.status
    }

    pub fn phase(&self) -> Option<ConversationPhase> {
        self.status.phase()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.publish();
    }

    /// Whether the input affordance should accept a submit right now.
    pub fn can_submit(&self) -> bool {
        let phase_ready = match self.status {
            PanelStatus::Loading => false,
            PanelStatus::Ready(phase) => phase.accepts_send(),
        };
        phase_ready && !self.is_loading && !self.draft.trim().is_empty()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            status: self.status,
            session_id: self.session_id.clone(),
            messages: self.messages.to_vec(),
            message_generation: self.messages.generation(),
            is_loading: self.is_loading,
            draft: self.draft.clone(),
        }
    }

    /// Starts a fresh mount: drops all local state and recomputes the phase from the backend.
    ///
    /// Lookup failures settle on `Uninitiated` with a single apology bubble.
    pub async fn open(&mut self) -> ConversationPhase {
        self.status = PanelStatus::Loading;
        self.session_id = None;
        self.messages.clear();
        self.is_loading = false;
        self.draft.clear();
        self.publish();

        let resolved =
            check_session_state(self.api.as_ref(), &self.context, self.request_timeout).await;

        let phase = match resolved {
            Ok(resolved) => {
                self.session_id = resolved.session_id;
                self.messages.reset(resolved.messages);
                resolved.phase
            }
            Err(error) => {
                tracing::warn!(
                    segment_id = %self.context.segment_id,
                    stage = error.stage(),
                    error = %error,
                    "failed to resolve chat session state"
                );
                self.messages
                    .reset(vec![Message::system_now(SESSION_LOAD_FAILURE_MESSAGE)]);
                ConversationPhase::Uninitiated
            }
        };

        self.status = PanelStatus::Ready(phase);
        self.publish();
        phase
    }

    /// Creates the remote session for this segment and shows the greeting.
    pub async fn initiate(&mut self) -> Result<InitiateOutcome, ActionRejection> {
        let phase = self.ready_phase()?;
        if !phase.accepts_initiate() {
            return Err(ActionRejection::WrongPhase {
                phase,
                action: "initiate",
            });
        }

        let session = match self.create_remote_session().await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(
                    segment_id = %self.context.segment_id,
                    stage = error.stage(),
                    error = %error,
                    "failed to start chat session"
                );
                return Ok(InitiateOutcome::Failed);
            }
        };

        self.advance_phase(ConversationPhase::Initiated)?;
        self.session_id = Some(session.id.clone());
        self.messages.reset(vec![self.context.greeting(Utc::now())]);
        self.publish();

        tracing::info!(
            segment_id = %self.context.segment_id,
            session_id = %session.id,
            "chat session started"
        );
        Ok(InitiateOutcome::Initiated(session.id))
    }

    /// Sends one user message.
    ///
    /// The user bubble is appended before the network call and is never rolled back;
    /// a failed round-trip appends [`SEND_FAILURE_MESSAGE`] right after it. Dropping the
    /// returned future before the reply arrives settles the exchange the same way.
    pub async fn send(&mut self, content: &str) -> Result<SendOutcome, ActionRejection> {
        let phase = self.ready_phase()?;
        if !phase.accepts_send() {
            return Err(ActionRejection::WrongPhase {
                phase,
                action: "send",
            });
        }
        if self.is_loading {
            return Err(ActionRejection::SendInFlight);
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(ActionRejection::EmptyContent);
        }
        let Some(session_id) = self.session_id.clone() else {
            return Err(ActionRejection::MissingSession);
        };

        let user_index = self.messages.push(Message::user_now(content));
        self.advance_phase(ConversationPhase::Active)?;
        self.draft.clear();
        self.is_loading = true;
        self.publish();

        let api = Arc::clone(&self.api);
        let segment_id = self.context.segment_id.clone();
        let request_timeout = self.request_timeout;
        let exchange = PendingExchange {
            panel: self,
            session_id: session_id.clone(),
            user_index,
            settled: false,
        };

        let result = bounded(
            "send-message",
            request_timeout,
            api.send_message(&segment_id, &session_id, content),
        )
        .await;

        Ok(exchange.settle(result))
    }

    /// Sends the current draft. A rejected submit leaves the draft untouched.
    pub async fn submit_draft(&mut self) -> Result<SendOutcome, ActionRejection> {
        let draft = self.draft.clone();
        self.send(&draft).await
    }

    async fn create_remote_session(&self) -> ChatApiResult<SessionRecord> {
        let segment_id = &self.context.segment_id;
        bounded(
            "init-segment",
            self.request_timeout,
            self.api.init_segment(segment_id),
        )
        .await?;

        let input = NewSession {
            user_id: self.context.user_id.clone(),
            title: self.context.report_title.clone(),
            segment_id: segment_id.clone(),
        };
        bounded(
            "create-session",
            self.request_timeout,
            self.api.create_session(input),
        )
        .await
    }

    fn ready_phase(&self) -> Result<ConversationPhase, ActionRejection> {
        self.status.phase().ok_or(ActionRejection::StillLoading)
    }

    fn advance_phase(&mut self, next: ConversationPhase) -> Result<(), ActionRejection> {
        let current = self.ready_phase()?;
        let next = current.advance(next).map_err(ActionRejection::Regression)?;
        self.status = PanelStatus::Ready(next);
        Ok(())
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

/// A send whose user bubble is already shown.
///
/// Dropping it unsettled (the caller abandoned the send future) appends the fallback reply
/// and clears `is_loading`, so the user message is never left without an answer.
struct PendingExchange<'a> {
    panel: &'a mut ChatPanel,
    session_id: SessionId,
    user_index: usize,
    settled: bool,
}

impl PendingExchange<'_> {
    fn settle(mut self, result: ChatApiResult<String>) -> SendOutcome {
        self.settled = true;
        let outcome = match result {
            Ok(reply) => {
                self.panel.messages.push(Message::system_now(reply));
                SendOutcome::Answered
            }
            Err(error) => {
                tracing::warn!(
                    segment_id = %self.panel.context.segment_id,
                    session_id = %self.session_id,
                    user_index = self.user_index,
                    stage = error.stage(),
                    error = %error,
                    "chat message round-trip failed"
                );
                self.panel
                    .messages
                    .push(Message::system_now(SEND_FAILURE_MESSAGE));
                SendOutcome::Failed
            }
        };
        self.panel.is_loading = false;
        self.panel.publish();
        outcome
    }
}

impl Drop for PendingExchange<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!(
            segment_id = %self.panel.context.segment_id,
            session_id = %self.session_id,
            user_index = self.user_index,
            "chat message abandoned before the service replied"
        );
        self.panel
            .messages
            .push(Message::system_now(SEND_FAILURE_MESSAGE));
        self.panel.is_loading = false;
        self.panel.publish();
    }
}
