//! Scripted in-memory chat service used by panel tests.
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use insight_chat_api::{
    BoxFuture, ChatApi, ChatApiError, ChatApiResult, MessageId, MessageRecord, MessageSender,
    NewSession, SegmentId, SessionId, SessionRecord, UserId,
};
use tokio::sync::watch;

use super::panel::PanelSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub init_segment: usize,
    pub create_session: usize,
    pub list_sessions: usize,
    pub list_messages: usize,
    pub send_message: usize,
}

#[derive(Debug, Clone)]
pub enum SendScript {
    Reply(String),
    Fail,
    Stall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub segment_id: SegmentId,
    pub session_id: SessionId,
    pub content: String,
}

#[derive(Default)]
struct FakeState {
    calls: CallCounts,
    send_script: VecDeque<SendScript>,
    sent: Vec<SentMessage>,
    created: Vec<NewSession>,
    snapshots_at_send: Vec<PanelSnapshot>,
    observer: Option<watch::Receiver<PanelSnapshot>>,
}

#[derive(Default)]
pub struct FakeChatApi {
    sessions: Vec<SessionRecord>,
    histories: HashMap<SessionId, Vec<MessageRecord>>,
    fail_list_sessions: bool,
    fail_init: bool,
    fail_create: bool,
    stall_list_messages: bool,
    created_session_id: Option<SessionId>,
    state: Mutex<FakeState>,
}

pub fn segment_id(raw: &str) -> SegmentId {
    SegmentId::parse(raw).expect("valid segment id")
}

pub fn session_id(raw: &str) -> SessionId {
    SessionId::parse(raw).expect("valid session id")
}

pub fn user_id(raw: &str) -> UserId {
    UserId::parse(raw).expect("valid user id")
}

pub fn message_id(raw: &str) -> MessageId {
    MessageId::parse(raw).expect("valid message id")
}

pub fn session_record(id: &str, created_day: Option<u32>) -> SessionRecord {
    SessionRecord {
        id: session_id(id),
        segment_id: Some(segment_id("S1")),
        user_id: None,
        title: "EV Charging Market".to_string(),
        created_at: created_day.map(|day| Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
        updated_at: None,
    }
}

pub fn user_record(content: &str) -> MessageRecord {
    MessageRecord {
        id: Some(message_id(&format!("id-{content}"))),
        sender: MessageSender::User,
        content: content.to_string(),
        created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    }
}

pub fn system_record(content: &str) -> MessageRecord {
    MessageRecord {
        id: Some(message_id(&format!("id-{content}"))),
        sender: MessageSender::System,
        content: content.to_string(),
        created_at: None,
    }
}

fn service_error(stage: &'static str) -> ChatApiError {
    ChatApiError::UnexpectedStatus {
        stage,
        status: 500,
        body: "scripted failure".to_string(),
    }
}

impl FakeChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(mut self, sessions: Vec<SessionRecord>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_history(mut self, session: &str, messages: Vec<MessageRecord>) -> Self {
        self.histories.insert(session_id(session), messages);
        self
    }

    pub fn with_created_session(mut self, session: &str) -> Self {
        self.created_session_id = Some(session_id(session));
        self
    }

    pub fn with_send_script(self, script: impl IntoIterator<Item = SendScript>) -> Self {
        self.lock().send_script.extend(script);
        self
    }

    pub fn failing_list_sessions(mut self) -> Self {
        self.fail_list_sessions = true;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn stalling_list_messages(mut self) -> Self {
        self.stall_list_messages = true;
        self
    }

    /// Records the panel snapshot visible at the moment each send reaches the service.
    pub fn observe(&self, receiver: watch::Receiver<PanelSnapshot>) {
        self.lock().observer = Some(receiver);
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    pub fn created(&self) -> Vec<NewSession> {
        self.lock().created.clone()
    }

    pub fn snapshots_at_send(&self) -> Vec<PanelSnapshot> {
        self.lock().snapshots_at_send.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ChatApi for FakeChatApi {
    fn init_segment<'a>(&'a self, _segment_id: &'a SegmentId) -> BoxFuture<'a, ChatApiResult<()>> {
        Box::pin(async move {
            self.lock().calls.init_segment += 1;
            if self.fail_init {
                return Err(service_error("init-segment"));
            }
            Ok(())
        })
    }

    fn create_session<'a>(
        &'a self,
        input: NewSession,
    ) -> BoxFuture<'a, ChatApiResult<SessionRecord>> {
        Box::pin(async move {
            {
                let mut state = self.lock();
                state.calls.create_session += 1;
                state.created.push(input.clone());
            }
            if self.fail_create {
                return Err(service_error("create-session"));
            }
            let id = self
                .created_session_id
                .clone()
                .unwrap_or_else(|| session_id("created-session"));
            Ok(SessionRecord {
                id,
                segment_id: Some(input.segment_id),
                user_id: Some(input.user_id),
                title: input.title,
                created_at: Some(Utc::now()),
                updated_at: None,
            })
        })
    }

    fn list_sessions<'a>(
        &'a self,
        _segment_id: &'a SegmentId,
    ) -> BoxFuture<'a, ChatApiResult<Vec<SessionRecord>>> {
        Box::pin(async move {
            self.lock().calls.list_sessions += 1;
            if self.fail_list_sessions {
                return Err(service_error("list-sessions"));
            }
            Ok(self.sessions.clone())
        })
    }

    fn list_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, ChatApiResult<Vec<MessageRecord>>> {
        Box::pin(async move {
            self.lock().calls.list_messages += 1;
            if self.stall_list_messages {
                std::future::pending::<()>().await;
            }
            Ok(self.histories.get(session_id).cloned().unwrap_or_default())
        })
    }

    fn send_message<'a>(
        &'a self,
        segment_id: &'a SegmentId,
        session_id: &'a SessionId,
        content: &'a str,
    ) -> BoxFuture<'a, ChatApiResult<String>> {
        Box::pin(async move {
            let script = {
                let mut state = self.lock();
                state.calls.send_message += 1;
                state.sent.push(SentMessage {
                    segment_id: segment_id.clone(),
                    session_id: session_id.clone(),
                    content: content.to_string(),
                });
                let snapshot = state.observer.as_ref().map(|rx| rx.borrow().clone());
                if let Some(snapshot) = snapshot {
                    state.snapshots_at_send.push(snapshot);
                }
                state.send_script.pop_front()
            };

            match script {
                Some(SendScript::Reply(reply)) => Ok(reply),
                Some(SendScript::Fail) => Err(service_error("send-message")),
                Some(SendScript::Stall) => {
                    std::future::pending::<()>().await;
                    Err(service_error("send-message"))
                }
                None => Ok(format!("echo: {content}")),
            }
        })
    }
}
