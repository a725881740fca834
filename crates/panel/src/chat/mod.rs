/// Message model and the append-only log rendered by the panel.
pub mod message;
/// Panel controller: phase lifecycle plus the optimistic send pipeline.
pub mod panel;
/// Conversation phase and the pure resolution rules.
pub mod phase;
pub mod session;

#[cfg(test)]
pub(crate) mod fake_api;

pub use message::{
    Message, MessageLog, SEND_FAILURE_MESSAGE, SESSION_LOAD_FAILURE_MESSAGE, Sender,
};
pub use panel::{ActionRejection, ChatPanel, InitiateOutcome, PanelSnapshot, SendOutcome};
pub use phase::{
    ConversationPhase, PanelStatus, PhaseRegression, resolve_phase, select_latest_session,
};
pub use session::{PanelContext, ResolvedSession, check_session_state};
