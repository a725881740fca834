use insight_chat_api::{MessageRecord, SessionRecord};

/// Three-state conversation lifecycle. Ordering follows the only legal direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationPhase {
    /// No session exists for the segment.
    Uninitiated,
    /// A session exists but the user has not sent anything yet.
    Initiated,
    /// At least one user message has been exchanged.
    Active,
}

/// Rejection for a transition that would move the phase backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRegression {
    pub from: ConversationPhase,
    pub to: ConversationPhase,
}

impl ConversationPhase {
    /// Applies a forward transition. Re-entering the current phase is a no-op.
    pub fn advance(self, next: ConversationPhase) -> Result<ConversationPhase, PhaseRegression> {
        if next < self {
            return Err(PhaseRegression {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }

    pub fn accepts_initiate(self) -> bool {
        match self {
            Self::Uninitiated => true,
            Self::Initiated | Self::Active => false,
        }
    }

    pub fn accepts_send(self) -> bool {
        match self {
            Self::Uninitiated => false,
            Self::Initiated | Self::Active => true,
        }
    }
}

/// What the panel is showing: the transient loading affordance or a settled phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PanelStatus {
    #[default]
    Loading,
    Ready(ConversationPhase),
}

impl PanelStatus {
    pub fn phase(self) -> Option<ConversationPhase> {
        match self {
            Self::Loading => None,
            Self::Ready(phase) => Some(phase),
        }
    }

    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Picks the most recently created session.
///
/// Ties keep the earliest entry in backend order; sessions without a creation time sort
/// before any dated session.
pub fn select_latest_session(sessions: &[SessionRecord]) -> Option<&SessionRecord> {
    sessions.iter().fold(None, |latest, candidate| match latest {
        Some(current) if candidate.created_at <= current.created_at => Some(current),
        _ => Some(candidate),
    })
}

/// Resolves the phase from a segment's sessions and the latest session's history.
pub fn resolve_phase(sessions: &[SessionRecord], messages: &[MessageRecord]) -> ConversationPhase {
    match (sessions.is_empty(), messages.is_empty()) {
        (true, _) => ConversationPhase::Uninitiated,
        (false, true) => ConversationPhase::Initiated,
        (false, false) => ConversationPhase::Active,
    }
}
