#![deny(unsafe_code)]

//! Conversational side panel attached to a market-research report.
//!
//! The panel resolves which phase the segment's conversation is in, runs the optimistic
//! send pipeline against the chat service, and owns the two layout behaviors that go with
//! it: a drag-resizable width remembered across sessions and wheel arbitration between
//! the panel and the host page.

/// Conversation lifecycle and message exchange.
pub mod chat;
/// Resize and scroll behavior of the open panel.
pub mod layout;
/// Settings loading and the key-value preference store.
pub mod settings;

pub use chat::{
    ActionRejection, ChatPanel, ConversationPhase, InitiateOutcome, Message, PanelContext,
    PanelSnapshot, PanelStatus, SendOutcome, Sender,
};
pub use layout::{PanelLayoutPreference, PanelWidth, ResizeController, ScrollArbiter};
pub use settings::PanelSettings;
