//! Conversation ledger.

pub mod ledger;

pub use ledger::ConversationLedger;
