//! WebSocket wire format: inbound events, outbound envelopes, validation.

pub mod envelope;
pub mod types;
pub mod validator;

pub use envelope::Envelope;
pub use types::InboundEvent;
