//! Typed rooms and room membership.

pub mod access;
pub mod registry;
pub mod types;

pub use access::{ConversationRoomAccess, OpenRoomAccess, RoomAccess};
pub use registry::RoomRegistry;
pub use types::RoomName;
