//! Room names and parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use memberhub_core::AppError;
use memberhub_core::types::{ConversationId, UserId};

/// A typed room. On the wire it is `<kind>:<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomName {
    /// Private room of one member: notifications, message pushes, counts.
    User(UserId),
    /// Presence updates about one member.
    Presence(UserId),
    /// Live messages of one conversation.
    Conversation(ConversationId),
}

impl RoomName {
    /// Parses `user:<id>`, `presence:<id>` or `conversation:<id>`.
    pub fn parse(room: &str) -> Result<Self, AppError> {
        let invalid = || AppError::validation(format!("Invalid room name: {room}"));
        let parts: Vec<&str> = room.splitn(2, ':').collect();
        match parts.as_slice() {
            ["user", id] => id.parse().map(Self::User).map_err(|_| invalid()),
            ["presence", id] => id.parse().map(Self::Presence).map_err(|_| invalid()),
            ["conversation", id] => id.parse().map(Self::Conversation).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    /// The kind prefix.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Presence(_) => "presence",
            Self::Conversation(_) => "conversation",
        }
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) | Self::Presence(id) => write!(f, "{}:{id}", self.kind()),
            Self::Conversation(id) => write!(f, "{}:{id}", self.kind()),
        }
    }
}

impl FromStr for RoomName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RoomName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|e| serde::de::Error::custom(e.message))
    }
}
