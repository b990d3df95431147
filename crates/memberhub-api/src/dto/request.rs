//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use memberhub_core::error::AppError;
use memberhub_core::types::{PageRequest, UserId};

/// Upper bound on ids accepted by one bulk presence query.
pub const MAX_PRESENCE_QUERY_IDS: usize = 200;

/// Runs `validator` rules and maps failures to a validation error.
pub fn validate<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}

/// Send message request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Message text.
    #[validate(length(min = 1, max = 5000, message = "Message must be 1 to 5000 characters"))]
    pub content: String,
}

/// Create group conversation request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGroupRequest {
    /// Members to add besides the creator.
    #[validate(length(min = 1, max = 100, message = "A group needs 1 to 100 other members"))]
    pub participant_ids: Vec<UserId>,
}

/// Query string of `GET /api/notifications`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotificationListQuery {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Only unread records.
    #[serde(default)]
    pub unread_only: bool,
}

impl NotificationListQuery {
    /// Clamped page request.
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// Query string of `GET /api/presence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceQuery {
    /// Comma-separated member ids.
    #[serde(default)]
    pub user_ids: String,
}

impl PresenceQuery {
    /// Parses the id list, dropping duplicates and blanks.
    pub fn parse_ids(&self) -> Result<Vec<UserId>, AppError> {
        let mut ids: Vec<UserId> = Vec::new();
        for raw in self.user_ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id: UserId = raw
                .parse()
                .map_err(|_| AppError::validation(format!("Invalid user id '{raw}'")))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.len() > MAX_PRESENCE_QUERY_IDS {
            return Err(AppError::validation(format!(
                "At most {MAX_PRESENCE_QUERY_IDS} user ids per query"
            )));
        }
        Ok(ids)
    }
}
