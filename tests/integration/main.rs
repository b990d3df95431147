//! Workspace integration tests, run on the in-memory backend.

mod helpers;

mod conversation_test;
mod end_to_end_test;
mod notification_test;
mod presence_test;
mod ws_test;
