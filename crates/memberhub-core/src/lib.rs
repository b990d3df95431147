//! # memberhub-core
//!
//! Core crate for the MemberHub real-time communication service. Contains
//! configuration schemas, typed identifiers, pagination types, the clock
//! abstraction used by presence tracking, and the unified error system.
//!
//! This crate has **no** internal dependencies on other MemberHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
