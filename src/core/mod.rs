//! Core types shared by every mamiya module.
//!
//! - [`MamiyaError`] - enumerated failure modes of the engine
//! - [`ErrorContext`] - user-facing wrapper with suggestions, used by the CLI
//! - [`user_friendly_error`] - convert any [`anyhow::Error`] into an [`ErrorContext`]

pub mod error;

pub use error::{ErrorContext, MamiyaError, user_friendly_error};
