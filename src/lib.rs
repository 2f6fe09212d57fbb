//! casechat library.
//!
//! Conversation aggregation for the case management messaging service, plus
//! the backend and terminal session that drive it.

pub mod app;
pub mod backend;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod logging;
pub mod meeting;
pub mod protocol;
pub mod store;
pub mod time;
pub mod validation;
pub mod view;

pub use error::{ChatError, Result};

#[cfg(test)]
mod backend_tests;
#[cfg(test)]
mod integration_tests;
