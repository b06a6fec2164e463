//! External service implementations.
//!
//! This module contains provider traits and implementations for external services:
//!
//! - [`directory`] - Email directory backends (REST, in-memory)

pub mod directory;
