//! Streaming bridge between a chat client and hosted AI agent backends.
//!
//! One backend is selected at start-up. Its vendor stream is re-encoded into a
//! single canonical SSE protocol so the client never sees vendor formats.

pub mod agent;
pub mod config;
pub mod http;
pub mod logger;
