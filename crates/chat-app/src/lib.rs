//! Live chat client core.
//!
//! A session joins a room keyed by a persisted identifier, replays the room's
//! history, and exchanges one message at a time with a remote agent.

#![deny(unsafe_code)]

/// Terminal front-end wiring.
pub mod app;
/// In-process channel, wire codec and loopback agent.
pub mod channel;
/// Protocol handling, transcript and input.
pub mod chat;
/// Settings persistence.
pub mod settings;
