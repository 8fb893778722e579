//! Courier - chat relay between a game server and a community chat
//! platform.
//!
//! Messages posted in game chat channels appear in linked platform
//! guild channels and the other way around, with mentions, emoji, and
//! attachments rewritten for the receiving side. The host embedding
//! this crate supplies the network collaborators (the [`platform`]
//! traits) and feeds inbound events to [`bridge::RelayEngine`];
//! everything else - link configuration, live edits, verification,
//! routing, content rewriting, and outbound delivery - lives here.

pub mod bridge;
pub mod commands;
pub mod common;
pub mod config;
pub mod links;
pub mod platform;
