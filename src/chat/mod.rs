//! Chat application module for interactive conversations with Claude on
//! Bedrock.
//!
//! This module provides a REPL chat interface built on top of the client
//! library. It supports:
//!
//! - Streamed or whole responses, switchable at any time
//! - A bounded context window sent with every request
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation state and model interaction
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SYSTEM_PROMPT};
pub use session::{ChatSession, Exchange, ExchangeOutcome, ExchangeState, SessionStats};
