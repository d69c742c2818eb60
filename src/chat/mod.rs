//! Conversation control for a single chat session.
//!
//! This module holds the pieces between the user's keyboard and the
//! assistant endpoint:
//!
//! - [`controller`]: the conversation log and the Idle / AwaitingResponse
//!   state machine that gates submissions
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing for the terminal client

mod commands;
mod config;
pub mod controller;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    ChatArgs, ChatConfig, ConfigFile, DEFAULT_CONNECTION_ERROR_MESSAGE, DEFAULT_NO_ANSWER_MESSAGE,
    DEFAULT_WELCOME_MESSAGE, ENDPOINT_ENV, IdentityBackend,
};
pub use controller::{ChatController, Phase, SessionStats, SubmitOutcome};
