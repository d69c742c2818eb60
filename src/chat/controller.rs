//! The conversation controller.
//!
//! [`ChatController`] owns the message log for one session and the two-phase
//! state machine that gates submissions:
//!
//! ```text
//!            submit(text), text not blank
//!   Idle  ────────────────────────────────▶  AwaitingResponse
//!    ▲                                              │
//!    └──────── reply or failure appended ───────────┘
//! ```
//!
//! Blank submissions are ignored and submissions made while a reply is
//! outstanding are rejected; neither changes the log.  Every exchange outcome,
//! including transport and parse failures, ends with exactly one assistant
//! message appended and the controller back in `Idle`.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::chat::config::{ChatConfig, IdentityBackend};
use crate::client::{AssistantClient, Exchange};
use crate::error::Result;
use crate::identity::{FileStore, IdentityStore, MemoryStore};
use crate::observability::{
    EXCHANGE_DURATION, EXCHANGE_EMPTY_REPLIES, EXCHANGE_ERRORS, EXCHANGE_REQUESTS, SUBMIT_BUSY,
    SUBMIT_IGNORED,
};
use crate::types::{ChatReply, ChatRequest, Message};

/// Where the controller is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready to accept a submission.
    Idle,
    /// An exchange is in flight; submissions are rejected.
    AwaitingResponse,
}

/// What became of a call to [`ChatController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The text was empty or whitespace; nothing happened.
    Ignored,
    /// Another submission is still awaiting its reply; nothing happened.
    Busy,
    /// The utterance was sent and this assistant message was appended.
    ///
    /// The message may be one of the configured fallbacks.
    Replied(Message),
}

/// Aggregated counts for a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Entries in the log, including the welcome message.
    pub message_count: usize,
    /// Utterances accepted.
    pub user_messages: usize,
    /// Assistant entries, including the welcome message and fallbacks.
    pub assistant_messages: usize,
    /// Exchanges that returned a reply with text.
    pub answered: u64,
    /// Exchanges that returned a reply without text.
    pub unanswered: u64,
    /// Exchanges that failed.
    pub failed: u64,
    /// Blank submissions ignored.
    pub ignored: u64,
    /// Submissions rejected while busy.
    pub busy: u64,
}

/// The mutable half of the controller.
#[derive(Debug)]
struct Conversation {
    log: Vec<Message>,
    phase: Phase,
    stats: SessionStats,
}

impl Conversation {
    fn new(welcome: &str) -> Self {
        Self {
            log: vec![Message::assistant(welcome)],
            phase: Phase::Idle,
            stats: SessionStats::default(),
        }
    }

    /// Idle → AwaitingResponse, appending the user's message.
    fn begin(&mut self, text: &str) -> std::result::Result<(), SubmitOutcome> {
        if text.trim().is_empty() {
            self.stats.ignored += 1;
            SUBMIT_IGNORED.click();
            return Err(SubmitOutcome::Ignored);
        }
        if self.phase == Phase::AwaitingResponse {
            self.stats.busy += 1;
            SUBMIT_BUSY.click();
            return Err(SubmitOutcome::Busy);
        }
        self.log.push(Message::user(text));
        self.phase = Phase::AwaitingResponse;
        Ok(())
    }

    /// AwaitingResponse → Idle, appending the assistant's message.
    ///
    /// A resolution that arrives while idle has nothing to answer and is
    /// dropped.
    fn resolve(&mut self, reply: Message) -> Option<Message> {
        if self.phase != Phase::AwaitingResponse {
            tracing::warn!("discarding reply that arrived with no submission outstanding");
            return None;
        }
        self.log.push(reply.clone());
        self.phase = Phase::Idle;
        Some(reply)
    }

    /// AwaitingResponse → Idle without appending anything.
    fn abandon(&mut self) {
        if self.phase == Phase::AwaitingResponse {
            self.phase = Phase::Idle;
        }
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.log.len(),
            user_messages: self.log.iter().filter(|m| m.is_user()).count(),
            assistant_messages: self.log.iter().filter(|m| m.is_assistant()).count(),
            ..self.stats.clone()
        }
    }
}

/// Returns the controller to `Idle` if a submission is dropped before its
/// reply is applied.
struct InFlight<'a> {
    state: &'a Mutex<Conversation>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("submission dropped before its reply; outcome discarded");
            lock(self.state).abandon();
        }
    }
}

fn lock(state: &Mutex<Conversation>) -> MutexGuard<'_, Conversation> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the conversation log for a single session and talks to the assistant.
///
/// The state lock is never held across the exchange, so readers such as
/// [`ChatController::messages`] and [`ChatController::pending`] stay available
/// while a reply is outstanding.
pub struct ChatController<E: Exchange> {
    exchange: E,
    user_id: String,
    no_answer_message: String,
    connection_error_message: String,
    state: Mutex<Conversation>,
}

impl ChatController<AssistantClient> {
    /// Builds a controller that talks HTTP to the configured endpoint.
    ///
    /// The client identity is resolved here, once, from the configured
    /// backend.  Fails when the configuration is invalid or the endpoint is
    /// missing or malformed.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        config.validate()?;
        let client = AssistantClient::with_options(config.require_endpoint()?, config.timeout)?;
        let user_id = match &config.identity {
            IdentityBackend::File(path) => {
                IdentityStore::new(FileStore::new(path)).get_or_create_id()
            }
            IdentityBackend::Memory => IdentityStore::new(MemoryStore::new()).get_or_create_id(),
        };
        Self::new(config, client, user_id)
    }
}

impl<E: Exchange> ChatController<E> {
    /// Creates a controller whose log holds only the welcome message.
    ///
    /// Fails when the configuration would put a blank message in the log.
    pub fn new(config: &ChatConfig, exchange: E, user_id: impl Into<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            exchange,
            user_id: user_id.into(),
            no_answer_message: config.no_answer_message.clone(),
            connection_error_message: config.connection_error_message.clone(),
            state: Mutex::new(Conversation::new(&config.welcome_message)),
        })
    }

    /// Submits one utterance.
    ///
    /// Blank text is ignored and text submitted while a reply is outstanding
    /// is rejected.  Otherwise the user message is appended immediately, the
    /// exchange runs, and exactly one assistant message is appended before
    /// this returns.  Failures never escape: they become the configured
    /// connection-error message.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if let Err(outcome) = lock(&self.state).begin(text) {
            return outcome;
        }
        let guard = InFlight {
            state: &self.state,
            armed: true,
        };

        let request = ChatRequest::new(text, self.user_id.as_str());
        tracing::debug!(chars = text.chars().count(), "sending utterance");
        EXCHANGE_REQUESTS.click();
        let start = Instant::now();
        let result = self.exchange.exchange(&request).await;
        EXCHANGE_DURATION.add(start.elapsed().as_secs_f64());

        let reply = {
            let mut state = lock(&self.state);
            let text = self.reply_text(&mut state.stats, result);
            state.resolve(Message::assistant(text))
        };
        guard.disarm();
        match reply {
            Some(message) => SubmitOutcome::Replied(message),
            None => SubmitOutcome::Ignored,
        }
    }

    /// Chooses the assistant text for an exchange outcome.
    fn reply_text(&self, stats: &mut SessionStats, result: Result<ChatReply>) -> String {
        match result {
            Ok(reply) => match reply.display_text() {
                Some(text) => {
                    stats.answered += 1;
                    tracing::debug!(
                        intent = reply.intent.as_deref().unwrap_or("-"),
                        confidence = reply.confidence.unwrap_or_default(),
                        "assistant replied"
                    );
                    text
                }
                None => {
                    stats.unanswered += 1;
                    EXCHANGE_EMPTY_REPLIES.click();
                    tracing::info!("assistant reply carried no text");
                    self.no_answer_message.clone()
                }
            },
            Err(err) => {
                stats.failed += 1;
                EXCHANGE_ERRORS.click();
                tracing::error!(error = %err, "exchange with assistant failed");
                self.connection_error_message.clone()
            }
        }
    }

    /// A snapshot of the log, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.state).log.clone()
    }

    /// The most recent entry in the log.
    pub fn last_message(&self) -> Option<Message> {
        lock(&self.state).log.last().cloned()
    }

    /// Number of entries in the log.
    pub fn len(&self) -> usize {
        lock(&self.state).log.len()
    }

    /// Always false: the log starts with the welcome message.
    pub fn is_empty(&self) -> bool {
        lock(&self.state).log.is_empty()
    }

    /// True while a reply is outstanding.
    pub fn pending(&self) -> bool {
        self.phase() == Phase::AwaitingResponse
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        lock(&self.state).phase
    }

    /// The client identity sent with every request.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The exchange this controller talks through.
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Current session statistics.
    pub fn stats(&self) -> SessionStats {
        lock(&self.state).stats()
    }
}
