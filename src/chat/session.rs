//! Core chat session management.
//!
//! [`ChatSession`] owns the conversation memory, the model client and the
//! configuration of one chat.  Each call to [`ChatSession::submit`] runs one
//! exchange to completion: the human turn is recorded, the context window is
//! sent to the model, and the response is shown and recorded.  A failed
//! exchange leaves the human turn in memory and records no assistant turn.

use std::time::{Duration, Instant};

use crate::accumulating_stream::StreamSink;
use crate::chat::config::ChatConfig;
use crate::client::ModelClient;
use crate::error::{Error, Result};
use crate::memory::SessionMemory;
use crate::observability::{EXCHANGE_DURATION, EXCHANGES_COMPLETED, EXCHANGES_FAILED};
use crate::render::Renderer;
use crate::types::{ChatTurn, Model, Role};

/// Where the session is in its current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Waiting for input; nothing has been submitted yet.
    Idle,
    /// The human turn has been recorded.
    Submitted,
    /// The model has been invoked.
    Invoking,
    /// Fragments of a streamed response are arriving.
    Streaming,
    /// The last exchange produced a response.
    Completed,
    /// The last exchange failed.
    Failed,
}

/// How an exchange ended.
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// The model responded; the response was shown and recorded.
    Completed { response: String },
    /// The exchange failed; the error was shown.
    Failed { error: Error },
}

/// The record of one submitted input.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub outcome: ExchangeOutcome,
    pub elapsed: Duration,
}

impl Exchange {
    /// True when the model responded.
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, ExchangeOutcome::Completed { .. })
    }

    /// The response text, if the exchange completed.
    pub fn response(&self) -> Option<&str> {
        match &self.outcome {
            ExchangeOutcome::Completed { response } => Some(response),
            ExchangeOutcome::Failed { .. } => None,
        }
    }

    /// The error, if the exchange failed.
    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            ExchangeOutcome::Completed { .. } => None,
            ExchangeOutcome::Failed { error } => Some(error),
        }
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// Whether responses are streamed.
    pub streaming: bool,
    /// Recent turns sent with each request.
    pub window_turns: usize,
    /// Turns in memory, counting the system prompt.
    pub turn_count: usize,
    /// Human turns in memory.
    pub human_turns: usize,
    /// Assistant turns in memory.
    pub assistant_turns: usize,
    /// Exchanges that produced a response.
    pub exchanges_completed: u64,
    /// Exchanges that failed.
    pub exchanges_failed: u64,
    /// Wall time spent across all exchanges.
    pub total_elapsed: Duration,
}

/// A chat session that manages conversation state and model interactions.
pub struct ChatSession<M: ModelClient> {
    client: M,
    config: ChatConfig,
    memory: SessionMemory,
    state: ExchangeState,
    exchanges_completed: u64,
    exchanges_failed: u64,
    total_elapsed: Duration,
}

impl<M: ModelClient> ChatSession<M> {
    /// Creates a new chat session whose memory holds only the system prompt.
    pub fn new(client: M, config: ChatConfig) -> Self {
        let memory = SessionMemory::new(config.system_prompt.clone());
        Self {
            client,
            config,
            memory,
            state: ExchangeState::Idle,
            exchanges_completed: 0,
            exchanges_failed: 0,
            total_elapsed: Duration::ZERO,
        }
    }

    /// Runs one exchange for `input`.
    ///
    /// Returns `None` for blank input, which is not recorded or sent.  Errors
    /// never escape: they are shown through `renderer` and reported in the
    /// returned [`Exchange`].
    pub async fn submit<R>(&mut self, input: &str, renderer: &mut R) -> Option<Exchange>
    where
        R: Renderer + ?Sized,
    {
        if input.trim().is_empty() {
            return None;
        }
        let start = Instant::now();
        self.memory.append(ChatTurn::human(input));
        self.state = ExchangeState::Submitted;

        let result = self.invoke(renderer).await;
        let elapsed = start.elapsed();
        self.total_elapsed += elapsed;
        EXCHANGE_DURATION.add(elapsed.as_secs_f64());

        let outcome = match result {
            Ok(response) => {
                renderer.print_elapsed(elapsed);
                self.memory.append(ChatTurn::assistant(response.clone()));
                self.state = ExchangeState::Completed;
                self.exchanges_completed += 1;
                EXCHANGES_COMPLETED.click();
                ExchangeOutcome::Completed { response }
            }
            Err(error) => {
                renderer.print_error(&error.to_string());
                self.state = ExchangeState::Failed;
                self.exchanges_failed += 1;
                EXCHANGES_FAILED.click();
                ExchangeOutcome::Failed { error }
            }
        };
        Some(Exchange { outcome, elapsed })
    }

    async fn invoke<R>(&mut self, renderer: &mut R) -> Result<String>
    where
        R: Renderer + ?Sized,
    {
        let window = self.memory.window(self.config.window_turns);
        self.state = ExchangeState::Invoking;
        if self.config.streaming {
            let fragments = self.client.complete_streaming(&window).await?;
            self.state = ExchangeState::Streaming;
            renderer.start_response();
            let text = StreamSink::new().consume(fragments, renderer).await?;
            renderer.finish_response(&text);
            Ok(text)
        } else {
            let text = self.client.complete(&window).await?;
            renderer.start_response();
            renderer.finish_response(&text);
            Ok(text)
        }
    }

    /// Turns streaming on or off for later exchanges.
    pub fn set_streaming(&mut self, streaming: bool) {
        self.config.streaming = streaming;
    }

    /// Whether responses are streamed.
    pub fn streaming(&self) -> bool {
        self.config.streaming
    }

    /// Restarts the session: memory returns to the system prompt and the
    /// exchange counters start over.
    pub fn restart(&mut self) {
        self.memory.reset();
        self.state = ExchangeState::Idle;
        self.exchanges_completed = 0;
        self.exchanges_failed = 0;
        self.total_elapsed = Duration::ZERO;
    }

    /// Shows every non-system turn in insertion order.
    pub fn replay<R>(&self, renderer: &mut R)
    where
        R: Renderer + ?Sized,
    {
        for turn in self.memory.turns() {
            if turn.role() != Role::System {
                renderer.print_turn(turn);
            }
        }
    }

    /// The state of the current or most recent exchange.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// The conversation memory.
    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// The session configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The model client.
    pub fn client(&self) -> &M {
        &self.client
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            streaming: self.config.streaming,
            window_turns: self.config.window_turns,
            turn_count: self.memory.len(),
            human_turns: self.memory.count(Role::Human),
            assistant_turns: self.memory.count(Role::Assistant),
            exchanges_completed: self.exchanges_completed,
            exchanges_failed: self.exchanges_failed,
            total_elapsed: self.total_elapsed,
        }
    }
}
