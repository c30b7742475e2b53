// Public modules
pub mod accumulating_stream;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod credentials;
pub mod error;
pub mod event_stream;
pub mod memory;
pub mod observability;
pub mod prompt;
pub mod render;
pub mod sigv4;
pub mod types;
pub mod utils;

// Re-exports
pub use accumulating_stream::StreamSink;
pub use client::{Bedrock, DEFAULT_REGION, FragmentStream, ModelClient};
pub use client_logger::{ClientLogger, StderrLogger};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use memory::{ContextWindow, DEFAULT_WINDOW_TURNS, SessionMemory};
pub use observability::{counter_readings, register_biometrics};
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
