// Public modules
pub mod chat_turn;
pub mod completion;
pub mod model;
pub mod role;

// Re-exports
pub use chat_turn::ChatTurn;
pub use completion::{
    CompletionChunk, DEFAULT_MAX_TOKENS_TO_SAMPLE, HUMAN_STOP_SEQUENCE, TextCompletion,
    TextCompletionParams,
};
pub use model::{KnownModel, Model};
pub use role::Role;
