//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session and is never sent to the
//! model.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Turn streamed responses on or off.
    Stream(bool),

    /// Restart the session, keeping only the system prompt.
    Clear,

    /// Replay the transcript of the current session.
    History,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use bedrock_chat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/stream off"), Some(ChatCommand::Stream(false)));
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("Hello, Claude!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "stream" => match argument {
            Some(arg) => match parse_on_off(arg) {
                Some(value) => ChatCommand::Stream(value),
                None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
            },
            None => ChatCommand::Invalid("/stream requires 'on' or 'off'".to_string()),
        },
        "clear" | "reset" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "" => ChatCommand::Invalid("Empty command; try /help".to_string()),
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /stream on|off         Stream responses as they are generated
  /clear                 Restart the session (keeps the system prompt)
  /history               Replay the conversation so far
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
