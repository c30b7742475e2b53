//! Rendering a context window into a Claude text-completion prompt.
//!
//! The text-completion API takes one string.  The system prompt comes first,
//! followed by alternating `Human:`/`Assistant:` paragraphs, and the prompt
//! ends with an open `Assistant:` turn for the model to complete.  Turns the
//! window starts with before the first human turn are left out, and
//! consecutive turns of one role are joined into a single paragraph.

use crate::memory::ContextWindow;
use crate::types::Role;

/// Marker that opens a human turn.
pub const HUMAN_PREFIX: &str = "\n\nHuman:";

/// Marker that opens an assistant turn.
pub const ASSISTANT_PREFIX: &str = "\n\nAssistant:";

/// Renders the window as a text-completion prompt.
///
/// # Examples
///
/// ```
/// # use bedrock_chat::{ChatTurn, SessionMemory, prompt::render_prompt};
/// let mut memory = SessionMemory::new("Be brief.");
/// memory.append(ChatTurn::human("Hello"));
/// assert_eq!(
///     render_prompt(&memory.window(4)),
///     "Be brief.\n\nHuman: Hello\n\nAssistant:"
/// );
/// ```
pub fn render_prompt(window: &ContextWindow<'_>) -> String {
    let mut prompt = String::new();
    let system = window.system().content().trim();
    if !system.is_empty() {
        prompt.push_str(system);
    }
    let recent = window.recent();
    // The conversation must open with a human turn.
    let first_human = recent
        .iter()
        .position(|turn| turn.role() == Role::Human)
        .unwrap_or(recent.len());
    let mut previous = None;
    for turn in &recent[first_human..] {
        let content = turn.content().trim();
        if previous == Some(turn.role()) {
            // Runs of one role share a paragraph.
            prompt.push('\n');
            prompt.push_str(content);
            continue;
        }
        match turn.role() {
            Role::Human => {
                prompt.push_str(HUMAN_PREFIX);
                prompt.push(' ');
                prompt.push_str(content);
            }
            Role::Assistant => {
                prompt.push_str(ASSISTANT_PREFIX);
                prompt.push(' ');
                prompt.push_str(content);
            }
            Role::System => {
                prompt.push_str("\n\n");
                prompt.push_str(content);
            }
        }
        previous = Some(turn.role());
    }
    if previous != Some(Role::Assistant) {
        prompt.push_str(ASSISTANT_PREFIX);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SessionMemory;
    use crate::types::ChatTurn;

    #[test]
    fn system_only_prompt_opens_assistant_turn() {
        let memory = SessionMemory::new("You are helpful.");
        assert_eq!(
            render_prompt(&memory.window(4)),
            "You are helpful.\n\nAssistant:"
        );
    }

    #[test]
    fn turns_alternate_in_order() {
        let mut memory = SessionMemory::new("sys");
        memory.append(ChatTurn::human("Hello"));
        memory.append(ChatTurn::assistant("Hi there"));
        memory.append(ChatTurn::human("How are you?"));
        assert_eq!(
            render_prompt(&memory.window(4)),
            "sys\n\nHuman: Hello\n\nAssistant: Hi there\n\nHuman: How are you?\n\nAssistant:"
        );
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let mut memory = SessionMemory::new("   ");
        memory.append(ChatTurn::human("Hello"));
        assert_eq!(
            render_prompt(&memory.window(4)),
            "\n\nHuman: Hello\n\nAssistant:"
        );
    }

    #[test]
    fn only_windowed_turns_are_rendered() {
        let mut memory = SessionMemory::new("sys");
        for i in 0..3 {
            memory.append(ChatTurn::human(format!("q{i}")));
            memory.append(ChatTurn::assistant(format!("a{i}")));
        }
        memory.append(ChatTurn::human("q3"));
        let prompt = render_prompt(&memory.window(4));
        assert_eq!(
            prompt,
            "sys\n\nHuman: q2\n\nAssistant: a2\n\nHuman: q3\n\nAssistant:"
        );
        assert!(!prompt.contains("a1"));
        assert!(!prompt.contains("q1"));
    }

    #[test]
    fn window_starting_with_assistant_opens_with_human() {
        let mut memory = SessionMemory::new("sys");
        memory.append(ChatTurn::human("h1"));
        memory.append(ChatTurn::assistant("a1"));
        memory.append(ChatTurn::human("h2"));
        memory.append(ChatTurn::assistant("a2"));
        memory.append(ChatTurn::human("h3"));
        let prompt = render_prompt(&memory.window(4));
        assert!(prompt.starts_with("sys\n\nHuman: h2"));
        assert!(prompt.ends_with("\n\nHuman: h3\n\nAssistant:"));
    }

    #[test]
    fn consecutive_human_turns_share_a_paragraph() {
        let mut memory = SessionMemory::new("sys");
        memory.append(ChatTurn::human("one"));
        memory.append(ChatTurn::human("two"));
        assert_eq!(
            render_prompt(&memory.window(4)),
            "sys\n\nHuman: one\ntwo\n\nAssistant:"
        );
    }

    #[test]
    fn window_without_human_turns_has_no_history() {
        let mut memory = SessionMemory::new("sys");
        memory.append(ChatTurn::human("h1"));
        memory.append(ChatTurn::assistant("a1"));
        assert_eq!(render_prompt(&memory.window(1)), "sys\n\nAssistant:");
    }
}
