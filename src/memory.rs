//! In-process conversation memory for a single chat session.
//!
//! [`SessionMemory`] owns the ordered turns of one session.  The first turn is
//! always the system prompt, inserted once when the memory is created or
//! reset.  [`ContextWindow`] is the borrowed view sent to the model on each
//! request: the system turn plus the most recent turns.

use crate::types::{ChatTurn, Role};

/// Default number of recent turns sent alongside the system prompt.
pub const DEFAULT_WINDOW_TURNS: usize = 4;

/// Ordered, append-only turns for one session.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    turns: Vec<ChatTurn>,
}

impl SessionMemory {
    /// Creates memory holding only the system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::system(system_prompt)],
        }
    }

    /// Appends a turn at the end.
    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Drops every turn except the system prompt.
    pub fn reset(&mut self) {
        self.turns.truncate(1);
    }

    /// The system prompt turn.
    pub fn system(&self) -> &ChatTurn {
        &self.turns[0]
    }

    /// All turns in insertion order, system prompt first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The most recently appended turn.
    pub fn last(&self) -> &ChatTurn {
        // never empty: construction inserts the system turn and reset keeps it
        &self.turns[self.turns.len() - 1]
    }

    /// Number of turns, counting the system prompt.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when only the system prompt is present.
    pub fn is_empty(&self) -> bool {
        self.turns.len() <= 1
    }

    /// Number of turns with the given role.
    pub fn count(&self, role: Role) -> usize {
        self.turns.iter().filter(|t| t.role() == role).count()
    }

    /// The system turn plus the last `n` turns.
    ///
    /// When there are no more than `n + 1` turns every turn is returned once.
    pub fn window(&self, n: usize) -> ContextWindow<'_> {
        if self.turns.len() <= n + 1 {
            ContextWindow {
                system: &self.turns[0],
                recent: &self.turns[1..],
            }
        } else {
            ContextWindow {
                system: &self.turns[0],
                recent: &self.turns[self.turns.len() - n..],
            }
        }
    }
}

/// The bounded subset of a session sent to the model for one request.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow<'a> {
    system: &'a ChatTurn,
    recent: &'a [ChatTurn],
}

impl<'a> ContextWindow<'a> {
    /// The system prompt turn.
    pub fn system(&self) -> &'a ChatTurn {
        self.system
    }

    /// The recent turns, oldest first.
    pub fn recent(&self) -> &'a [ChatTurn] {
        self.recent
    }

    /// Number of turns in the window, counting the system prompt.
    pub fn len(&self) -> usize {
        1 + self.recent.len()
    }

    /// Always false; a window holds at least the system prompt.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over the system turn followed by the recent turns.
    pub fn iter(&self) -> impl Iterator<Item = &'a ChatTurn> + 'a {
        std::iter::once(self.system).chain(self.recent.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(n: usize) -> SessionMemory {
        let mut memory = SessionMemory::new("be helpful");
        for i in 0..n {
            if i % 2 == 0 {
                memory.append(ChatTurn::human(format!("q{i}")));
            } else {
                memory.append(ChatTurn::assistant(format!("a{i}")));
            }
        }
        memory
    }

    #[test]
    fn new_memory_holds_system_prompt() {
        let memory = SessionMemory::new("be helpful");
        assert_eq!(memory.len(), 1);
        assert!(memory.is_empty());
        assert_eq!(memory.system().role(), Role::System);
        assert_eq!(memory.system().content(), "be helpful");
        assert_eq!(memory.last(), memory.system());
    }

    #[test]
    fn append_preserves_order() {
        let memory = memory_with(5);
        let contents: Vec<_> = memory.turns().iter().map(|t| t.content()).collect();
        assert_eq!(contents, vec!["be helpful", "q0", "a1", "q2", "a3", "q4"]);
        assert_eq!(memory.count(Role::Human), 3);
        assert_eq!(memory.count(Role::Assistant), 2);
    }

    #[test]
    fn append_does_not_deduplicate() {
        let mut memory = SessionMemory::new("s");
        memory.append(ChatTurn::human("same"));
        memory.append(ChatTurn::human("same"));
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn window_returns_everything_when_short() {
        for n in 0..=4 {
            let memory = memory_with(n);
            let window = memory.window(4);
            assert_eq!(window.len(), memory.len());
            assert_eq!(
                window.iter().filter(|t| t.role() == Role::System).count(),
                1
            );
        }
    }

    #[test]
    fn window_is_system_plus_last_n() {
        let memory = memory_with(9);
        let window = memory.window(4);
        assert_eq!(window.len(), 5);
        assert_eq!(window.system().content(), "be helpful");
        let recent: Vec<_> = window.recent().iter().map(|t| t.content()).collect();
        assert_eq!(recent, vec!["a5", "q6", "a7", "q8"]);
    }

    #[test]
    fn window_never_exceeds_bounds() {
        for turns in 0..12 {
            let memory = memory_with(turns);
            for n in 0..8 {
                let window = memory.window(n);
                assert!(window.len() <= memory.len());
                assert!(window.len() <= n + 1);
            }
        }
    }

    #[test]
    fn window_of_zero_is_system_only() {
        let memory = memory_with(3);
        let window = memory.window(0);
        assert_eq!(window.len(), 1);
        assert!(window.recent().is_empty());
    }

    #[test]
    fn reset_keeps_only_system() {
        let mut memory = memory_with(6);
        memory.reset();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.system().content(), "be helpful");
    }
}
