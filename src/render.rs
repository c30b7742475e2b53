//! Output rendering for the chat transcript.
//!
//! A [`Renderer`] draws prior turns, the live assistant response, the elapsed
//! time of each exchange and inline errors.  [`PlainTextRenderer`] writes to a
//! terminal with optional ANSI styling.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::types::{ChatTurn, Role};

/// ANSI escape code for dim text (used for the status line).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the human label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for yellow text (used for the system label).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// The status line shown after an exchange: whole seconds, truncated.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("Time taken: {} seconds", elapsed.as_secs())
}

/// Trait for rendering the chat transcript.
pub trait Renderer: Send {
    /// Print a prior turn, tagged with its role.
    fn print_turn(&mut self, turn: &ChatTurn);

    /// Called before the first text of a new assistant response.
    fn start_response(&mut self) {}

    /// Show the response accumulated so far.
    ///
    /// `text_so_far` always extends the text of the previous call, so calling
    /// this again with the same text shows nothing new.
    fn update_response(&mut self, text_so_far: &str);

    /// Show the complete response and close the assistant bubble.
    fn finish_response(&mut self, text: &str);

    /// Print the elapsed time of an exchange.
    fn print_elapsed(&mut self, elapsed: Duration) {
        self.print_info(&format_elapsed(elapsed));
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    shown: usize,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer over any writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            shown: 0,
            in_response: false,
        }
    }

    /// Consumes the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn styled(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn label(&self, role: Role) -> String {
        let color = match role {
            Role::System => ANSI_YELLOW,
            Role::Human => ANSI_CYAN,
            Role::Assistant => ANSI_GREEN,
        };
        self.styled(color, &format!("{}:", role.label()))
    }

    fn close_response(&mut self) {
        if self.in_response {
            self.write("\n");
            self.in_response = false;
        }
        self.shown = 0;
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_turn(&mut self, turn: &ChatTurn) {
        self.close_response();
        let line = format!("{} {}\n", self.label(turn.role()), turn.content());
        self.write(&line);
    }

    fn start_response(&mut self) {
        self.close_response();
        let label = format!("{} ", self.label(Role::Assistant));
        self.write(&label);
        self.in_response = true;
    }

    fn update_response(&mut self, text_so_far: &str) {
        if !self.in_response {
            self.start_response();
        }
        match text_so_far.get(self.shown..) {
            Some(unseen) => {
                let unseen = unseen.to_string();
                self.write(&unseen);
            }
            None => {
                // the text no longer extends what is on screen; redraw it
                let redraw = format!("\n{text_so_far}");
                self.write(&redraw);
            }
        }
        self.shown = text_so_far.len();
    }

    fn finish_response(&mut self, text: &str) {
        self.update_response(text);
        self.close_response();
    }

    fn print_elapsed(&mut self, elapsed: Duration) {
        self.close_response();
        let line = format!("{}\n", self.styled(ANSI_DIM, &format_elapsed(elapsed)));
        self.write(&line);
    }

    fn print_error(&mut self, error: &str) {
        self.close_response();
        let line = format!("{}\n", self.styled(ANSI_RED, &format!("Error: {error}")));
        self.write(&line);
    }

    fn print_info(&mut self, info: &str) {
        self.close_response();
        let line = format!("{info}\n");
        self.write(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> PlainTextRenderer<Vec<u8>> {
        PlainTextRenderer::with_writer(Vec::new(), false)
    }

    fn output(renderer: PlainTextRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn elapsed_is_whole_seconds() {
        assert_eq!(
            format_elapsed(Duration::from_millis(2_999)),
            "Time taken: 2 seconds"
        );
        assert_eq!(format_elapsed(Duration::ZERO), "Time taken: 0 seconds");
    }

    #[test]
    fn turns_are_role_tagged() {
        let mut r = renderer();
        r.print_turn(&ChatTurn::human("Hello"));
        r.print_turn(&ChatTurn::assistant("Hi there"));
        assert_eq!(output(r), "Human: Hello\nAssistant: Hi there\n");
    }

    #[test]
    fn progressive_updates_write_only_the_unseen_suffix() {
        let mut r = renderer();
        r.start_response();
        r.update_response("Hi ");
        r.update_response("Hi ");
        r.update_response("Hi there");
        r.finish_response("Hi there");
        r.print_elapsed(Duration::from_secs(1));
        assert_eq!(output(r), "Assistant: Hi there\nTime taken: 1 seconds\n");
    }

    #[test]
    fn error_closes_a_partial_response() {
        let mut r = renderer();
        r.update_response("partial");
        r.print_error("Request throttled: slow down");
        assert_eq!(
            output(r),
            "Assistant: partial\nError: Request throttled: slow down\n"
        );
    }

    #[test]
    fn colored_labels() {
        let mut r = PlainTextRenderer::with_writer(Vec::new(), true);
        r.print_turn(&ChatTurn::human("x"));
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, format!("{ANSI_CYAN}Human:{ANSI_RESET} x\n"));
    }
}
