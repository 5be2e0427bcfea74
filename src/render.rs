//! Output rendering for chat streaming.
//!
//! The session pushes assistant text through a [`Renderer`] as it arrives so
//! that a terminal, a test harness, or anything else can display it.

use std::io::{self, Stdout, Write};

/// ANSI escape code for orange text (used for speaker labels).
const ANSI_ORANGE: &str = "\x1b[38;5;208m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for dim text (used for informational output).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering streaming output.
pub trait Renderer: Send {
    /// Print a speaker label such as `User: ` or `Assistant: `.
    fn print_label(&mut self, label: &str);

    /// Print a chunk of assistant text.
    ///
    /// This is called incrementally as tokens are streamed from the API.
    fn print_text(&mut self, text: &str);

    /// Print an informational message on its own line.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines after streaming.
    fn finish_response(&mut self);

    /// Called when the user interrupts a response.
    fn print_interrupted(&mut self) {
        self.print_info("[interrupted]");
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write = Stdout> {
    out: W,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write> PlainTextRenderer<W> {
    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            line_start: true,
        }
    }

    /// Consumes the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    // Terminal write failures are not actionable mid-stream.
    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.line_start = text.ends_with('\n');
    }

    fn styled(&mut self, style: &str, text: &str) {
        if self.use_color {
            let styled = format!("{style}{text}{ANSI_RESET}");
            self.write(&styled);
            self.line_start = text.ends_with('\n');
        } else {
            self.write(text);
        }
    }

    fn ensure_line_start(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_label(&mut self, label: &str) {
        self.styled(ANSI_ORANGE, label);
    }

    fn print_text(&mut self, text: &str) {
        self.write(text);
    }

    fn print_info(&mut self, info: &str) {
        self.ensure_line_start();
        self.styled(ANSI_DIM, &format!("{info}\n"));
    }

    fn print_error(&mut self, error: &str) {
        self.ensure_line_start();
        self.styled(ANSI_RED, &format!("Error: {error}\n"));
    }

    fn finish_response(&mut self) {
        self.write("\n");
    }
}
