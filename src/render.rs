//! Output rendering for chat streaming.
//!
//! This module provides the renderer trait the chat session reports to, and a
//! plain-text implementation for terminals.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::ModelDescriptor;

/// ANSI escape code for dim text (used for notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for configuration errors).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for completion errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering streaming output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Buffers that redraw the whole reply on each update
pub trait Renderer: Send {
    /// Called when a reply begins streaming.
    fn start_response(&mut self, model: &ModelDescriptor) {
        _ = model;
    }

    /// Called for each fragment, in arrival order.
    ///
    /// `accumulated` is the reply so far, ending with `fragment`.  Append-only
    /// outputs print the fragment; redrawing outputs replace their contents
    /// with the accumulator.
    fn print_text(&mut self, fragment: &str, accumulated: &str);

    /// Called once when the reply completed, with the final text.
    fn finish_response(&mut self, text: &str);

    /// Print a failure of the current turn's request or stream.
    fn print_error(&mut self, error: &str);

    /// Print a configuration problem that blocks turns until fixed.
    fn print_configuration_error(&mut self, error: &str) {
        self.print_error(error);
    }

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self) {}

    /// Returns true if streaming should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer outputs text directly to stdout with optional
/// ANSI escape codes for labels and notices.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    mid_line: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            mid_line: false,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Whether ANSI styling is enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn end_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }

    fn styled(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self, model: &ModelDescriptor) {
        self.end_line();
        println!("{}", self.styled(ANSI_CYAN, &format!("{}:", model.display_name)));
        self.flush();
    }

    fn print_text(&mut self, fragment: &str, _accumulated: &str) {
        print!("{fragment}");
        self.mid_line = !fragment.ends_with('\n');
        self.flush();
    }

    fn finish_response(&mut self, _text: &str) {
        self.end_line();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_line();
        eprintln!("{}", self.styled(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_configuration_error(&mut self, error: &str) {
        self.end_line();
        eprintln!("{}", self.styled(ANSI_YELLOW, &format!("Configuration: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        self.end_line();
        println!("{}", self.styled(ANSI_DIM, info));
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.end_line();
        println!("[interrupted]");
        self.flush();
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
