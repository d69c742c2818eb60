//! Output rendering for the terminal client.
//!
//! Renderers only display values the controller has already computed.

use std::io::{self, Stdout, Write};

use crate::types::{Message, Sender};

/// ANSI escape code for bold text (used for sender labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering conversation output.
pub trait Renderer: Send {
    /// Print one conversation entry.
    fn print_message(&mut self, message: &Message);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called while a reply is outstanding.
    fn print_pending(&mut self) {}
}

/// The label shown in front of a message from `sender`.
pub fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Assistant => "Assistant",
    }
}

/// Formats a message as `Label: text`, optionally with ANSI styling.
pub fn format_message(message: &Message, use_color: bool) -> String {
    let label = sender_label(message.sender());
    if use_color {
        let color = match message.sender() {
            Sender::User => ANSI_GREEN,
            Sender::Assistant => ANSI_CYAN,
        };
        format!("{ANSI_BOLD}{color}{label}:{ANSI_RESET} {}", message.text())
    } else {
        format!("{label}: {}", message.text())
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
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
        }
    }

    /// Flushes stdout to ensure immediate display.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        println!("{}", format_message(message, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }

    fn print_pending(&mut self) {
        if self.use_color {
            print!("{ANSI_DIM}...{ANSI_RESET}\r");
        } else {
            print!("...\r");
        }
        self.flush();
    }
}
