use std::io::{self, Write};

use color_print::cformat;

use super::render::{MarkupMode, render_entry};
use super::transcript::Role;
use crate::ask_client::ExchangeError;

/// The narrow surface the chat handler renders through.
pub trait ChatView {
    fn append_message(&mut self, role: Role, text: &str) -> io::Result<()>;

    fn clear_input(&mut self);

    fn scroll_to_end(&mut self) -> io::Result<()>;

    /// Tell the user an exchange failed. Never part of the transcript.
    fn show_failure(&mut self, error: &ExchangeError) -> io::Result<()>;
}

/// Colored line-per-message output for a terminal.
pub struct TerminalView<W: Write> {
    output: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn append_message(&mut self, role: Role, text: &str) -> io::Result<()> {
        let label = match role {
            Role::User => cformat!("<cyan,bold>{}:</>", role.label()),
            Role::Buddy => cformat!("<yellow,bold>{}:</>", role.label()),
        };
        writeln!(self.output, "{} {}", label, text)
    }

    // The line editor hands over a fresh buffer for every prompt.
    fn clear_input(&mut self) {}

    fn scroll_to_end(&mut self) -> io::Result<()> {
        self.output.flush()
    }

    fn show_failure(&mut self, error: &ExchangeError) -> io::Result<()> {
        writeln!(
            self.output,
            "{}",
            cformat!("<red>Solar Buddy did not answer: {}</>", error)
        )?;
        self.output.flush()
    }
}

/// In-memory stand-in for the page's `chat` container.
#[derive(Debug, Default)]
pub struct MarkupView {
    mode: MarkupMode,
    inner_html: String,
    scroll_top: usize,
    input_clears: usize,
    notices: Vec<String>,
}

impl MarkupView {
    pub fn new(mode: MarkupMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn inner_html(&self) -> &str {
        &self.inner_html
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn scroll_height(&self) -> usize {
        self.inner_html.len()
    }

    pub fn input_clears(&self) -> usize {
        self.input_clears
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl ChatView for MarkupView {
    fn append_message(&mut self, role: Role, text: &str) -> io::Result<()> {
        self.inner_html.push_str(&render_entry(role, text, self.mode));
        Ok(())
    }

    fn clear_input(&mut self) {
        self.input_clears += 1;
    }

    fn scroll_to_end(&mut self) -> io::Result<()> {
        self.scroll_top = self.scroll_height();
        Ok(())
    }

    fn show_failure(&mut self, error: &ExchangeError) -> io::Result<()> {
        self.notices.push(error.to_string());
        Ok(())
    }
}
