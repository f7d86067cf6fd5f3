pub mod handler;
pub mod prompt;
pub mod render;
pub mod transcript;
pub mod view;

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use eyre::{Result, WrapErr, bail};
use handler::{ChatState, SendOutcome, handle_send};
use prompt::generate_prompt;
use render::render_document;
use rustyline::error::ReadlineError;
use tracing::{debug, info, warn};
use view::TerminalView;

use crate::ask_client::{AskClient, AskTransport};
use crate::config::ClientConfig;

const WELCOME_TEXT: &str = "
Hi, I'm Solar Buddy ☀️ Ask me about solar energy or the weather.

Things to try
• How do solar panels work?
• What's the weather in Abu Dhabi?
• How much energy does the sun produce?

/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
Solar Buddy CLI

/save <file>  Save the conversation as an HTML page
/help         Show this help dialogue
/quit         Quit the application

Ask one question at a time.
";

pub struct ChatContext<W: Write> {
    view: TerminalView<W>,
    input: Option<String>,
    interactive: bool,
    config: ClientConfig,
    state: ChatState,
    transport: Option<Box<dyn AskTransport>>,
}

impl<W: Write> ChatContext<W> {
    pub fn new(output: W, input: Option<String>, interactive: bool, config: ClientConfig) -> Self {
        Self {
            view: TerminalView::new(output),
            input,
            interactive,
            config,
            state: ChatState::new(),
            transport: None,
        }
    }

    /// Use `transport` instead of an HTTP client built from the config.
    pub fn with_transport(mut self, transport: Box<dyn AskTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn output(&mut self) -> &mut W {
        self.view.output()
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        if self.transport.is_none() {
            match AskClient::new(&self.config.server_url) {
                Ok(client) => {
                    info!("Using Solar Buddy at {}", client.endpoint());
                    self.transport = Some(Box::new(client));
                }
                Err(e) => {
                    writeln!(self.output(), "Failed to initialize Solar Buddy client: {}", e)?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        if self.interactive {
            self.print_welcome()?;
        }

        // Non-interactive mode (single question)
        if let Some(input) = self.input.take() {
            return Ok(match self.ask_once(input).await? {
                SendOutcome::Failed(_) => ExitCode::FAILURE,
                SendOutcome::Answered | SendOutcome::Skipped => ExitCode::SUCCESS,
            });
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        self.export_transcript()?;
        Ok(ExitCode::SUCCESS)
    }

    async fn ask_once(&mut self, input: String) -> Result<SendOutcome> {
        self.state.input = input;
        let outcome = self.send().await?;
        self.export_transcript()?;
        Ok(outcome)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output(), "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        let history = prompt::history_path();
        if let Some(path) = &history {
            if rl.load_history(path).is_err() {
                debug!("No history at {}", path.display());
            }
        }

        loop {
            let prompt_text = generate_prompt(None);

            match rl.readline(&prompt_text) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str());
                    }

                    if !self.handle_line(&line).await? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output(), "Error: {}", e)?;
                    break;
                }
            }
        }

        if let Some(path) = &history {
            if let Err(e) = rl.save_history(path) {
                warn!("Could not save history to {}: {}", path.display(), e);
            }
        }

        Ok(())
    }

    /// Returns `false` once the user asked to quit.
    pub async fn handle_line(&mut self, line: &str) -> Result<bool> {
        match line.trim() {
            "/quit" => return Ok(false),
            "/help" => {
                writeln!(self.output(), "{}", HELP_TEXT)?;
            }
            command if command == "/save" || command.starts_with("/save ") => {
                let path = command["/save".len()..].trim();
                if path.is_empty() {
                    writeln!(self.output(), "Usage: /save <file>")?;
                } else {
                    self.save_transcript(Path::new(path))?;
                    writeln!(self.output(), "Conversation saved to {}", path)?;
                }
            }
            _ => {
                self.state.input = line.to_string();
                self.send().await?;
            }
        }

        Ok(true)
    }

    async fn send(&mut self) -> Result<SendOutcome> {
        let transport = match &self.transport {
            Some(transport) => transport,
            None => bail!("Solar Buddy client not initialized"),
        };

        let outcome = handle_send(&mut self.state, &mut self.view, transport.as_ref()).await?;
        Ok(outcome)
    }

    fn save_transcript(&self, path: &Path) -> Result<()> {
        let html = render_document(&self.state.transcript, self.config.markup_mode);
        fs::write(path, html)
            .wrap_err_with(|| format!("Failed to write transcript to {}", path.display()))?;
        info!("Wrote {} entries to {}", self.state.transcript.len(), path.display());
        Ok(())
    }

    fn export_transcript(&self) -> Result<()> {
        match &self.config.transcript_path {
            Some(path) => self.save_transcript(path),
            None => Ok(()),
        }
    }
}
