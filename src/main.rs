use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use solar_buddy::cli::chat::ChatContext;
use solar_buddy::config::{ClientConfig, RAW_MARKUP_ENV, SERVER_URL_ENV};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(clap::Args, Clone)]
struct SessionArgs {
    /// Question to ask; exits after the answer
    #[arg(short, long)]
    input: Option<String>,

    /// Base URL of the Solar Buddy server
    #[arg(short, long, env = SERVER_URL_ENV)]
    server: Option<String>,

    /// Write the conversation to this HTML file on exit
    #[arg(short, long)]
    transcript: Option<PathBuf>,

    /// Put text into the HTML transcript without escaping it
    #[arg(long, env = RAW_MARKUP_ENV)]
    raw_markup: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat(SessionArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    let args = match cli.command {
        Some(Commands::Chat(args)) => args,
        None => cli.session,
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClientConfig::resolve(args.server.as_deref(), args.raw_markup, args.transcript)?;
    info!("Starting Solar Buddy CLI");

    let interactive = args.input.is_none();
    let mut chat_context = ChatContext::new(io::stdout(), args.input, interactive, config);
    chat_context.run().await
}
