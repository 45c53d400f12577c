//! MedTrack interactive shell.

mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use medtrack_core::{expiry, MedTrackConfig, MedicineCabinet};
use medtrack_llm::GeminiClient;

use shell::{Flow, Shell};

#[derive(Parser, Debug)]
#[command(
    name = "medtrack",
    about = "Track medicine expiry dates and patient medical documents."
)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start with sample medicines
    #[arg(long)]
    demo: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => MedTrackConfig::load_from(path)
            .with_context(|| format!("could not load {}", path.display()))?,
        None => MedTrackConfig::load()?,
    };

    let client = GeminiClient::new(config.client_config());
    tracing::debug!(model = %client.config().model, "extraction client ready");
    if !client.has_credentials() {
        eprintln!("No API key configured (set GEMINI_API_KEY); uploads will ask for the patient name.");
    }

    let cabinet = if args.demo {
        MedicineCabinet::with_samples(expiry::today())
    } else {
        MedicineCabinet::new()
    };

    let mut shell = Shell::new(cabinet, client);
    println!("MedTrack. Type 'help' for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        let prompt = if shell.awaiting_name() { "name> " } else { "medtrack> " };
        print!("{prompt}");
        stdout.flush()?;

        let Some(line) = lines.next() else { break };
        let line = line.context("could not read input")?;

        match shell.handle_line(&line, &mut stdout).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }

    Ok(())
}
