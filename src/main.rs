use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use glance_gateway::Config;
use glance_gateway::api::{ApiServer, ApiState};
use glance_gateway::conversation::build_prompt;
use glance_gateway::display::{ConsoleDisplay, DisplayOptions, DisplaySink};
use glance_gateway::llm::LanguageModel;
use glance_gateway::session::{Assistant, HostCredentials, SessionLauncher};

/// Glance - calendar and conversation assistant for smart glasses
#[derive(Parser)]
#[command(name = "glance", version, about)]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve host webhooks (default)
    Serve,
    /// Print the next upcoming calendar event
    Next,
    /// Print today's agenda
    Agenda,
    /// Ask the language model a one-off question
    Ask {
        /// Question to ask
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env before clap so env-backed settings see it
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,glance_gateway=info",
        1 => "info,glance_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.port)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Next => cmd_next(&config).await,
        Command::Agenda => cmd_agenda(&config).await,
        Command::Ask { prompt } => cmd_ask(&config, &prompt).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        app = %config.host.package_name,
        port = config.api_server.port,
        model = %config.llm.model,
        timezone = %config.calendar.timezone,
        "starting glance gateway"
    );

    let assistant = Arc::new(Assistant::from_config(&config));
    let credentials = HostCredentials {
        package_name: config.host.package_name.clone(),
        api_key: config.host.api_key.clone(),
    };

    let state = ApiState {
        package_name: config.host.package_name.clone(),
        sessions: SessionLauncher::new(assistant, credentials),
    };

    ApiServer::new(state, config.api_server.port).run().await?;

    Ok(())
}

async fn cmd_next(config: &Config) -> anyhow::Result<()> {
    let assistant = Assistant::from_config(config);
    let text = assistant.calendar().next_event_text().await?;

    ConsoleDisplay
        .show_text(&text, DisplayOptions::main_for(config.display.calendar_duration))
        .await?;
    Ok(())
}

async fn cmd_agenda(config: &Config) -> anyhow::Result<()> {
    let assistant = Assistant::from_config(config);
    let text = assistant.calendar().agenda_text().await?;

    ConsoleDisplay
        .show_text(&text, DisplayOptions::main_for(config.display.calendar_duration))
        .await?;
    Ok(())
}

async fn cmd_ask(config: &Config, prompt: &str) -> anyhow::Result<()> {
    let assistant = Assistant::from_config(config);
    let answer = assistant.model().generate(&build_prompt(prompt, &[])).await?;

    ConsoleDisplay
        .show_text(&answer, DisplayOptions::main_for(config.display.answer_duration))
        .await?;
    Ok(())
}
