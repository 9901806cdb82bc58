use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use souffle::AppResult;
use souffle::commands::{self, SettingsChanges};
use souffle::demo::FALLBACK_SCENARIO;
use souffle::settings::SettingsStore;
use souffle_gateway::ConversationId;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "souffle")]
#[command(about = "Live reply suggestions for support conversations", long_about = None)]
struct Cli {
    /// Settings file to read instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a conversation's suggestion feed and print finished suggestions.
    Watch(WatchArgs),
    /// Post a customer message to a conversation.
    Simulate(SimulateArgs),
    /// Replace the operator notes of a conversation.
    Context(ContextArgs),
    /// Replay keystrokes over a canned scenario.
    Demo(DemoArgs),
    /// Show or change the saved settings.
    Config(ConfigArgs),
}

#[derive(Args)]
struct WatchArgs {
    /// Conversation to follow. Defaults to the first one, created if needed.
    #[arg(long)]
    chat: Option<String>,
}

#[derive(Args)]
struct SimulateArgs {
    #[arg(long)]
    chat: String,
    text: String,
}

#[derive(Args)]
struct ContextArgs {
    #[arg(long)]
    chat: String,
    text: String,
}

#[derive(Args)]
struct DemoArgs {
    /// `suivi`, `retour` or `garantie`.
    #[arg(default_value = FALLBACK_SCENARIO)]
    scenario: String,

    /// Space-separated keystrokes, e.g. "ctrl-tab tab".
    #[arg(long, default_value = "")]
    keys: String,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    request_timeout_secs: Option<u64>,
    #[arg(long)]
    placeholder: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut store = match cli.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };
    let settings = store.settings().clone();

    match cli.command {
        Commands::Watch(args) => {
            let gateway = commands::http_gateway(&settings)?;
            let transport = commands::sse_transport(&settings)?;
            commands::watch(
                &gateway,
                transport,
                &settings.placeholder,
                commands::chat_argument(args.chat.as_deref()),
                async {
                    if let Err(error) = tokio::signal::ctrl_c().await {
                        tracing::warn!("failed to listen for ctrl-c: {error}");
                    }
                },
                |suggestion| {
                    println!("{}", suggestion.text);
                },
            )
            .await
        }
        Commands::Simulate(args) => {
            let gateway = commands::http_gateway(&settings)?;
            let chat_id = ConversationId::from(args.chat);
            match commands::simulate(&gateway, &chat_id, &args.text).await? {
                Some(message) => println!("{}", message.id),
                None => tracing::warn!("empty message, nothing sent"),
            }
            Ok(())
        }
        Commands::Context(args) => {
            let gateway = commands::http_gateway(&settings)?;
            commands::set_context(&gateway, &ConversationId::from(args.chat), &args.text).await
        }
        Commands::Demo(args) => {
            let report = commands::demo(&args.scenario, &args.keys, &settings.placeholder)?;
            for event in &report.events {
                tracing::info!(?event, "ghost input event");
            }
            println!("{}", report.value);
            if let Some(accepted) = &report.accepted {
                for line in commands::source_lines(accepted) {
                    println!("  - {line}");
                }
            }
            Ok(())
        }
        Commands::Config(args) => {
            let settings = commands::configure(
                &mut store,
                SettingsChanges {
                    api_base_url: args.api_base_url,
                    request_timeout_secs: args.request_timeout_secs,
                    placeholder: args.placeholder,
                },
            )?;
            println!("settings file: {}", store.config_path().display());
            println!("api_base_url = {}", settings.api_base_url);
            println!("request_timeout_secs = {}", settings.request_timeout_secs);
            println!("placeholder = {}", settings.placeholder);
            Ok(())
        }
    }
}
