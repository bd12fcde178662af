use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use radic_chat::{AssistantConfig, HttpChatBackend, OpenAiAssistant, TurnOrchestrator};
use radic_chat_app::{start_server, terminal_chat};

#[derive(Parser)]
#[command(name = "radic-chat")]
#[command(about = "Enrollment assistant chat: HTTP endpoint and terminal client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /api/chat
    Serve {
        #[arg(long, env = "RADIC_BIND_ADDR", default_value = "127.0.0.1:3000")]
        bind: String,

        /// JSON assistant config; environment variables are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Chat with a running server from the terminal
    Chat {
        #[arg(long, env = "RADIC_SERVER_URL", default_value = "http://127.0.0.1:3000")]
        server: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AssistantConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AssistantConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            // Keys usually stay out of config files.
            if config.api_key.is_empty() {
                config.api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            }
            config
        }
        None => AssistantConfig::from_env().context("Failed to read assistant config from environment")?,
    };
    config.validate().map_err(|e| anyhow!("Invalid assistant config: {}", e))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let config = load_config(config.as_ref())?;
            tracing::info!(
                assistant_id = %config.assistant_id,
                base_url = %config.base_url,
                "Loaded assistant config"
            );
            let service = Arc::new(OpenAiAssistant::new(&config)?);
            let orchestrator = TurnOrchestrator::from_config(service, &config);
            start_server(&bind, orchestrator).await?;
        }
        Commands::Chat { server } => {
            let backend = HttpChatBackend::new(&server)?;
            terminal_chat::run(&backend).await?;
        }
    }

    Ok(())
}
