use clap::{Parser, Subcommand};
use std::sync::Arc;

mod domain;
mod application;
mod infrastructure;
mod modules;

use application::errors::BotError;
use application::services::{BotService, Credentials, RunOutcome};
use domain::traits::{MessagingClient, Store};
use infrastructure::adapters::console::ConsoleClient;
use infrastructure::adapters::discord::DiscordClient;
use infrastructure::config::Config;
use infrastructure::modules::{ModuleCatalog, ModuleLoader};
use infrastructure::storage::JsonStore;

#[derive(Parser)]
#[command(name = "modis")]
#[command(about = "A modular Discord bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Read messages from stdin instead of connecting to Discord
        #[arg(long)]
        console: bool,
    },
    /// List discovered modules and the events they handle
    Modules,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { console } => {
            run_bot(&cli.config, cli.token, console);
        }
        Commands::Modules => {
            list_modules(&cli.config);
        }
        Commands::Version => {
            println!("modis v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        match Config::load(config_path) {
            Ok(mut config) => {
                config.apply_env();
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Config::load_env()
            }
        }
    } else {
        Config::load_env()
    }
}

fn run_bot(config_path: &str, token_override: Option<String>, console: bool) {
    let mut config = load_config(config_path);
    if let Some(token) = token_override {
        config.discord.token = Some(token);
    }

    let credentials = if console {
        // Console mode never authenticates
        config.credentials().unwrap_or_default()
    } else {
        match config.credentials() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    };

    tracing::info!("Starting {}", config.bot.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = rt.block_on(start(&config, credentials, console));

    match result {
        Ok(RunOutcome::Interrupted) | Ok(RunOutcome::Disconnected) => {}
        Ok(outcome) => tracing::debug!("Run ended: {:?}", outcome),
        Err(e) => {
            tracing::error!("Bot failed: {}", e);
            std::process::exit(1);
        }
    }

    // Dropping a runtime with live blocking stdin reads would wait forever
    rt.shutdown_background();
}

/// Build the client and store, then hand control to the bot service
async fn start(config: &Config, credentials: Credentials, console: bool) -> Result<RunOutcome, BotError> {
    let store: Arc<dyn Store> = Arc::new(JsonStore::open(&config.data.path).await?);
    let client: Arc<dyn MessagingClient> = if console {
        Arc::new(ConsoleClient::new())
    } else {
        tracing::debug!("Creating Discord client");
        Arc::new(DiscordClient::new(config.discord.intents))
    };

    let service = BotService::new(
        client,
        store,
        ModuleCatalog::with_builtin(),
        &config.modules.directory,
    );
    service.run(credentials).await
}

fn list_modules(config_path: &str) {
    let config = load_config(config_path);
    let catalog = ModuleCatalog::with_builtin();
    let loader = ModuleLoader::new(&config.modules.directory);

    let table = match loader.load(&catalog) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Failed to load modules: {}", e);
            std::process::exit(1);
        }
    };

    println!("Compiled-in modules: {}", catalog.names().join(", "));
    if table.is_empty() {
        println!("No event handlers found in {}", loader.modules_dir().display());
        return;
    }
    for (event, modules) in table.summary() {
        println!("{:<26} {}", event, modules.join(", "));
    }
}

fn init_config() {
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render config: {}", e),
    }
}
