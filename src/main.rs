use clap::{Parser, Subcommand};
use std::sync::Arc;

use brunobot::application::errors::BotError;
use brunobot::domain::traits::Connection;
use brunobot::infrastructure::adapters::ConsoleConnection;
use brunobot::infrastructure::config::Config;
use brunobot::infrastructure::plugins::{BuiltinLoader, LoaderChain, ModuleLoader, NativeLoader};
use brunobot::plugins::{Lifecycle, ModuleManager};

#[derive(Parser)]
#[command(name = "brunobot")]
#[command(about = "A chat bot with hot-reloadable modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Print the default config
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

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config),
        Commands::Version => {
            println!("brunobot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn run_bot(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path);
    tracing::info!("Starting {}", config.bot.name);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let loader: Arc<dyn ModuleLoader> = Arc::new(
            LoaderChain::new()
                .with(Arc::new(BuiltinLoader::with_defaults()))
                .with(Arc::new(NativeLoader::new(config.modules.directory.clone()))),
        );
        let connection: Arc<dyn Connection> = Arc::new(ConsoleConnection::new(&config.connection));

        // A broken core is fatal; nothing else gets loaded
        let manager = ModuleManager::initialize(config, connection.clone(), loader)?;
        let info = connection.info();
        tracing::info!("Session ready as {} on {}", info.nick, info.server);

        for handle in manager.load_configured() {
            tokio::spawn(async move {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("Module not loaded: {}", e),
                    Err(e) => tracing::error!("Load task failed: {}", e),
                }
            });
        }

        let parser = manager
            .parser()
            .ok_or_else(|| BotError::Internal("parser missing".to_string()))?;
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        parser.run(manager.clone(), stdin).await?;

        if manager.phase() == Lifecycle::Running {
            manager.shutdown(None)?;
        }
        Ok::<(), BotError>(())
    })
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    Ok(())
}
