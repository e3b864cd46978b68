use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre::Context};
use hello_echo::{
    Application, GracefulShutdown,
    adapters::check_health,
    config::{AppConfigValidator, ConfigLoader, DEFAULT_CONFIG_DIR},
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Directory holding default.yaml, local.yaml and private.yaml
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,
}

#[derive(Parser, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Probe /healthz of a running server
    Health,
    /// Validate the configuration layers
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve_command(&args.config_dir).await,
        Commands::Health => health_command(&args.config_dir).await,
        Commands::Validate => validate_config_command(&args.config_dir),
    }
}

async fn serve_command(config_dir: &Path) -> Result<()> {
    let config = ConfigLoader::new(config_dir)
        .load()
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;

    let app = Application::initialize(config).context("Failed to initialize application")?;
    tracing_setup::install_global(app.dispatch()).context("Failed to install logger")?;

    tracing::info!(
        config_dir = %config_dir.display(),
        level = %app.config().logging.level,
        format = %app.config().logging.format,
        "Configuration loaded"
    );

    let graceful_shutdown = GracefulShutdown::new();
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!(error = %e, "Signal handler error");
        }
    });

    let running = app
        .start()
        .await
        .context("Failed to start HTTP server")?
        .with_drain_timeout(graceful_shutdown.drain_timeout());

    let result = running.run_until(graceful_shutdown.token()).await;

    if let Some(reason) = graceful_shutdown.reason() {
        tracing::info!(reason = ?reason, "Process exiting");
    }

    result.context("Shutdown completed with errors")
}

async fn health_command(config_dir: &Path) -> Result<()> {
    let config = ConfigLoader::new(config_dir)
        .load()
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;

    check_health(&config.server)
        .await
        .with_context(|| format!("Health check against {} failed", config.server.local_url()))?;

    println!("Health check passed");
    Ok(())
}

fn validate_config_command(config_dir: &Path) -> Result<()> {
    println!("Validating configuration in {}", config_dir.display());

    let config = match ConfigLoader::new(config_dir).load_unchecked() {
        Ok(config) => {
            println!("Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match AppConfigValidator::validate(&config) {
        Ok(()) => {
            println!("Configuration validation: OK");
            println!();
            println!("Configuration Summary:");
            println!("   Listen Address: {}", config.server.address());
            println!(
                "   Timeouts (read/write/idle): {:?} / {:?} / {:?}",
                config.server.read_timeout, config.server.write_timeout, config.server.idle_timeout
            );
            println!(
                "   Logging: {} ({})",
                config.logging.level, config.logging.format
            );
            println!("   Telemetry Enabled: {}", config.telemetry.enabled);
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration validation failed:");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
