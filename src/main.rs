use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use quickterm::config::Config;
use quickterm::core::quickterm::{exec_login_shell, forward_args};
use quickterm::core::{environment, Quickterm};
use quickterm::ipc::SwayClient;

#[derive(Parser)]
#[command(name = "quickterm")]
#[command(about = "Drop-down scratchpad terminal for i3 and Sway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (default: ~/.config/quickterm/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Set up the current window as the quickterm and exec a login shell
    #[arg(short, long)]
    in_place: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Show the terminal, or hide it when it is on the focused workspace
    Toggle,
    /// Show the terminal on the focused workspace
    Show,
    /// Move the terminal to the scratchpad
    Hide,
    /// Print where the terminal currently is
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("quickterm={log_level}"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).await?;
    let config_path = cli.config.as_deref().map(Config::resolve_path);
    debug!("📋 Effective config: {}", serde_json::to_string(&config)?);

    let wm = environment::detect().await?;
    info!("🪟 Running under {}", wm);

    let client = SwayClient::connect()
        .await
        .with_context(|| format!("Failed to connect to {wm}"))?;
    let log_flag = if cli.debug {
        Some("--debug")
    } else if cli.verbose {
        Some("--verbose")
    } else {
        None
    };
    let forwarded = forward_args(config_path.as_deref(), log_flag);
    let mut quickterm = Quickterm::new(client, config, forwarded)?;

    if cli.in_place {
        quickterm
            .prepare_in_place()
            .await
            .context("Failed to launch in place")?;
        let shell = quickterm.config().resolve_shell();
        return Err(exec_login_shell(&shell));
    }

    let outcome = match cli.command.unwrap_or(Commands::Toggle) {
        Commands::Toggle => quickterm.toggle().await.context("Failed to toggle terminal")?,
        Commands::Show => quickterm.show().await.context("Failed to show terminal")?,
        Commands::Hide => quickterm.hide().await.context("Failed to hide terminal")?,
        Commands::Status => {
            let status = quickterm.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }
    };

    info!("✅ {}", outcome);
    Ok(())
}
