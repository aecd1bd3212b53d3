mod broadcaster;
mod cleanup_task;
mod history;
mod message_handler;
mod poll_handler;
mod retention;
mod room_store;
mod server_config;
mod web_server;
mod ws_handler;

use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use common::games::SessionRng;
use common::config::{ConfigManager, FileContentConfigProvider, Validate};
use common::protocol::ServerMessage;
use common::{log, log_error, logger};

use broadcaster::Broadcaster;
use cleanup_task::CleanupTask;
use history::HistoryStore;
use message_handler::MessageHandler;
use retention::policy_for_timeout;
use room_store::RoomStore;
use server_config::{ServerConfig, DEFAULT_CONFIG_PATH};
use web_server::{run_web_server, WebServerState};

#[derive(Parser)]
#[command(name = "grid_strike_server")]
struct Args {
    /// YAML config file; defaults are used when it does not exist.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long)]
    use_log_prefix: bool,

    /// Overrides `bind_address` from the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Writes the default config to `--config` and exits.
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Server".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config_manager: ConfigManager<FileContentConfigProvider, ServerConfig> =
        ConfigManager::from_yaml_file(args.config.clone());

    if args.write_default_config {
        config_manager.set_config(&ServerConfig::default())?;
        log!("Default config written to {}", args.config.display());
        return Ok(());
    }

    let mut config = config_manager.get_config()?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
        config.validate()?;
    }

    let rng = SessionRng::from_random();
    log!("Room id generator seed: {}", rng.seed());
    let rooms = RoomStore::with_rng(policy_for_timeout(config.room_idle_timeout()), rng);
    log!("Room retention: {}", rooms.retention_description());

    let history = HistoryStore::new(config.history_capacity);
    let broadcaster = Broadcaster::new();
    let handler = MessageHandler::new(rooms.clone(), history);

    let cleanup_task = CleanupTask::new(rooms, broadcaster.clone(), config.cleanup_interval());
    tokio::spawn(async move {
        cleanup_task.run().await;
    });

    let state = WebServerState {
        handler,
        broadcaster: broadcaster.clone(),
    };

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }

        log!("Shutdown signal received, notifying clients...");

        broadcaster
            .broadcast_to_all(ServerMessage::ServerShuttingDown {
                message: "Server is shutting down".to_string(),
            })
            .await;

        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    run_web_server(state, &config, shutdown_signal).await?;

    log!("Server shut down gracefully");

    Ok(())
}
