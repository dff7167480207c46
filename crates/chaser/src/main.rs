use std::path::PathBuf;

use chaser_core::{ChaseEngine, ConfigManager, Settings, DEFAULT_OSC_PORT};
use clap::Parser;

/// Headless DMX512 chase playback, triggered over OSC.
#[derive(Parser, Debug)]
#[command(name = "chaser")]
#[command(about = "OSC-triggered DMX512 chase playback")]
struct Args {
    /// Path to the config file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// UDP port for the OSC trigger server
    #[arg(long, default_value_t = DEFAULT_OSC_PORT)]
    osc_port: u16,

    /// Serial port override (takes precedence over the config file)
    #[arg(long)]
    port: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ConfigManager::new(Some(args.config));
    let mut settings = config.load().unwrap_or_else(|e| {
        log::error!("{}; starting with default settings", e);
        Settings::default()
    });
    if let Some(port) = args.port {
        settings.com_port = port;
    }
    if let Err(errors) = ConfigManager::validate_settings(&settings) {
        for error in errors {
            log::warn!("config: {}", error);
        }
    }

    let mut engine = ChaseEngine::new(settings, args.osc_port);
    engine.start().await;

    log::info!("chaser running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    engine.shutdown().await;
    Ok(())
}
