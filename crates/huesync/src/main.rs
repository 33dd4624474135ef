use std::path::PathBuf;

use clap::Parser;
use huesync_core::{ConfigManager, HueSync, Settings};

/// Mirror the lights of a Hue room onto OpenRGB devices.
#[derive(Parser, Debug)]
#[command(name = "huesync")]
#[command(about = "Sync Hue light colors to OpenRGB zones")]
struct Args {
    /// Path to the JSON config file (created with defaults if missing)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Hue bridge IP address
    #[arg(long, env = "BRIDGE_IP")]
    bridge_ip: Option<String>,

    /// Hue application key
    #[arg(long, env = "BRIDGE_USERNAME")]
    bridge_username: Option<String>,

    /// Name of the Hue room to mirror
    #[arg(long, env = "BRIDGE_ROOM")]
    bridge_room: Option<String>,

    /// OpenRGB SDK server host
    #[arg(long, env = "OPENRGB_HOST")]
    openrgb_host: Option<String>,

    /// OpenRGB SDK server port
    #[arg(long, env = "OPENRGB_PORT")]
    openrgb_port: Option<u16>,

    /// Render ticks per second
    #[arg(long, env = "UPDATE_RATE")]
    update_rate: Option<f64>,

    /// Color transitions per second
    #[arg(long, env = "TRANSITION_SPEED")]
    transition_speed: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(ip) = self.bridge_ip {
            settings.bridge.ip = ip;
        }
        if let Some(username) = self.bridge_username {
            settings.bridge.username = username;
        }
        if let Some(room) = self.bridge_room {
            settings.bridge.room = room;
        }
        if let Some(host) = self.openrgb_host {
            settings.output.host = host;
        }
        if let Some(port) = self.openrgb_port {
            settings.output.port = port;
        }
        if let Some(rate) = self.update_rate {
            settings.render.update_rate = rate;
        }
        if let Some(speed) = self.transition_speed {
            settings.render.transition_speed = speed;
        }
    }
}

/// `--verbose` only raises this project's crates; HTTP and TLS stay at info
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,huesync=debug,huesync_core=debug"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(args.verbose)),
    )
    .init();

    let mut config = ConfigManager::new(Some(args.config.clone()));
    let mut settings = config.load()?;
    args.apply(&mut settings);
    ConfigManager::validate_settings(&settings)?;

    log::info!(
        "Syncing room '{}' from bridge {} to OpenRGB at {}:{}",
        settings.bridge.room,
        settings.bridge.ip,
        settings.output.host,
        settings.output.port
    );

    let mut sync = HueSync::new(settings)?;
    sync.start().await?;

    let result = sync
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;

    sync.shutdown().await?;
    result
}
