//! obs-ctl: command-line remote control for OBS Studio.
//!
//! Connects to the tool's WebSocket control endpoint, waits for the
//! handshake, runs one command, and disconnects.  `watch` instead stays
//! connected and logs recording and scene changes until Ctrl+C, riding out
//! restarts of the tool through the client's automatic reconnect.
//!
//! # Usage
//!
//! ```text
//! obs-ctl [OPTIONS] <COMMAND>
//!
//! Commands:
//!   status        Show whether the tool is reachable and recording
//!   scenes        List scene names
//!   set-scene     Switch the program scene
//!   start-record  Start recording
//!   stop-record   Stop recording
//!   watch         Log events until Ctrl+C
//!
//! Options:
//!   --config <PATH>       TOML config file            [env: OBS_CONFIG]
//!   --url <URL>           WebSocket URL               [env: OBS_URL]
//!   --password <SECRET>   Authentication password     [env: OBS_PASSWORD]
//!   --wait-secs <SECS>    Handshake wait              [default: 10]
//!   --log-level <LEVEL>   Log level when RUST_LOG is unset
//! ```
//!
//! Precedence: command-line flag, then environment variable, then config
//! file, then built-in default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use obs_client::infrastructure::config_file::FileConfig;
use obs_client::{ConnectionConfig, ObsClient};
use obs_core::protocol::requests::{
    RecordStateChanged, EVENT_CURRENT_PROGRAM_SCENE_CHANGED, EVENT_EXIT_STARTED,
    EVENT_RECORD_STATE_CHANGED,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "obs-ctl",
    about = "Remote control for OBS Studio over its WebSocket protocol",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "OBS_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket URL of the tool, e.g. ws://localhost:4455.
    #[arg(long, env = "OBS_URL")]
    url: Option<String>,

    /// Password for the authentication handshake.
    #[arg(long, env = "OBS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds to wait for the handshake before giving up.
    #[arg(long, default_value_t = 10)]
    wait_secs: u64,

    /// Log level used when RUST_LOG is not set.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Show whether the tool is reachable and recording.
    Status,
    /// List scene names in the tool's order.
    Scenes,
    /// Switch the program output to a scene.
    SetScene {
        /// Scene name, exactly as listed by `scenes`.
        name: String,
    },
    /// Start recording.
    StartRecord,
    /// Stop recording.
    StopRecord,
    /// Stay connected and log recording and scene events until Ctrl+C.
    Watch,
}

impl Cli {
    /// Merges the config file (if any) with command-line overrides.
    ///
    /// Returns the connection settings and the log level to use.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be read or parsed, or if the merged
    /// settings are invalid.
    fn resolve(&self) -> anyhow::Result<(ConnectionConfig, String)> {
        let mut file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => FileConfig::default(),
        };

        if let Some(url) = &self.url {
            file.obs.url = url.clone();
        }
        if let Some(password) = &self.password {
            file.obs.password = Some(password.clone());
        }
        let log_level = self.log_level.clone().unwrap_or(file.log_level.clone());

        let config = file
            .to_connection_config()
            .context("invalid connection settings")?;
        Ok((config, log_level))
    }
}

// ── Event logging ─────────────────────────────────────────────────────────────

/// Logs the events an operator cares about.
fn register_log_handlers(client: &ObsClient) {
    client.on_event(EVENT_RECORD_STATE_CHANGED, |data| {
        match serde_json::from_value::<RecordStateChanged>(data) {
            Ok(change) if change.output_active => info!("recording started"),
            Ok(change) => match change.output_path {
                Some(path) => info!("recording stopped, saved to {path}"),
                None => info!("recording stopped"),
            },
            Err(e) => warn!("unreadable {EVENT_RECORD_STATE_CHANGED} event: {e}"),
        }
    });

    client.on_event(EVENT_CURRENT_PROGRAM_SCENE_CHANGED, |data| {
        let scene = data
            .get("sceneName")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>");
        info!("program scene changed to {scene}");
    });

    client.on_event(EVENT_EXIT_STARTED, |_| {
        info!("OBS is shutting down");
    });
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run(client: &ObsClient, command: &Command, wait: Duration) -> anyhow::Result<()> {
    if *command == Command::Watch {
        info!("watching events from {} (Ctrl+C to stop)", client.config().url);
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        info!("received Ctrl+C, shutting down");
        return Ok(());
    }

    if let Err(e) = client.wait_until_identified(wait).await {
        if *command == Command::Status {
            println!("connected: false");
            println!("recording: false");
            return Ok(());
        }
        return Err(e).context(format!("could not reach {}", client.config().url));
    }

    match command {
        Command::Status => {
            let recording = client.is_recording().await.unwrap_or_else(|e| {
                warn!("could not read recording status: {e}");
                false
            });
            println!("connected: true");
            println!("recording: {recording}");
        }
        Command::Scenes => {
            for scene in client.list_scenes().await.context("GetSceneList failed")? {
                println!("{scene}");
            }
        }
        Command::SetScene { name } => {
            client
                .set_current_scene(name)
                .await
                .with_context(|| format!("could not switch to scene '{name}'"))?;
            info!("program scene set to {name}");
        }
        Command::StartRecord => {
            client.start_recording().await.context("StartRecord failed")?;
            info!("recording started");
        }
        Command::StopRecord => {
            client.stop_recording().await.context("StopRecord failed")?;
            info!("recording stopped");
        }
        Command::Watch => {}
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, log_level) = cli.resolve()?;

    // RUST_LOG wins over --log-level / the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    info!("obs-ctl starting: url={}", config.url);

    let client = ObsClient::new(config);
    register_log_handlers(&client);
    client.connect().await;

    let result = run(&client, &cli.command, Duration::from_secs(cli.wait_secs)).await;
    client.close().await;

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommands_parse() {
        let cases = [
            (vec!["obs-ctl", "status"], Command::Status),
            (vec!["obs-ctl", "scenes"], Command::Scenes),
            (vec!["obs-ctl", "start-record"], Command::StartRecord),
            (vec!["obs-ctl", "stop-record"], Command::StopRecord),
            (vec!["obs-ctl", "watch"], Command::Watch),
        ];
        for (args, expected) in cases {
            assert_eq!(Cli::parse_from(args).command, expected);
        }
    }

    #[test]
    fn test_set_scene_takes_name() {
        // Arrange / Act
        let cli = Cli::parse_from(["obs-ctl", "set-scene", "Interview"]);

        // Assert
        assert_eq!(
            cli.command,
            Command::SetScene {
                name: "Interview".to_string()
            }
        );
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["obs-ctl"]).is_err());
    }

    #[test]
    fn test_default_wait_is_ten_seconds() {
        let cli = Cli::parse_from(["obs-ctl", "status"]);
        assert_eq!(cli.wait_secs, 10);
    }

    #[test]
    fn test_url_flag_overrides_default() {
        // Arrange
        let cli = Cli::parse_from(["obs-ctl", "--url", "ws://10.0.0.5:4455", "status"]);

        // Act
        let (config, _) = cli.resolve().unwrap();

        // Assert
        assert_eq!(config.url, "ws://10.0.0.5:4455");
    }

    #[test]
    fn test_password_flag_is_applied() {
        let cli = Cli::parse_from(["obs-ctl", "--password", "secret", "status"]);
        let (config, _) = cli.resolve().unwrap();
        assert_eq!(config.password(), Some("secret"));
    }

    #[test]
    fn test_log_level_flag_overrides_file_default() {
        let cli = Cli::parse_from(["obs-ctl", "--log-level", "debug", "status"]);
        let (_, level) = cli.resolve().unwrap();
        assert_eq!(level, "debug");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let cli = Cli::parse_from(["obs-ctl", "--url", "localhost:4455", "status"]);
        assert!(cli.resolve().is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from([
            "obs-ctl",
            "--config",
            "/nonexistent/obs-ctl.toml",
            "status",
        ]);
        assert!(cli.resolve().is_err());
    }
}
