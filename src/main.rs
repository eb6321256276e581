//! Workdistro notification CLI - watches the realtime notification feed.
//!
//! This is the main binary entry point. See the `workdistro_notify`
//! library for the channel itself.

use std::time::Duration;

use anyhow::{Context, Result};
use mimalloc::MiMalloc;
use workdistro_notify::{
    Config, MessageLog, Notification, NotificationChannel, NotificationEvent, SharedStatus,
};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
/// mimalloc provides better multi-threaded performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use clap::{Parser, Subcommand};

/// How long `send` waits for the connection to open before giving up.
const SEND_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

// CLI
#[derive(Parser)]
#[command(name = "workdistro-notify")]
#[command(version)]
#[command(about = "Realtime notification watcher for the Workdistro marketplace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and stream notifications to stdout until Ctrl-C
    Watch {
        /// Recipient role to subscribe as (client or worker)
        #[arg(long)]
        role: Option<String>,
        /// Auth token (overrides WORKDISTRO_TOKEN and the config file)
        #[arg(long)]
        token: Option<String>,
        /// Server endpoint (wss:// or https://)
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Connect, transmit one JSON payload, and exit
    Send {
        /// JSON payload to transmit
        payload: String,
        /// Recipient role to connect as
        #[arg(long)]
        role: Option<String>,
        /// Auth token (overrides WORKDISTRO_TOKEN and the config file)
        #[arg(long)]
        token: Option<String>,
        /// Server endpoint (wss:// or https://)
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Print the effective configuration (token never shown)
    Config {
        /// Persist the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            role,
            token,
            endpoint,
        } => {
            let config = effective_config(role, token, endpoint)?;
            watch(config).await?;
        }
        Commands::Send {
            payload,
            role,
            token,
            endpoint,
        } => {
            let config = effective_config(role, token, endpoint)?;
            send(config, &payload).await?;
        }
        Commands::Config { save } => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("config dir: {}", Config::config_dir()?.display());
            if save {
                config.save()?;
                println!("Saved.");
            }
        }
    }

    Ok(())
}

/// Loads the config file and layers CLI flag overrides on top.
fn effective_config(
    role: Option<String>,
    token: Option<String>,
    endpoint: Option<String>,
) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(role) = role {
        config.role = role;
    }
    if let Some(token) = token {
        config.token = token;
    }
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    Ok(config)
}

fn require_token(config: &Config) -> Result<()> {
    if !config.has_token() {
        anyhow::bail!("no auth token configured; set WORKDISTRO_TOKEN or pass --token");
    }
    Ok(())
}

/// Stream notifications to stdout until interrupted.
async fn watch(config: Config) -> Result<()> {
    require_token(&config)?;
    if config.role != "client" && config.role != "worker" {
        log::warn!(
            "unrecognized role '{}'; the server expects client or worker",
            config.role
        );
    }

    let channel = NotificationChannel::new(config.channel_config());
    let session_log = MessageLog::new();
    let collector = session_log.attach(&channel);
    let mut subscription = channel.subscribe();
    channel.connect(&config.token, &config.role);

    println!("Watching notifications as {} (Ctrl-C to stop)", config.role);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            notification = subscription.recv() => match notification {
                Some(notification) => print_notification(&notification),
                None => break,
            },
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    log::warn!("Ctrl-C handler failed: {e}");
                }
                println!();
                break;
            }
        }
    }

    channel.disconnect();

    let entries = session_log.snapshot().await;
    let mut new_applications = 0usize;
    let mut status_updates = 0usize;
    let mut other = 0usize;
    for entry in &entries {
        match entry.event {
            NotificationEvent::NewApplication => new_applications += 1,
            NotificationEvent::StatusUpdate => status_updates += 1,
            NotificationEvent::Unknown(_) => other += 1,
        }
    }
    println!(
        "Session summary: {} notification(s) ({} new application(s), {} status update(s), {} other)",
        entries.len(),
        new_applications,
        status_updates,
        other
    );

    channel.shutdown().await;
    let _ = collector.await;
    Ok(())
}

/// Connect, transmit one payload, and exit.
///
/// Commands are processed in order by the channel driver, so the
/// payload is written and flushed before the disconnect that follows.
async fn send(config: Config, payload: &str) -> Result<()> {
    require_token(&config)?;
    let value: serde_json::Value =
        serde_json::from_str(payload).context("payload is not valid JSON")?;

    let channel = NotificationChannel::new(config.channel_config());
    let status = channel.status();
    channel.connect(&config.token, &config.role);

    if !wait_for_connected(&status, SEND_CONNECT_TIMEOUT).await {
        channel.shutdown().await;
        anyhow::bail!(
            "could not establish a connection within {}s",
            SEND_CONNECT_TIMEOUT.as_secs()
        );
    }

    channel.send(value);
    channel.disconnect();
    channel.shutdown().await;
    println!("Sent.");
    Ok(())
}

async fn wait_for_connected(status: &SharedStatus, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if status.is_connected().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

fn print_notification(notification: &Notification) {
    let stamp = notification
        .received_at
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S");
    let details = notification.content.as_deref().unwrap_or("(no details)");
    match &notification.event {
        NotificationEvent::NewApplication => println!("[{stamp}] new application: {details}"),
        NotificationEvent::StatusUpdate => println!("[{stamp}] status update: {details}"),
        NotificationEvent::Unknown(kind) if kind.is_empty() => {
            println!("[{stamp}] {}", notification.raw);
        }
        NotificationEvent::Unknown(kind) => println!("[{stamp}] {kind}: {}", notification.raw),
    }
}
