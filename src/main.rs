use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use remote_engine::agent::{self, Config};
use remote_engine::transport::client::Controller;
use remote_engine::transport::Command;
use remote_engine::utils;

#[derive(Parser)]
#[command(name = "remote-engine", version, about = "Remote-controlled animation engine")]
struct AppCli {
    /// Config file path (defaults to ./config.json when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine (default)
    Serve {
        /// Override network.local_ip
        #[arg(long)]
        ip: Option<String>,
        /// Override network.local_port
        #[arg(long)]
        port: Option<u16>,
        /// Also read command lines from stdin; `exit` stops the engine
        #[arg(long, default_value_t = false)]
        console: bool,
    },
    /// Send one command to an engine and print its statuses
    Send {
        /// Engine address, e.g. 127.0.0.1:1241
        #[arg(long)]
        to: SocketAddr,
        /// Command type (speech, stopSpeech, gaze, anim, facs)
        #[arg(long = "type")]
        command_type: String,
        /// Task id; a fresh UUID when omitted
        #[arg(long)]
        task: Option<String>,
        /// Parameter as key=value, repeatable
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,
        #[arg(long, default_value_t = 10)]
        wait_secs: u64,
        /// Local address to send from
        #[arg(long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
    },
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => bail!("parameter must look like key=value, got {raw:?}"),
    }
}

async fn send(
    to: SocketAddr,
    bind: SocketAddr,
    command: Command,
    wait: Duration,
    buffer_size: usize,
) -> Result<()> {
    let controller = Controller::connect(bind, to, buffer_size).await?;
    controller.send(&command).await?;
    info!(task_id = %command.task_id, remote = %controller.remote(), "command sent");

    let terminal = controller
        .await_terminal(&command.task_id, wait, |status| {
            let details: Vec<String> = status
                .details
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!("{} {} {}", status.task_id, status.status, details.join(" "));
        })
        .await?;
    if terminal.is_none() {
        bail!(
            "no terminal status for task {} within {}s",
            command.task_id,
            wait.as_secs()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();
    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Some(Commands::Send {
            to,
            command_type,
            task,
            params,
            wait_secs,
            bind,
        }) => {
            let task = task.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut command = Command::new(task, command_type);
            for raw in &params {
                let (key, value) = parse_param(raw).context("parsing --param")?;
                command = command.with_param(key, value);
            }
            send(
                to,
                bind,
                command,
                Duration::from_secs(wait_secs),
                config.network.buffer_size,
            )
            .await?;
        }
        Some(Commands::Serve { ip, port, console }) => {
            if let Some(ip) = ip {
                config.network.local_ip = ip;
            }
            if let Some(port) = port {
                config.network.local_port = port;
            }
            agent::daemon::run(config, console).await?;
        }
        None => {
            // Default: run the engine with the configured endpoint
            agent::daemon::run(config, false).await?;
        }
    }

    Ok(())
}
