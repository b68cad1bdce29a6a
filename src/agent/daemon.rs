use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::agent::config::Config;
use crate::agent::engine::Engine;
use crate::rig::{Clock, Rig, SystemClock};
use crate::transport::{decode_command, status_channel, Endpoint};

pub async fn run(config: Config, console: bool) -> Result<()> {
    info!(
        local = %config.bind_address(),
        tick_ms = config.scheduler.tick_interval_ms,
        "remote engine starting"
    );

    let (sink, statuses) = status_channel();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let rig = Rig::tracing(config.speech.words_per_minute);
    let engine = Arc::new(Engine::build(&config, rig, clock, sink)?);

    let endpoint = match Endpoint::bind(&config.network).await {
        Ok(endpoint) => Arc::new(endpoint),
        Err(e) => {
            error!(error = %e, "could not open message endpoint");
            return Err(e);
        }
    };

    let receiver = {
        let endpoint = endpoint.clone();
        let dispatcher = engine.dispatcher();
        tokio::spawn(async move { endpoint.serve(&dispatcher).await })
    };
    let forwarder = {
        let endpoint = endpoint.clone();
        tokio::spawn(async move { endpoint.forward_statuses(statuses).await })
    };
    let ticker = {
        let engine = engine.clone();
        let period = Duration::from_millis(config.scheduler.tick_interval_ms);
        tokio::spawn(async move { engine.run_ticks(period).await })
    };

    if console {
        tokio::select! {
            res = run_console(&engine) => res?,
            res = signal::ctrl_c() => res.context("waiting for Ctrl+C")?,
        }
    } else {
        signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    }
    info!("shutdown requested, stopping engine");

    for handle in [receiver, forwarder, ticker] {
        handle.abort();
        let _ = handle.await; // cancellation error expected
    }
    Ok(())
}

/// Read commands from stdin, one per line, until `exit` or end of input.
/// Statuses for console tasks have no peer and are only logged.
async fn run_console(engine: &Engine) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("console ready; type a <command .../> line or 'exit'");
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }
        match decode_command(line) {
            Ok(command) => engine.handle(&command),
            Err(e) => warn!(error = %e, "console input ignored"),
        }
    }
    Ok(())
}
