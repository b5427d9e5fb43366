mod logging;
mod monitor;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use shed_lib::constants::{DEFAULT_HOST, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT};
use shed_lib::{ChannelListener, PollSequence, Poller, PollerConfig, Reading};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::monitor::{confirm_relay, run_monitor, wait_for};
use crate::output::Output;

/// Poll a shed controller over UDP and print its readings.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Controller IP address.
    #[arg(long, env = "SHED_HOST", default_value_t = DEFAULT_HOST)]
    host: IpAddr,
    /// Controller UDP port.
    #[arg(short, long, env = "SHED_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Polling interval in milliseconds.
    #[arg(short, long, env = "SHED_POLL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    interval_ms: u64,
    /// Four command characters sent in rotation, one per poll.
    #[arg(short, long, env = "SHED_POLL_SEQUENCE", default_value_t = PollSequence::default())]
    sequence: PollSequence,
    /// Print readings as JSON lines instead of `name = value`.
    #[arg(long)]
    json: bool,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Poll continuously (the default).
    Monitor {
        /// Stop after this many polls.
        #[arg(short, long)]
        cycles: Option<u32>,
    },
    /// Request one reading and print the reply.
    Fetch {
        what: Block,
        #[arg(short, long, default_value_t = 2000)]
        wait_ms: u64,
    },
    /// Switch the laser relay, then print the resulting state.
    Relay {
        state: Switch,
        #[arg(short, long, default_value_t = 2000)]
        wait_ms: u64,
    },
    /// Reset the counters or the persisted crash record.
    Reset {
        what: Resettable,
        #[arg(short, long, default_value_t = 2000)]
        wait_ms: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Block {
    Info,
    Counters,
    Persisted,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Switch {
    On,
    Off,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Resettable {
    Counters,
    Persisted,
}

fn is_block(reading: &Reading, block: Block) -> bool {
    matches!(
        (reading, block),
        (Reading::Info(_), Block::Info) | (Reading::Counters(_), Block::Counters) | (Reading::Persisted(_), Block::Persisted)
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::setup_logging(cli.log_file.clone(), &cli.verbose)?;

    tokio::select! {
        res = run(cli) => {
            if let Err(e) = res {
                error!("Application failed: {:?}", e);
                process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down gracefully.");
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = PollerConfig::new(cli.host, cli.port)
        .with_poll_interval_ms(cli.interval_ms)
        .with_sequence(cli.sequence);
    let output = Output::new(cli.json);

    let mut poller = Poller::new(config).context("Invalid poller configuration")?;
    let (listener, mut readings) = ChannelListener::new();
    poller.subscribe(Arc::new(listener));
    poller.start().await.context("Failed to start poller")?;

    let command = cli.command.unwrap_or(Command::Monitor { cycles: None });
    let result = match command {
        Command::Monitor { cycles } => run_monitor(&mut poller, &mut readings, cycles, output).await,
        Command::Fetch { what, wait_ms } => {
            let sent = match what {
                Block::Info => poller.fetch_state().await,
                Block::Counters => poller.fetch_counters().await,
                Block::Persisted => poller.fetch_persisted().await,
            };
            sent.context("Failed to send request")?;
            let reading = wait_for(&mut readings, Duration::from_millis(wait_ms), |r| is_block(r, what)).await?;
            output.reading(&reading, &reading.points())
        }
        Command::Relay { state, wait_ms } => {
            let on = matches!(state, Switch::On);
            poller.set_relay(on).await.context("Failed to switch relay")?;
            info!("Relay {} requested", if on { "on" } else { "off" });
            let reading = confirm_relay(&poller, &mut readings, on, Duration::from_millis(wait_ms)).await?;
            output.reading(&reading, &reading.points())
        }
        Command::Reset { what, wait_ms } => {
            let block = match what {
                Resettable::Counters => {
                    poller.reset_counters().await.context("Failed to reset counters")?;
                    Block::Counters
                }
                Resettable::Persisted => {
                    poller.reset_persisted().await.context("Failed to reset persisted record")?;
                    Block::Persisted
                }
            };
            let reading = wait_for(&mut readings, Duration::from_millis(wait_ms), |r| is_block(r, block)).await?;
            output.reading(&reading, &reading.points())
        }
    };

    poller.stop();
    result
}
