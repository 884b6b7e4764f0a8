//! sessiongate - an interactive shell for exercising a cookie-refreshed
//! bearer session against an API server.
//!
//! Run with no arguments for a prompt, or pass one command as arguments
//! (`sessiongate visit /admin`).

mod app;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Command, Flow};
use sessiongate_core::Config;

/// Directory for an optional rolling log file
const ENV_LOG_DIR: &str = "SESSIONGATE_LOG_DIR";

/// Log file prefix inside the log directory
const LOG_FILE_PREFIX: &str = "sessiongate.log";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g., RUST_LOG=sessiongate_core=debug).
/// When SESSIONGATE_LOG_DIR is set, logs also go to a daily rolling file there;
/// the returned guard must stay alive for that file to be flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match std::env::var(ENV_LOG_DIR) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let config = Config::load()?;
    info!(api_base = %config.api_base, "sessiongate starting");

    let mut app = App::new(config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let command = Command::parse(&args.join(" "))?;
        app.run(command).await?;
        return Ok(());
    }

    run_shell(&mut app).await
}

async fn run_shell(app: &mut App) -> Result<()> {
    println!("sessiongate - type `help` for commands");
    let stdin = io::stdin();

    loop {
        print!("{}> ", app.prompt());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match app.run(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("Error: {:#}", e),
        }
    }

    info!("sessiongate shutting down");
    Ok(())
}
