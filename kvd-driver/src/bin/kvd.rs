//! Operator CLI over the diagnostics facade.
//!
//! Usage: `kvd [doctor|stats|dbsize|clients|monitor]`
//!
//! Connection settings come from `KVD_HOST`, `KVD_PORT`, `KVD_USERNAME`,
//! `KVD_PASSWORD`, `KVD_DB`, `KVD_CLIENT_NAME` and `KVD_TIMEOUT_MS`.

use std::env;
use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use kvd_driver::{ConnectOptions, Driver};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: kvd [doctor|stats|dbsize|clients|monitor]";

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();

    let command = env::args().nth(1).unwrap_or_else(|| "doctor".to_string());
    if command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let options = ConnectOptions::from_env().context("reading KVD_* settings")?;
    let mut driver = Driver::new()?;
    driver
        .connect(&options)
        .with_context(|| format!("connecting to {}", options))?;

    let outcome = run(&driver, &command);
    driver.close().context("closing connection")?;
    outcome
}

fn run(driver: &Driver, command: &str) -> Result<()> {
    let diagnostics = driver.diagnostics()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        "doctor" => writeln!(out, "{}", diagnostics.check_memory()?)?,
        "stats" => {
            let stats = diagnostics.check_memory_stats()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
        }
        "dbsize" => writeln!(out, "{}", diagnostics.database_size()?)?,
        "clients" => {
            let clients = driver.client()?.client_list()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&clients)?)?;
        }
        "monitor" => {
            info!("streaming commands, interrupt to stop");
            for event in diagnostics.actions_registry()? {
                writeln!(out, "{}", serde_json::to_string(&event?)?)?;
                out.flush()?;
            }
        }
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
    Ok(())
}
