use std::io::{self, BufRead};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use splitshare::cli::{Cli, Commands, header_policy};
use splitshare::commands::{deliver_files, send_value, serve, split_file};
use splitshare::config::{SinkConfig, SinkMode, TransportConfig};
use splitshare::domain::{EndpointPair, Value};
use splitshare::mask::MaskGenerator;
use splitshare::transport::ShareTransport;

/// Read the value to split from stdin
fn read_value() -> Result<Value> {
    if atty::is(atty::Stream::Stdin) {
        eprintln!("Enter the value to split:");
    }
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    let mut line = String::new();
    handle
        .read_line(&mut line)
        .context("Failed to read value from stdin")?;
    line.trim()
        .parse()
        .context("Failed to parse value from stdin")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Split {
            file,
            bound,
            out_a,
            out_b,
            header,
            no_header,
            seed,
        } => {
            let masks = seed.map_or_else(MaskGenerator::from_entropy, MaskGenerator::seeded);
            let policy = header_policy(header, no_header);
            let summary = split_file(&file, &out_a, &out_b, policy, bound, masks)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Send {
            value,
            endpoint_a,
            endpoint_b,
            bound,
        } => {
            let value = match value {
                Some(value) => value,
                None => read_value()?,
            };
            let endpoints = EndpointPair::new(endpoint_a, endpoint_b)?;
            let transport = ShareTransport::new(TransportConfig::default());
            let report = send_value(
                value,
                bound,
                &endpoints,
                &transport,
                MaskGenerator::from_entropy(),
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Deliver {
            file_a,
            file_b,
            endpoint_a,
            endpoint_b,
            granularity,
        } => {
            let endpoints = EndpointPair::new(endpoint_a, endpoint_b)?;
            let transport = ShareTransport::new(TransportConfig::default());
            let report = deliver_files(&file_a, &file_b, &endpoints, &transport, granularity)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Serve {
            port,
            file,
            append,
            bind,
        } => {
            let mut config = SinkConfig::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(file) = file {
                config.path = file;
            }
            if append {
                config.mode = SinkMode::Append;
            }
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(&config)?;
        }
    }

    Ok(())
}
