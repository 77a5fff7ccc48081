// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use earable_link::config::{apply_env_overrides, load_config_with_env, LinkConfig, LoggingConfig};
use earable_link::{
    decode_notification, export, format_data_size, DataFormat, RecordingCache, SchemeRegistry,
};

/// Earable Link - inspect sensor schemes and export captured telemetry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a scheme blob read from the parse-info characteristic and print it as JSON
    Scheme {
        #[arg(long)]
        scheme: PathBuf,
    },

    /// Decode a notification capture and export the merged rows
    Export {
        /// Scheme blob describing the captured sensors
        #[arg(long)]
        scheme: PathBuf,

        /// Capture file: repeated `u16 length (LE)` + notification bytes
        #[arg(long)]
        capture: PathBuf,

        /// csv, json or binary (overrides config)
        #[arg(long)]
        format: Option<DataFormat>,

        /// Comma separated sensor ids (overrides config)
        #[arg(long, value_delimiter = ',')]
        sensor_types: Option<Vec<u8>>,

        /// Output file; defaults to the capture name with the format's extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config_with_env(path)?,
        None => {
            let mut config = LinkConfig::default();
            apply_env_overrides(&mut config);
            config
        }
    };

    init_tracing(&config.logging)?;

    if let Some(path) = &args.config {
        info!("Loaded configuration from: {:?}", path);
    }

    match args.command {
        Command::Scheme { scheme } => print_scheme(&scheme),
        Command::Export {
            scheme,
            capture,
            format,
            sensor_types,
            output,
        } => {
            let format = format.unwrap_or(config.export.format);
            let sensor_types = sensor_types.unwrap_or_else(|| config.export.sensor_types.clone());
            let output = output.unwrap_or_else(|| {
                capture.with_extension(format.file_extension().trim_start_matches('.'))
            });
            export_capture(&scheme, &capture, format, &sensor_types, &output)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(logging.level.to_lowercase()))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn load_registry(path: &Path) -> Result<SchemeRegistry> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read scheme file {:?}", path))?;
    let registry = SchemeRegistry::from_bytes(&bytes).context("Failed to parse scheme")?;
    info!("Loaded {} sensor schemes from {:?}", registry.len(), path);
    Ok(registry)
}

fn print_scheme(path: &Path) -> Result<()> {
    let registry = load_registry(path)?;
    let json = serde_json::to_string_pretty(registry.schemes())?;
    println!("{}", json);
    Ok(())
}

/// Split a capture into the notifications it contains
fn read_capture(bytes: &[u8]) -> Result<Vec<&[u8]>> {
    let mut frames = Vec::new();
    let mut rest = bytes;

    while !rest.is_empty() {
        if rest.len() < 2 {
            bail!("Capture ends inside a length prefix");
        }
        let len = u16::from_le_bytes([rest[0], rest[1]]) as usize;
        rest = &rest[2..];
        if rest.len() < len {
            bail!(
                "Capture ends inside a frame: need {} bytes, {} left",
                len,
                rest.len()
            );
        }
        frames.push(&rest[..len]);
        rest = &rest[len..];
    }

    Ok(frames)
}

fn export_capture(
    scheme: &Path,
    capture: &Path,
    format: DataFormat,
    sensor_types: &[u8],
    output: &Path,
) -> Result<()> {
    let registry = load_registry(scheme)?;
    let bytes = std::fs::read(capture)
        .with_context(|| format!("Failed to read capture file {:?}", capture))?;
    let frames = read_capture(&bytes)?;

    let mut cache = RecordingCache::new();
    cache.start();

    let mut dropped = 0usize;
    for raw in &frames {
        match decode_notification(&registry, raw) {
            Ok(record) => cache.ingest(&record),
            Err(e) => {
                dropped += 1;
                warn!("Skipping frame: {}", e);
            }
        }
    }

    let rows = cache.stop();
    info!(
        "Decoded {} of {} frames into {} rows",
        frames.len() - dropped,
        frames.len(),
        rows.len()
    );

    let data = export(&rows, sensor_types, format).context("Export failed")?;
    std::fs::write(output, &data)
        .with_context(|| format!("Failed to write {:?}", output))?;

    info!(
        "Wrote {} ({}) to {:?}",
        format_data_size(data.len() as u64),
        format.file_extension(),
        output
    );
    Ok(())
}
