// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LinkConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse configuration from YAML text
    pub fn parse(content: &str) -> Result<LinkConfig> {
        let content = Self::substitute_env_vars(content);

        let config: LinkConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${EARABLE_FILE:-session} -> session (if EARABLE_FILE not set)
    fn substitute_env_vars(content: &str) -> String {
        let re = match Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub(crate) fn validate(config: &LinkConfig) -> Result<()> {
        let recording = &config.recording;
        if recording.min_sampling_rate == 0 {
            bail!("recording.min_sampling_rate must be > 0");
        }

        if recording.min_sampling_rate > recording.max_sampling_rate {
            bail!(
                "recording.min_sampling_rate ({}) exceeds max_sampling_rate ({})",
                recording.min_sampling_rate,
                recording.max_sampling_rate
            );
        }

        if recording.max_file_name_bytes == 0 || recording.max_file_name_bytes > 255 {
            bail!("recording.max_file_name_bytes must be 1-255");
        }

        if recording.sensor_types.len() > u8::MAX as usize {
            bail!("recording.sensor_types cannot list more than 255 sensors");
        }

        for sensor in &config.sensors {
            if !(sensor.sampling_rate.is_finite() && sensor.sampling_rate >= 0.0) {
                bail!(
                    "sensors[{}].sampling_rate must be a non-negative number",
                    sensor.sensor_id
                );
            }
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            unknown => bail!("Unknown logging format: '{}'. Supported: text, json", unknown),
        }

        Ok(())
    }
}
