//! Parser configuration.
//!
//! Values come from defaults, then the first of `tsdemux.toml` /
//! `config.toml` found in the working directory, then `TSDEMUX_*`
//! environment variables.

use crate::error::{DemuxError, Result};
use bytes::Bytes;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

const ENV_TIMESTAMP_OFFSET: &str = "TSDEMUX_TIMESTAMP_OFFSET";
const ENV_IGNORE_PROGRAM_STREAM: &str = "TSDEMUX_IGNORE_PROGRAM_STREAM";

/// Behaviour switches for a demuxing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Once the init segment has established a PAT, ignore PAT/CAT/PMT/TSDT
    /// sections found in the media itself.
    pub ignore_program_stream: bool,
    /// Added to every PTS/DTS (90 kHz units) before masking back to 33 bits.
    pub timestamp_offset: u64,
}

impl ParserConfig {
    /// Loads defaults, then a config file, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = ["./tsdemux.toml", "./config.toml"]
            .into_iter()
            .find(|path| Path::new(path).exists())
        {
            config = Self::from_toml(&fs::read_to_string(path)?)?;
        }
        config.apply_pairs(env::vars())?;
        Ok(config)
    }

    /// Parses a TOML document; missing keys keep their defaults and
    /// unknown keys or tables are ignored.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults overridden by `TSDEMUX_*` environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::vars())
    }

    /// Builds a config from `(name, value)` pairs using the environment variable names.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        config.apply_pairs(vars)?;
        Ok(config)
    }

    fn apply_pairs<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                ENV_TIMESTAMP_OFFSET | "timestamp_offset" => {
                    self.timestamp_offset = value.parse()?;
                }
                ENV_IGNORE_PROGRAM_STREAM | "ignore_program_stream" => {
                    self.ignore_program_stream = parse_bool(value)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Everything `begin_parsing` needs to start a session.
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    /// Transport packets consumed before the main source; must be whole
    /// 188-byte packets.
    pub init_segment: Option<Bytes>,
    /// Session switches.
    pub config: ParserConfig,
}

impl SourceInfo {
    /// A source without an init segment.
    pub fn new(config: ParserConfig) -> Self {
        Self {
            init_segment: None,
            config,
        }
    }

    /// Attaches an init segment.
    pub fn with_init_segment(mut self, init_segment: impl Into<Bytes>) -> Self {
        self.init_segment = Some(init_segment.into());
        self
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DemuxError::InvalidData(format!(
            "expected a boolean, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_vars() {
        let config = ParserConfig::from_vars([
            ("TSDEMUX_TIMESTAMP_OFFSET", "90000"),
            ("TSDEMUX_IGNORE_PROGRAM_STREAM", "true"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();
        assert_eq!(
            config,
            ParserConfig {
                ignore_program_stream: true,
                timestamp_offset: 90000,
            }
        );
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        assert!(ParserConfig::from_vars([("TSDEMUX_TIMESTAMP_OFFSET", "soon")]).is_err());
        assert!(ParserConfig::from_vars([("TSDEMUX_IGNORE_PROGRAM_STREAM", "maybe")]).is_err());
    }

    #[test]
    fn test_config_file_syntax() {
        let config = ParserConfig::from_toml(
            "# session defaults\n\
             timestamp_offset = 1800 # 20 ms at 90 kHz\n\
             ignore_program_stream = true\n\
             \n\
             [player]\n\
             timestamp_offset = \"unrelated\"\n",
        )
        .unwrap();
        assert_eq!(
            config,
            ParserConfig {
                ignore_program_stream: true,
                timestamp_offset: 1800,
            }
        );
        assert_eq!(ParserConfig::from_toml("").unwrap(), ParserConfig::default());
    }

    #[test]
    fn test_config_file_errors() {
        assert!(matches!(
            ParserConfig::from_toml("timestamp_offset = \"1800\""),
            Err(DemuxError::Config(_))
        ));
        assert!(ParserConfig::from_toml("ignore_program_stream = ").is_err());
    }
}
