use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("parser error: {0}")]
    Parser(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("read error: {0}")]
    ReadError(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

pub type Result<T> = std::result::Result<T, DemuxError>;
