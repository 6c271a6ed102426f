use std::path::PathBuf;
use thiserror::Error;

/// 进程采样失败（整次采样不可用）
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("process table unavailable: {0}")]
    Unavailable(String),

    #[error("sampler lock poisoned")]
    Poisoned,

    #[error("sampling task failed: {0}")]
    Task(String),
}

/// 通知或进度输出失败，只记录，不影响监控循环
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("notification failed: {0}")]
    Notification(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics encoding failed: {0}")]
    Metrics(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value: {0}")]
    Invalid(String),

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}

#[derive(Error, Debug)]
pub enum AutostartError {
    #[error("cannot determine home directory")]
    NoHome,

    #[error("cannot determine executable path: {0}")]
    Executable(std::io::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
