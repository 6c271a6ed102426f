//! 配置（TOML 文件 + 命令行覆盖）

use crate::error::ConfigError;
use crate::services::engine::Thresholds;
use crate::services::severity::DEFAULT_INDICATOR_STEPS;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// 桌面通知
    Desktop,
    /// 只写日志
    Log,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cpu_threshold_percent: f32,
    pub duration_threshold_secs: u64,
    pub sample_interval_secs: u64,
    pub indicator_steps: usize,
    pub notifier: NotifierKind,
    /// Prometheus textfile 输出路径
    pub metrics_file: Option<PathBuf>,
    /// 忽略的进程名（正则）
    pub ignore: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cpu_threshold_percent: 90.0,
            duration_threshold_secs: 60,
            sample_interval_secs: 5,
            indicator_steps: DEFAULT_INDICATOR_STEPS,
            notifier: NotifierKind::Desktop,
            metrics_file: None,
            ignore: vec![],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "cpu-watchdog")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cpu_threshold_percent.is_finite() || self.cpu_threshold_percent <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cpu_threshold_percent must be a positive number, got {}",
                self.cpu_threshold_percent
            )));
        }
        if self.duration_threshold_secs == 0 {
            return Err(ConfigError::Invalid(
                "duration_threshold_secs must be at least 1".to_string(),
            ));
        }
        if self.sample_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sample_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.indicator_steps < 2 {
            return Err(ConfigError::Invalid(format!(
                "indicator_steps must be at least 2, got {}",
                self.indicator_steps
            )));
        }
        self.ignore_patterns()?;
        Ok(())
    }

    pub fn ignore_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.ignore
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            cpu_percent: self.cpu_threshold_percent,
            duration: Duration::from_secs(self.duration_threshold_secs),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}
