use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, NotifierKind};

/// CPU Watchdog - 持续高 CPU 进程告警
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// 监控参数，在子命令前后都可以给出
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 开始监控（默认）
    Run,

    /// 登录时自动启动
    Autostart {
        #[arg(value_enum)]
        action: AutostartAction,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutostartAction {
    Enable,
    Disable,
    Status,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// 配置文件路径
    #[arg(short, long, env = "CPU_WATCHDOG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// CPU 阈值（百分比）
    #[arg(long, env = "CPU_WATCHDOG_THRESHOLD", global = true)]
    pub cpu_threshold: Option<f32>,

    /// 持续时长阈值（秒）
    #[arg(short, long, env = "CPU_WATCHDOG_DURATION", global = true)]
    pub duration: Option<u64>,

    /// 采样间隔（秒）
    #[arg(short, long, env = "CPU_WATCHDOG_INTERVAL", global = true)]
    pub interval: Option<u64>,

    /// 告警方式
    #[arg(short, long, value_enum, env = "CPU_WATCHDOG_NOTIFIER", global = true)]
    pub notifier: Option<NotifierKind>,

    /// Prometheus textfile 输出路径
    #[arg(short, long, env = "CPU_WATCHDOG_METRICS_FILE", global = true)]
    pub metrics_file: Option<PathBuf>,
}

impl RunArgs {
    /// 命令行参数覆盖配置文件
    pub fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.cpu_threshold {
            config.cpu_threshold_percent = threshold;
        }
        if let Some(duration) = self.duration {
            config.duration_threshold_secs = duration;
        }
        if let Some(interval) = self.interval {
            config.sample_interval_secs = interval;
        }
        if let Some(notifier) = self.notifier {
            config.notifier = notifier;
        }
        if let Some(path) = &self.metrics_file {
            config.metrics_file = Some(path.clone());
        }
    }
}
