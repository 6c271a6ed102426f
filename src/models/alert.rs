/// 进程持续高 CPU 超过时长阈值时产生的告警，每个持续期最多一次
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub name: String,
    pub pid: u32,
    pub cpu_percent: f32,
    pub duration_threshold_secs: u64,
}

impl AlertEvent {
    pub fn summary(&self) -> &'static str {
        "High CPU Usage"
    }

    pub fn body(&self) -> String {
        format!(
            "{} (PID {}) has been using {:.0}% CPU for over {}s",
            self.name, self.pid, self.cpu_percent, self.duration_threshold_secs
        )
    }
}

/// 已告警的进程回落到阈值以下（或退出）
#[derive(Debug, Clone, PartialEq)]
pub struct AlertResolved {
    pub name: String,
    pub pid: u32,
}

/// 当前最严重进程距离告警的进度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Severity {
    /// 0..=1
    pub progress: f64,
    /// 0..steps-1 的离散指示等级
    pub level: usize,
}

impl Severity {
    #[cfg(test)]
    pub fn idle() -> Self {
        Self {
            progress: 0.0,
            level: 0,
        }
    }
}
