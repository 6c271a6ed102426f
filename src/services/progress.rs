use crate::error::SinkError;
use crate::metrics::METRICS;
use crate::models::Severity;
use std::fs;
use std::path::{Path, PathBuf};

/// 严重程度指示输出，每轮调用一次
pub trait ProgressSink: Send {
    fn name(&self) -> &'static str;

    fn set_progress(&mut self, severity: &Severity) -> Result<(), SinkError>;
}

/// 只在离散等级变化时写日志
#[derive(Default)]
pub struct LogProgress {
    last_level: Option<usize>,
}

impl ProgressSink for LogProgress {
    fn name(&self) -> &'static str {
        "log"
    }

    fn set_progress(&mut self, severity: &Severity) -> Result<(), SinkError> {
        if self.last_level == Some(severity.level) {
            return Ok(());
        }
        self.last_level = Some(severity.level);

        if severity.level == 0 {
            log::info!("CPU normal");
        } else {
            log::info!(
                "High CPU detected: indicator level {} ({:.0}% of the way to an alert)",
                severity.level,
                severity.progress * 100.0
            );
        }
        Ok(())
    }
}

/// 把 Prometheus 指标写入文本文件（node_exporter textfile collector）
///
/// gauge 由驱动循环在每轮更新，这里只负责落盘。
pub struct MetricsProgress {
    path: PathBuf,
}

impl MetricsProgress {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressSink for MetricsProgress {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn set_progress(&mut self, _severity: &Severity) -> Result<(), SinkError> {
        let text = METRICS
            .render()
            .map_err(|e| SinkError::Metrics(e.to_string()))?;
        write_atomic(&self.path, text.as_bytes())?;
        Ok(())
    }
}

/// 先写临时文件再重命名，避免采集方读到半个文件
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_progress_tracks_level_changes() {
        let mut sink = LogProgress::default();
        sink.set_progress(&Severity::idle()).unwrap();
        assert_eq!(sink.last_level, Some(0));

        sink.set_progress(&Severity { progress: 0.5, level: 6 }).unwrap();
        assert_eq!(sink.last_level, Some(6));
    }

    #[test]
    fn test_metrics_progress_writes_textfile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cpu_watchdog.prom");
        let mut sink = MetricsProgress::new(&path);

        METRICS.cycles_total.inc();
        sink.set_progress(&Severity::idle()).unwrap();

        let text = fs::read_to_string(sink.path()).unwrap();
        assert!(text.contains("cpu_watchdog_cycles_total"));
        assert!(!dir.path().join("nested").join("cpu_watchdog.prom.tmp").exists());
    }
}
