use crate::models::{AlertEvent, AlertResolved, ProcessSample, TrackingEntry, TrackingTable};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// 告警判定阈值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// CPU 百分比阈值（>= 即算高）
    pub cpu_percent: f32,
    /// 持续时长阈值（>= 即告警）
    pub duration: Duration,
}

impl Thresholds {
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }
}

/// 单轮判定结果
#[derive(Debug, Default)]
pub struct Evaluation {
    pub events: Vec<AlertEvent>,
    pub resolved: Vec<AlertResolved>,
    pub table: TrackingTable,
}

/// 根据一次采样更新跟踪表并产生告警
///
/// 纯函数：跟踪表按值传入、按值返回。
///
/// 1. `cpu_percent >= 阈值` 的进程进入本轮高 CPU 集合；首次出现时开始计时，
///    已在跟踪且未告警、持续时长 `>=` 阈值时产生一次告警。
/// 2. `cpu_percent` 缺失的进程本轮跳过，不计入高 CPU 集合。
/// 3. 不在本轮高 CPU 集合中的条目全部删除（回落、退出或采样失败）。
pub fn evaluate(
    snapshot: &[ProcessSample],
    now: Instant,
    mut table: TrackingTable,
    thresholds: &Thresholds,
) -> Evaluation {
    let mut events = Vec::new();
    let mut current_high: HashSet<u32> = HashSet::new();

    for sample in snapshot {
        let cpu = match sample.cpu_percent {
            Some(cpu) => cpu,
            None => continue,
        };
        if cpu < thresholds.cpu_percent {
            continue;
        }
        current_high.insert(sample.pid);

        match table.get_mut(sample.pid) {
            None => {
                log::debug!(
                    "Tracking {} (PID {}) at {:.1}% CPU",
                    sample.name,
                    sample.pid,
                    cpu
                );
                table.insert(TrackingEntry::new(sample.pid, sample.name.clone(), now));
            }
            Some(entry) if entry.alerted => {}
            Some(entry) => {
                if entry.elapsed(now) >= thresholds.duration {
                    entry.alerted = true;
                    events.push(AlertEvent {
                        name: sample.name.clone(),
                        pid: sample.pid,
                        cpu_percent: cpu,
                        duration_threshold_secs: thresholds.duration_secs(),
                    });
                }
            }
        }
    }

    let resolved = table
        .prune(&current_high)
        .into_iter()
        .filter_map(|entry| {
            log::debug!("Stopped tracking {} (PID {})", entry.name, entry.pid);
            entry.alerted.then(|| AlertResolved {
                name: entry.name,
                pid: entry.pid,
            })
        })
        .collect();

    Evaluation {
        events,
        resolved,
        table,
    }
}
