use crate::models::{Severity, TrackingTable};
use std::time::{Duration, Instant};

/// 托盘指示器默认的离散等级数（0..=12）
pub const DEFAULT_INDICATOR_STEPS: usize = 13;

/// 最严重进程距离告警的进度，范围 [0, 1]
///
/// 空表返回 0；时长阈值为 0 时任何跟踪中的进程都视为已到达。
pub fn project(table: &TrackingTable, now: Instant, duration: Duration) -> f64 {
    if duration.is_zero() {
        return if table.is_empty() { 0.0 } else { 1.0 };
    }
    let threshold = duration.as_secs_f64();
    table
        .entries()
        .map(|entry| (entry.elapsed(now).as_secs_f64() / threshold).clamp(0.0, 1.0))
        .fold(0.0, f64::max)
}

/// 把进度映射为 `0..steps` 的离散等级，单调不减
pub fn indicator_level(progress: f64, steps: usize) -> usize {
    if steps < 2 {
        return 0;
    }
    let max = (steps - 1) as f64;
    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    (progress * max).round() as usize
}

pub fn severity(table: &TrackingTable, now: Instant, duration: Duration, steps: usize) -> Severity {
    let progress = project(table, now, duration);
    Severity {
        progress,
        level: indicator_level(progress, steps),
    }
}
