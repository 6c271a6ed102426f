use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// 单个高 CPU 进程的跟踪状态
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEntry {
    pub pid: u32,
    /// 开始跟踪时的进程名称
    pub name: String,
    /// 首次（连续）观测到 >= 阈值的时刻
    pub first_high_at: Instant,
    /// 本持续期是否已经告警
    pub alerted: bool,
}

impl TrackingEntry {
    pub fn new(pid: u32, name: impl Into<String>, first_high_at: Instant) -> Self {
        Self {
            pid,
            name: name.into(),
            first_high_at,
            alerted: false,
        }
    }

    /// 已持续的时长；`now` 早于起点时为 0
    pub fn elapsed(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.first_high_at)
    }
}

/// PID -> 跟踪状态
///
/// 只有驱动循环持有并修改，不跨线程共享。
#[derive(Debug, Clone, Default)]
pub struct TrackingTable {
    entries: HashMap<u32, TrackingEntry>,
}

impl TrackingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pid: u32) -> Option<&TrackingEntry> {
        self.entries.get(&pid)
    }

    pub fn get_mut(&mut self, pid: u32) -> Option<&mut TrackingEntry> {
        self.entries.get_mut(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.entries.contains_key(&pid)
    }

    /// 插入或替换，返回旧值
    pub fn insert(&mut self, entry: TrackingEntry) -> Option<TrackingEntry> {
        self.entries.insert(entry.pid, entry)
    }

    pub fn remove(&mut self, pid: u32) -> Option<TrackingEntry> {
        self.entries.remove(&pid)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TrackingEntry> {
        self.entries.values()
    }

    pub fn pids(&self) -> HashSet<u32> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 删除所有不在 `keep` 中的 PID，返回被删除的条目
    pub fn prune(&mut self, keep: &HashSet<u32>) -> Vec<TrackingEntry> {
        let gone: Vec<u32> = self.pids().difference(keep).copied().collect();
        gone.into_iter()
            .filter_map(|pid| self.entries.remove(&pid))
            .collect()
    }
}
