use crate::error::SampleError;
use crate::models::ProcessSample;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Mutex;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// 进程采样来源
///
/// 第一次调用的结果没有基线，调用方必须丢弃。
pub trait SampleProvider: Send + Sync {
    fn sample(&self) -> Result<Vec<ProcessSample>, SampleError>;
}

struct SamplerState {
    system: System,
    /// 上一次刷新中出现过的 PID
    seen: HashSet<u32>,
}

/// 基于 sysinfo 的全进程 CPU 采样
pub struct SysinfoSampler {
    state: Mutex<SamplerState>,
    ignore: Vec<Regex>,
}

impl SysinfoSampler {
    pub fn new(ignore: Vec<Regex>) -> Self {
        Self {
            state: Mutex::new(SamplerState {
                system: System::new(),
                seen: HashSet::new(),
            }),
            ignore,
        }
    }
}

impl SampleProvider for SysinfoSampler {
    fn sample(&self) -> Result<Vec<ProcessSample>, SampleError> {
        let mut state = self.state.lock().map_err(|_| SampleError::Poisoned)?;
        let SamplerState { system, seen } = &mut *state;

        // 只要进程，不要 Linux 线程
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().without_tasks(),
        );

        let processes = system.processes();
        let samples = collect_samples(
            processes.iter().map(|(pid, process)| {
                (
                    pid.as_u32(),
                    process.name().to_string_lossy().into_owned(),
                    process.cpu_usage(),
                )
            }),
            seen,
            &self.ignore,
        )?;

        *seen = processes.keys().map(|pid| pid.as_u32()).collect();
        log::debug!("Sampled {} processes", samples.len());
        Ok(samples)
    }
}

/// 单个进程的读数；新出现的进程还没有基线
fn to_sample(pid: u32, name: String, cpu: f32, seen: &HashSet<u32>) -> ProcessSample {
    let cpu_percent = if seen.contains(&pid) && cpu.is_finite() {
        Some(cpu)
    } else {
        None
    };
    ProcessSample::new(pid, name, cpu_percent)
}

/// 一次刷新的全部 (pid, name, cpu) 转成采样；一个进程都没有视为不可用
fn collect_samples<I>(
    processes: I,
    seen: &HashSet<u32>,
    ignore: &[Regex],
) -> Result<Vec<ProcessSample>, SampleError>
where
    I: IntoIterator<Item = (u32, String, f32)>,
{
    let mut visible = 0usize;
    let mut samples = Vec::new();
    for (pid, name, cpu) in processes {
        visible += 1;
        if is_ignored(ignore, &name) {
            continue;
        }
        samples.push(to_sample(pid, name, cpu, seen));
    }

    if visible == 0 {
        return Err(SampleError::Unavailable(
            "no processes visible".to_string(),
        ));
    }
    Ok(samples)
}

/// 名称匹配任一忽略规则
pub fn is_ignored(patterns: &[Regex], name: &str) -> bool {
    patterns.iter().any(|re| re.is_match(name))
}
