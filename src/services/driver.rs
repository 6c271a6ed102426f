use crate::error::SampleError;
use crate::metrics::METRICS;
use crate::models::{AlertEvent, AlertResolved, ProcessSample, Severity, TrackingTable};
use crate::services::engine::{evaluate, Thresholds};
use crate::services::notifier::NotificationSink;
use crate::services::progress::ProgressSink;
use crate::services::sampler::SampleProvider;
use crate::services::severity::{severity, DEFAULT_INDICATOR_STEPS};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// 单轮执行结果
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub events: Vec<AlertEvent>,
    pub resolved: Vec<AlertResolved>,
    pub severity: Severity,
    /// 本轮采样是否成功
    pub sampled: bool,
}

#[derive(Default)]
struct Sinks {
    notifiers: Vec<Box<dyn NotificationSink>>,
    progress: Vec<Box<dyn ProgressSink>>,
}

impl Sinks {
    fn dispatch(&mut self, events: &[AlertEvent], resolved: &[AlertResolved], severity: &Severity) {
        for sink in self.notifiers.iter_mut() {
            for event in events {
                if let Err(e) = sink.notify(event) {
                    log::warn!("Notification via {} failed: {}", sink.name(), e);
                    METRICS.sink_failures_total.with_label_values(&[sink.name()]).inc();
                }
            }
            for r in resolved {
                if let Err(e) = sink.resolve(r) {
                    log::warn!("Resolve via {} failed: {}", sink.name(), e);
                    METRICS.sink_failures_total.with_label_values(&[sink.name()]).inc();
                }
            }
        }

        for sink in self.progress.iter_mut() {
            if let Err(e) = sink.set_progress(severity) {
                log::warn!("Progress update via {} failed: {}", sink.name(), e);
                METRICS.sink_failures_total.with_label_values(&[sink.name()]).inc();
            }
        }
    }
}

/// 某个输出 panic 后锁会中毒，其余输出仍然可用
fn lock_sinks(sinks: &Mutex<Sinks>) -> MutexGuard<'_, Sinks> {
    sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 定时驱动：采样 -> 判定 -> 计算严重程度 -> 分发
///
/// 跟踪表只在这里持有，轮次之间不会重叠。
pub struct Monitor<P: SampleProvider + 'static> {
    provider: Arc<P>,
    table: TrackingTable,
    thresholds: Thresholds,
    steps: usize,
    interval: Duration,
    /// 桌面通知、写文件都是阻塞调用，放到阻塞线程池执行
    sinks: Arc<Mutex<Sinks>>,
}

impl<P: SampleProvider + 'static> Monitor<P> {
    pub fn new(provider: Arc<P>, thresholds: Thresholds, interval: Duration) -> Self {
        Self {
            provider,
            table: TrackingTable::new(),
            thresholds,
            steps: DEFAULT_INDICATOR_STEPS,
            interval,
            sinks: Arc::new(Mutex::new(Sinks::default())),
        }
    }

    pub fn with_indicator_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_notifier(self, sink: Box<dyn NotificationSink>) -> Self {
        lock_sinks(&self.sinks).notifiers.push(sink);
        self
    }

    pub fn with_progress(self, sink: Box<dyn ProgressSink>) -> Self {
        lock_sinks(&self.sinks).progress.push(sink);
        self
    }

    #[cfg(test)]
    pub fn table(&self) -> &TrackingTable {
        &self.table
    }

    /// 在阻塞线程池上采样，避免阻塞异步运行时
    async fn sample(&self) -> Result<Vec<ProcessSample>, SampleError> {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || provider.sample())
            .await
            .map_err(|e| SampleError::Task(e.to_string()))?
    }

    /// 第一次采样没有基线，直接丢弃
    pub async fn prime(&self) {
        match self.sample().await {
            Ok(samples) => log::debug!("Primed sampler with {} processes", samples.len()),
            Err(e) => log::warn!("Priming sample failed: {}", e),
        }
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        METRICS.cycles_total.inc();
        let result = self.sample().await;
        let now = Instant::now().into_std();

        let (events, resolved, sampled) = match result {
            Ok(snapshot) => {
                let table = std::mem::take(&mut self.table);
                let evaluation = evaluate(&snapshot, now, table, &self.thresholds);
                self.table = evaluation.table;
                (evaluation.events, evaluation.resolved, true)
            }
            Err(e) => {
                // 保留跟踪表，下一轮重试
                log::warn!("Skipping cycle, sampling failed: {}", e);
                METRICS.sample_failures_total.inc();
                (Vec::new(), Vec::new(), false)
            }
        };

        let severity = severity(&self.table, now, self.thresholds.duration, self.steps);
        METRICS.alerts_total.inc_by(events.len() as u64);
        METRICS.observe(&severity, &self.table, now);
        log::debug!(
            "Cycle done: {} tracked, {} alerts, progress {:.2}",
            self.table.len(),
            events.len(),
            severity.progress
        );

        self.dispatch(&events, &resolved, severity).await;

        CycleReport {
            events,
            resolved,
            severity,
            sampled,
        }
    }

    async fn dispatch(&self, events: &[AlertEvent], resolved: &[AlertResolved], severity: Severity) {
        let sinks = Arc::clone(&self.sinks);
        let events = events.to_vec();
        let resolved = resolved.to_vec();
        let result = tokio::task::spawn_blocking(move || {
            lock_sinks(&sinks).dispatch(&events, &resolved, &severity);
        })
        .await;
        if let Err(e) = result {
            log::error!("Sink dispatch task failed: {}", e);
        }
    }

    /// 运行直到 `shutdown` 完成；进行中的一轮会先执行完
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.prime().await;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        log::info!(
            "Monitoring every {:?} (threshold {:.1}% for {}s)",
            self.interval,
            self.thresholds.cpu_percent,
            self.thresholds.duration_secs()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Script = VecDeque<Result<Vec<ProcessSample>, SampleError>>;

    /// 按脚本返回采样；脚本用完后重复 `fallback`
    struct ScriptedProvider {
        script: Mutex<Script>,
        fallback: Vec<ProcessSample>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn steady(samples: Vec<ProcessSample>) -> Self {
            Self::new(Script::new(), samples)
        }

        fn new(script: Script, fallback: Vec<ProcessSample>) -> Self {
            Self {
                script: Mutex::new(script),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SampleProvider for ScriptedProvider {
        fn sample(&self) -> Result<Vec<ProcessSample>, SampleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(step) => step,
                None => Ok(self.fallback.clone()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<AlertEvent>>>,
        resolved: Arc<Mutex<Vec<AlertResolved>>>,
        levels: Arc<Mutex<Vec<usize>>>,
        fail: bool,
    }

    impl NotificationSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn notify(&mut self, event: &AlertEvent) -> Result<(), SinkError> {
            self.events.lock().unwrap().push(event.clone());
            if self.fail {
                return Err(SinkError::Notification("display unavailable".to_string()));
            }
            Ok(())
        }

        fn resolve(&mut self, resolved: &AlertResolved) -> Result<(), SinkError> {
            self.resolved.lock().unwrap().push(resolved.clone());
            Ok(())
        }
    }

    impl ProgressSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn set_progress(&mut self, severity: &Severity) -> Result<(), SinkError> {
            self.levels.lock().unwrap().push(severity.level);
            if self.fail {
                return Err(SinkError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            cpu_percent: 90.0,
            duration: Duration::from_secs(60),
        }
    }

    fn hot(pid: u32, name: &str) -> ProcessSample {
        ProcessSample::new(pid, name, Some(95.0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_primes_then_alerts_once() {
        let provider = Arc::new(ScriptedProvider::steady(vec![hot(42, "build")]));
        let recorder = Recorder::default();
        let monitor = Monitor::new(provider.clone(), thresholds(), Duration::from_secs(5))
            .with_notifier(Box::new(recorder.clone()))
            .with_progress(Box::new(recorder.clone()));

        // 首轮在 t=5 开始跟踪，t=65 告警
        monitor.run(tokio::time::sleep(Duration::from_secs(66))).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 14);
        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![AlertEvent {
                name: "build".to_string(),
                pid: 42,
                cpu_percent: 95.0,
                duration_threshold_secs: 60,
            }]
        );
        let levels = recorder.levels.lock().unwrap();
        assert_eq!(levels.len(), 13);
        assert_eq!(levels.first(), Some(&0));
        assert_eq!(levels.last(), Some(&12));
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_preserves_table() {
        let mut script = Script::new();
        script.push_back(Ok(vec![hot(7, "job")]));
        script.push_back(Err(SampleError::Unavailable("proc unmounted".to_string())));
        let provider = Arc::new(ScriptedProvider::new(script, vec![hot(7, "job")]));
        let recorder = Recorder::default();
        let mut monitor = Monitor::new(provider, thresholds(), Duration::from_secs(5))
            .with_progress(Box::new(recorder.clone()));

        let first = monitor.run_cycle().await;
        assert!(first.sampled);
        let started = monitor.table().get(7).unwrap().first_high_at;

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = monitor.run_cycle().await;
        assert!(!second.sampled);
        assert_eq!(monitor.table().get(7).unwrap().first_high_at, started);
        assert_eq!(second.severity.level, 6);

        tokio::time::advance(Duration::from_secs(30)).await;
        let third = monitor.run_cycle().await;
        assert!(third.sampled);
        assert_eq!(third.events.len(), 1);

        // 采样失败的一轮也会更新进度
        assert_eq!(*recorder.levels.lock().unwrap(), vec![0, 6, 12]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_keeps_alerted_state() {
        let provider = Arc::new(ScriptedProvider::steady(vec![hot(1, "spin")]));
        let failing = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut monitor = Monitor::new(provider, thresholds(), Duration::from_secs(5))
            .with_notifier(Box::new(failing.clone()))
            .with_progress(Box::new(failing.clone()));

        monitor.run_cycle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        let fired = monitor.run_cycle().await;
        assert_eq!(fired.events.len(), 1);
        assert!(monitor.table().get(1).unwrap().alerted);

        tokio::time::advance(Duration::from_secs(5)).await;
        let after = monitor.run_cycle().await;
        assert!(after.events.is_empty());
        assert_eq!(failing.events.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_forwarded_to_notifiers() {
        let mut script = Script::new();
        script.push_back(Ok(vec![hot(3, "loop")]));
        script.push_back(Ok(vec![hot(3, "loop")]));
        let provider = Arc::new(ScriptedProvider::new(script, vec![]));
        let recorder = Recorder::default();
        let mut monitor = Monitor::new(provider, thresholds(), Duration::from_secs(5))
            .with_notifier(Box::new(recorder.clone()));

        monitor.run_cycle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        monitor.run_cycle().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        let report = monitor.run_cycle().await;

        assert!(monitor.table().is_empty());
        assert!(report.sampled);
        assert_eq!(report.severity, Severity::idle());
        assert_eq!(
            report.resolved,
            vec![AlertResolved {
                name: "loop".to_string(),
                pid: 3
            }]
        );
        assert_eq!(
            *recorder.resolved.lock().unwrap(),
            vec![AlertResolved {
                name: "loop".to_string(),
                pid: 3
            }]
        );
    }

    struct Panicking;

    impl ProgressSink for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn set_progress(&mut self, _severity: &Severity) -> Result<(), SinkError> {
            panic!("renderer crashed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_sink_does_not_stop_loop() {
        let provider = Arc::new(ScriptedProvider::steady(vec![hot(4, "hog")]));
        let recorder = Recorder::default();
        let mut monitor = Monitor::new(provider, thresholds(), Duration::from_secs(5))
            .with_notifier(Box::new(recorder.clone()))
            .with_progress(Box::new(Panicking));

        monitor.run_cycle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        let report = monitor.run_cycle().await;

        assert_eq!(report.events.len(), 1);
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
        assert!(monitor.table().get(4).unwrap().alerted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let provider = Arc::new(ScriptedProvider::steady(vec![hot(9, "x")]));
        let monitor = Monitor::new(provider.clone(), thresholds(), Duration::from_secs(5));

        monitor.run(async {}).await;
        // 只有预热采样
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
