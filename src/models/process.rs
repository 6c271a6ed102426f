/// 单次采样中的一个进程
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    /// 进程 ID（同一次采样内唯一，操作系统会复用）
    pub pid: u32,
    /// 进程名称（不唯一）
    pub name: String,
    /// CPU 使用率 (百分比，多核时可超过 100)
    ///
    /// `None` 表示本轮没有有效数据，该进程本轮被跳过
    pub cpu_percent: Option<f32>,
}

impl ProcessSample {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: Option<f32>) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_percent,
        }
    }
}
