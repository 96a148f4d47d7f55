use std::fmt;
use std::time::Instant;

use crate::log::error::{LogError, Result};

/// 累计计时器
///
/// 统计一段逻辑在多次 start/stop 之间的总耗时。创建时即开始计时。
#[derive(Debug, Clone)]
pub struct Timer {
    last_mark: Instant,
    duration: f64,
    running: bool,
    description: String,
    timeout: f64,
    raise_on_timeout: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            last_mark: Instant::now(),
            duration: 0.0,
            running: true,
            description: String::new(),
            timeout: 0.0,
            raise_on_timeout: false,
        }
    }

    /// 重新标记起点
    pub fn start(&mut self) -> &mut Self {
        self.last_mark = Instant::now();
        self.running = true;
        self
    }

    /// 把上次标记以来的耗时计入总耗时
    ///
    /// 已停止时什么都不做。开启超时错误且总耗时超过上限时返回 `LogError::Timeout`
    pub fn stop(&mut self) -> Result<&mut Self> {
        if self.running {
            let now = Instant::now();
            self.duration += now.duration_since(self.last_mark).as_secs_f64();
            self.last_mark = now;
            self.running = false;

            if self.raise_on_timeout && self.is_timeout() {
                return Err(LogError::Timeout {
                    description: self.description.clone(),
                    duration: self.duration,
                });
            }
        }
        Ok(self)
    }

    /// 清零总耗时，不影响起点
    pub fn reset(&mut self) -> &mut Self {
        self.duration = 0.0;
        self
    }

    /// 只有第一次设置的非空描述生效
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        if self.description.is_empty() {
            self.description = description.into();
        }
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// 总耗时（秒）
    pub fn total_spend(&self) -> f64 {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 超时上限（秒），0 表示不检查
    pub fn set_timeout(&mut self, seconds: f64) -> &mut Self {
        self.timeout = seconds;
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout > 0.0 && self.duration > self.timeout
    }

    pub fn enable_timeout_error(&mut self) -> &mut Self {
        self.raise_on_timeout = true;
        self
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} spent: {:.2} sec", self.description, self.duration)
    }
}

/// 简单的分段计时
#[derive(Debug, Default)]
pub struct TimerHandler {
    last_watch: Option<Instant>,
}

impl TimerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重置计时起点
    pub fn watch(&mut self) {
        self.last_watch = Some(Instant::now());
    }

    /// 返回距上次 watch/timing 的间隔，格式 `"<message> <秒数:.3> sec"`
    ///
    /// 从未 watch 时以本次调用为起点
    pub fn timing(&mut self, message: &str) -> String {
        let now = Instant::now();
        let last = *self.last_watch.get_or_insert(now);
        self.last_watch = Some(now);
        format!("{} {:.3} sec", message, now.duration_since(last).as_secs_f64())
    }

    /// 创建 n 个互相独立的计时器
    pub fn create_timers(&self, count: usize) -> Vec<Timer> {
        (0..count).map(|_| Timer::new()).collect()
    }
}
