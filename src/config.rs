use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the exiftool executable in [`ExifToolConfig::from_env`].
pub const EXIFTOOL_PATH_ENV: &str = "EXIFTOOL_PATH";

const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_TASKS_PER_PROCESS: usize = 500;
const DEFAULT_MAX_RESTARTS_PER_MINUTE: usize = 10;
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Settings for an [`ExifTool`](crate::ExifTool) handle and the worker process behind it.
///
/// ```
/// use exiftool_async::ExifToolConfig;
/// use std::time::Duration;
///
/// let config = ExifToolConfig::default()
///     .with_executable("/usr/local/bin/exiftool")
///     .with_task_timeout(Duration::from_secs(5))
///     .with_common_args(["-charset", "filename=utf8"]);
/// assert_eq!(config.common_args().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ExifToolConfig {
    executable: PathBuf,
    common_args: Vec<String>,
    task_timeout: Duration,
    shutdown_timeout: Duration,
    max_tasks_per_process: usize,
    max_restarts_per_minute: usize,
    queue_capacity: usize,
}

impl Default for ExifToolConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("exiftool"),
            common_args: Vec::new(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_tasks_per_process: DEFAULT_MAX_TASKS_PER_PROCESS,
            max_restarts_per_minute: DEFAULT_MAX_RESTARTS_PER_MINUTE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ExifToolConfig {
    /// Defaults, with the executable taken from `EXIFTOOL_PATH` when it is set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(EXIFTOOL_PATH_ENV) {
            Some(path) if !path.is_empty() => config.with_executable(path),
            _ => config,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Arguments prepended to every request, e.g. `-charset filename=utf8`.
    pub fn with_common_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// How long a single request may stay in flight before it is rejected
    /// and the worker is considered wedged.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Recycle the worker after this many requests. `0` disables recycling.
    pub fn with_max_tasks_per_process(mut self, tasks: usize) -> Self {
        self.max_tasks_per_process = tasks;
        self
    }

    pub fn with_max_restarts_per_minute(mut self, restarts: usize) -> Self {
        self.max_restarts_per_minute = restarts;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn common_args(&self) -> &[String] {
        &self.common_args
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn max_tasks_per_process(&self) -> usize {
        self.max_tasks_per_process
    }

    pub fn max_restarts_per_minute(&self) -> usize {
        self.max_restarts_per_minute
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Period of the timeout sweep: a quarter of the task timeout, kept between 10ms and 1s.
    pub(crate) fn sweep_interval(&self) -> Duration {
        (self.task_timeout / 4).clamp(Duration::from_millis(10), Duration::from_secs(1))
    }
}
