//! A template source that can slow down, fail, and count reads.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::resolver::TemplateSource;

/// Filesystem-backed [`TemplateSource`] with per-file behaviour, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct InstrumentedSource {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    reads: Arc<Mutex<HashMap<String, usize>>>,
}

impl InstrumentedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every read without a specific delay.
    #[must_use]
    pub const fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Delay reads of files named `file_name`.
    #[must_use]
    pub fn with_delay(mut self, file_name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(file_name.into(), delay);
        self
    }

    /// Make reads of files named `file_name` fail with `PermissionDenied`.
    #[must_use]
    pub fn failing(mut self, file_name: impl Into<String>) -> Self {
        self.failing.insert(file_name.into());
        self
    }

    /// How many times a file named `file_name` was read.
    #[must_use]
    pub fn reads(&self, file_name: &str) -> usize {
        self.lock().get(file_name).copied().unwrap_or(0)
    }

    /// Total reads across all files.
    #[must_use]
    pub fn total_reads(&self) -> usize {
        self.lock().values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.reads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TemplateSource for InstrumentedSource {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        *self.lock().entry(name.clone()).or_default() += 1;

        let delay = self.delays.get(&name).copied().unwrap_or(self.default_delay);
        let fail = self.failing.contains(&name);
        let path = path.to_path_buf();
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, format!("{name} is unreadable")));
            }
            tokio::fs::read_to_string(path).await
        }
    }
}
