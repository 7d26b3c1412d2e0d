//! Where template text comes from.
//!
//! The resolver reads every template through a [`TemplateSource`]. Production
//! code uses [`FsSource`] (non-blocking `tokio::fs` reads); tests wrap it to
//! inject I/O delays or count reads.

use std::future::Future;
use std::path::Path;

/// Asynchronous reader of template files.
pub trait TemplateSource: Send + Sync + 'static {
    /// Read the whole template at `path` as UTF-8 text.
    fn read(&self, path: &Path) -> impl Future<Output = std::io::Result<String>> + Send;
}

/// Reads templates from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl TemplateSource for FsSource {
    fn read(&self, path: &Path) -> impl Future<Output = std::io::Result<String>> + Send {
        let path = path.to_path_buf();
        async move { tokio::fs::read_to_string(path).await }
    }
}
