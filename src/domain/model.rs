use std::fmt;

/// One library as reported by the catalog, before it becomes a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescription {
    pub name: String,
    pub author: String,
    pub license: String,
    /// Archive size in bytes
    pub size: u64,
    pub installed: bool,
    pub url: String,
    pub description: String,
    /// Directory the library unpacks into below the clip library dir
    pub toplevel: String,
}

/// Identifies a row in the library model by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowPath(pub usize);

impl fmt::Display for RowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Downloading,
}

/// State of a single transfer as reported by its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Failed | TransferStatus::Cancelled
        )
    }
}

/// Whether a row's poll timer should keep firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}
