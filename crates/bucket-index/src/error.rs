#[derive(Debug, thiserror::Error)]
pub enum BucketIndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Path is not under the index root: {0}")]
    PathNotUnderRoot(String),

    #[error("No file in the directory: {0}")]
    MissingAncestor(String),

    #[error("Range is empty or no longer valid")]
    RangeExhausted,

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

pub type Result<T> = std::result::Result<T, BucketIndexError>;

impl BucketIndexError {
    /// True for errors caused by one unusable entry, such as an overlong
    /// name or a file standing where a directory is expected. Batch
    /// operations skip such entries and carry on.
    pub fn is_entry_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::NotADirectory(_) | Self::AlreadyExists(_)
        )
    }
}
