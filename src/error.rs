/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or driving a benchmark run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A worker thread of the team could not be started.
    #[error("can't spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A schedule description could not be parsed.
    #[error("invalid schedule: {0}")]
    Schedule(String),

    /// The benchmark configuration is not usable.
    #[error("config error: {0}")]
    Config(String),

    /// A kernel was asked to sweep rows outside of the matrix.
    #[error("row range {start}..{end} is outside of 0..{rows}")]
    RowRange {
        /// First requested row.
        start: usize,
        /// One past the last requested row.
        end: usize,
        /// Number of rows the workload holds.
        rows: usize,
    },
}

impl Error {
    pub(crate) fn schedule<S: Into<String>>(msg: S) -> Self {
        Error::Schedule(msg.into())
    }

    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
