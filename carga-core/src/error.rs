pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`vus` must be a positive integer")]
    InvalidVus,

    #[error("`iterations` must be a positive integer")]
    InvalidIterations,

    #[error("`stages` must be a non-empty list of {{ duration, target }} with a non-zero total duration")]
    InvalidStages,

    #[error("invalid threshold expression for metric `{metric}`: {error}")]
    InvalidThreshold { metric: String, error: String },

    #[error("invalid output path: `{0}`")]
    InvalidOutputPath(String),

    #[error("failed to read fixture `{path}`: {source}")]
    FixtureRead {
        path: String,
        source: std::io::Error,
    },

    #[error("fixture `{path}` is not a valid JSON array: {source}")]
    FixtureParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to render report: {0}")]
    Render(#[from] askama::Error),

    #[error("summary hook failed: {0}")]
    SummaryHook(String),
}

impl Error {
    /// Errors caused by user-supplied options, fixtures or flags rather than the run itself.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidVus
                | Self::InvalidIterations
                | Self::InvalidStages
                | Self::InvalidThreshold { .. }
                | Self::InvalidOutputPath(_)
                | Self::FixtureRead { .. }
                | Self::FixtureParse { .. }
        )
    }
}
