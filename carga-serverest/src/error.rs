pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] carga_core::Error),

    #[error("fixture `{0}` has no products")]
    EmptyFixture(String),
}

impl Error {
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::Core(err) => err.is_invalid_input(),
            Self::EmptyFixture(_) => true,
        }
    }
}
