use crate::exit_codes::ExitCode;

/// A run that ended before producing a summary, tagged with the exit code it maps to.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{0:#}")]
    InvalidInput(anyhow::Error),

    #[error("{0:#}")]
    Runtime(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Runtime(_) => ExitCode::RuntimeError,
        }
    }

    pub(crate) fn from_core(err: carga_core::Error, context: &'static str) -> Self {
        let invalid = err.is_invalid_input();
        Self::classified(invalid, anyhow::Error::new(err).context(context))
    }

    pub(crate) fn from_scenario(err: carga_serverest::Error, context: &'static str) -> Self {
        let invalid = err.is_invalid_input();
        Self::classified(invalid, anyhow::Error::new(err).context(context))
    }

    fn classified(invalid_input: bool, err: anyhow::Error) -> Self {
        if invalid_input {
            Self::InvalidInput(err)
        } else {
            Self::Runtime(err)
        }
    }
}
