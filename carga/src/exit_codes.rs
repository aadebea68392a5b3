#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more thresholds failed.
    ThresholdsFailed = 11,

    /// Bad flags, an unreadable or malformed fixture, invalid options or threshold syntax.
    InvalidInput = 30,

    /// I/O while writing reports, VU task failures.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Failed checks are reported but never fail the run on their own.
    #[must_use]
    pub fn from_thresholds(thresholds_passed: bool) -> Self {
        if thresholds_passed {
            Self::Success
        } else {
            Self::ThresholdsFailed
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // Every variant fits in a byte.
        Self::from(u8::try_from(code.as_i32()).unwrap_or(u8::MAX))
    }
}
