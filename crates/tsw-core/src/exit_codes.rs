//! Exit codes for the `tsw` CLI.
//!
//! Stable so scripts can branch on the outcome without parsing output.

/// Exit codes for tsw operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed; for `replay`, every entry settled.
    Clean = 0,

    /// Replay ran out of attempts with entries still pending retry.
    Unsettled = 1,

    /// Replay finished with some entries dropped by the failure policy
    Dropped = 2,

    /// Replay escalated to a fatal pipeline abort
    Fatal = 3,

    /// Configuration error
    ConfigError = 10,

    /// Malformed input (error or scenario JSON)
    InputError = 11,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Dropped)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&tsw_common::Error> for ExitCode {
    fn from(err: &tsw_common::Error) -> Self {
        use tsw_common::Error;
        match err {
            Error::Config(_) | Error::InvalidConfigFile { .. } => ExitCode::ConfigError,
            Error::InvalidInput(_) | Error::Json(_) => ExitCode::InputError,
            Error::Io(_) => ExitCode::IoError,
            Error::Submission(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
