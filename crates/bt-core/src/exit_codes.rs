//! Exit codes for the bt-core CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing:
//! - 0: success (including graceful degradation to an empty result)
//! - 1: user/input error (bad arguments, unreadable rows or config)
//! - 2: internal error (inconsistent or intractable network)

use bt_common::{Error, ErrorCategory};

/// Exit codes for bt-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Invalid arguments, rows, or configuration
    UserError = 1,

    /// Structure or CPT inconsistency
    InternalError = 2,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::UserError => "ERR_USER",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// Exit code for an engine error that reached the CLI.
    pub fn for_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Structure => ExitCode::InternalError,
            ErrorCategory::Input
            | ErrorCategory::Dependency
            | ErrorCategory::Validation
            | ErrorCategory::Config
            | ErrorCategory::Io => ExitCode::UserError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
