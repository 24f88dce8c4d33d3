//! Fatal error type for the analysis pipeline.
//!
//! Only conditions that stop the whole run become an `AppError`. Recoverable
//! conditions (empty groups, underdetermined fits) are carried as typed
//! diagnostics in `domain` and surfaced in the run summary instead.

/// Exit code for usage and I/O errors (bad flags, unreadable paths).
pub const EXIT_USAGE: u8 = 2;
/// Exit code for the no-valid-data condition: nothing survived cleaning.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for internal failures (non-finite math, render errors).
pub const EXIT_INTERNAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
