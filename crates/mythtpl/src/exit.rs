use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    Success,
    Error,
}

/// Outcome of a command: a status plus an optional closing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    status: ExitStatus,
    message: Option<String>,
}

impl Exit {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: ExitStatus::Success,
            message: None,
        }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            status: ExitStatus::Error,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Print the message (stdout on success, stderr on error) and convert to
    /// a process exit code.
    pub fn report(self, quiet: bool) -> ExitCode {
        match (self.status, self.message) {
            (ExitStatus::Success, Some(message)) if !quiet => println!("{message}"),
            (ExitStatus::Error, Some(message)) => eprintln!("{message}"),
            _ => {}
        }
        match self.status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Error => ExitCode::FAILURE,
        }
    }
}
