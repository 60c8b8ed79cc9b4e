//! Classification of the child's termination.

use std::{io, os::unix::process::ExitStatusExt, process::ExitStatus};

use crate::error::PumpError;

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with status 0.
    Success,
    /// Normal exit with a non-zero status.
    Failed(i32),
    /// Terminated by a signal.
    Signaled {
        /// Signal number.
        signal: i32,
        /// Whether a core dump was produced.
        core_dumped: bool,
    },
    /// Any other wait status, reported raw.
    Unexpected(i32),
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            if code == 0 {
                Self::Success
            } else {
                Self::Failed(code)
            }
        } else if let Some(signal) = status.signal() {
            Self::Signaled {
                signal,
                core_dumped: status.core_dumped(),
            }
        } else {
            Self::Unexpected(status.into_raw())
        }
    }
}

/// Turns the result of reaping `command` into success or a fatal error.
pub(crate) fn interpret_exit(
    command: &str,
    waited: io::Result<ExitStatus>,
) -> Result<(), PumpError> {
    let command = command.to_owned();
    let status = waited.map_err(|source| PumpError::Wait {
        command: command.clone(),
        source,
    })?;
    match ExitOutcome::from(status) {
        ExitOutcome::Success => Ok(()),
        ExitOutcome::Failed(code) => Err(PumpError::ExitStatus { command, code }),
        ExitOutcome::Signaled {
            signal,
            core_dumped,
        } => Err(PumpError::Signaled {
            command,
            signal,
            core_dumped,
        }),
        ExitOutcome::Unexpected(raw) => Err(PumpError::UnexpectedStatus { command, raw }),
    }
}
