//! Fatal conditions raised while pumping a child process.
//!
//! Every variant is terminal for the session that produced it. The only
//! recoverable condition, a transfer that would block, never surfaces here.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::{fmt, io};
use thiserror::Error;

/// One of the three pipes connecting the pump to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The child's standard input.
    Stdin,
    /// The child's standard output.
    Stdout,
    /// The child's standard error.
    Stderr,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        })
    }
}

/// Errors that abort a pump session.
#[derive(Debug, Error, Diagnostic)]
pub enum PumpError {
    /// The child process could not be started.
    #[error("error running child process (cmd = {command}, code = {}): {source}", os_code(.source))]
    #[diagnostic(code(pipepump::spawn))]
    Spawn {
        /// Command the child was meant to run.
        command: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// A pipe of the freshly spawned child could not be made non-blocking.
    #[error("error preparing {channel} of child process (cmd = {command}, code = {}): {source}", os_code(.source))]
    #[diagnostic(code(pipepump::setup))]
    Setup {
        /// Command the child runs.
        command: String,
        /// Pipe that failed.
        channel: Channel,
        /// Underlying OS error.
        source: io::Error,
    },
    /// The readiness poll failed.
    #[error("error while doing poll() for '{command}' ({}): {source}", os_code(.source))]
    #[diagnostic(code(pipepump::poll))]
    Poll {
        /// Command the child runs.
        command: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// Reading stdout or stderr failed with something other than would-block.
    #[error("error while reading {channel} of external process '{command}' ({}): {source}", os_code(.source))]
    #[diagnostic(code(pipepump::read))]
    Read {
        /// Command the child runs.
        command: String,
        /// Pipe being read.
        channel: Channel,
        /// Underlying OS error.
        source: io::Error,
    },
    /// Writing stdin failed with something other than would-block.
    #[error("error while writing to stdin of external process '{command}' ({}): {source}", os_code(.source))]
    #[diagnostic(
        code(pipepump::write),
        help("the child may have exited or closed its stdin before reading all input")
    )]
    Write {
        /// Command the child runs.
        command: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// The child wrote to stderr.
    #[error("external process '{command}' reported error: {message}")]
    #[diagnostic(code(pipepump::child_stderr))]
    ChildStderr {
        /// Command the child runs.
        command: String,
        /// Collected stderr text, truncated to the accumulator capacity.
        message: String,
    },
    /// Retrieving the termination status failed.
    #[error("error retrieving the termination status of '{command}' ({}): {source}", os_code(.source))]
    #[diagnostic(code(pipepump::wait))]
    Wait {
        /// Command the child ran.
        command: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// The child exited normally with a non-zero status.
    #[error("process '{command}' exited with status {code}")]
    #[diagnostic(code(pipepump::exit_status))]
    ExitStatus {
        /// Command the child ran.
        command: String,
        /// Exit status reported by the OS.
        code: i32,
    },
    /// The child was terminated by a signal.
    #[error("process '{command}' killed by signal {signal}{}", core_note(*.core_dumped))]
    #[diagnostic(code(pipepump::signaled))]
    Signaled {
        /// Command the child ran.
        command: String,
        /// Terminating signal number.
        signal: i32,
        /// Whether a core dump was produced.
        core_dumped: bool,
    },
    /// The wait returned a status that is neither an exit nor a signal.
    #[error("internal error: process '{command}' terminated with unexpected status 0x{raw:x}")]
    #[diagnostic(code(pipepump::unexpected_status))]
    UnexpectedStatus {
        /// Command the child ran.
        command: String,
        /// Raw wait status.
        raw: i32,
    },
    /// The pump was driven in a way that cannot make progress.
    #[error("misuse of pump for '{command}': {reason}")]
    #[diagnostic(code(pipepump::misuse))]
    Misuse {
        /// Command the child runs.
        command: String,
        /// What the caller did wrong.
        reason: &'static str,
    },
    /// The session already failed; it cannot be stepped again.
    #[error("pump for '{command}' already failed")]
    #[diagnostic(code(pipepump::aborted))]
    Aborted {
        /// Command the child ran.
        command: String,
    },
}

impl PumpError {
    /// The command whose session raised this error.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. }
            | Self::Setup { command, .. }
            | Self::Poll { command, .. }
            | Self::Read { command, .. }
            | Self::Write { command, .. }
            | Self::ChildStderr { command, .. }
            | Self::Wait { command, .. }
            | Self::ExitStatus { command, .. }
            | Self::Signaled { command, .. }
            | Self::UnexpectedStatus { command, .. }
            | Self::Misuse { command, .. }
            | Self::Aborted { command } => command,
        }
    }
}

fn os_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(0)
}

const fn core_note(core_dumped: bool) -> &'static str {
    if core_dumped { " (core dumped)" } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn spawn_errors_embed_command_and_os_code() {
        let err = PumpError::Spawn {
            command: "gzip -d".into(),
            source: io::Error::from_raw_os_error(2),
        };
        let message = err.to_string();
        assert!(message.contains("cmd = gzip -d"), "{message}");
        assert!(message.contains("code = 2"), "{message}");
    }

    #[rstest]
    #[case(false, "process 'sleep 9' killed by signal 9")]
    #[case(true, "process 'sleep 9' killed by signal 9 (core dumped)")]
    fn signal_errors_note_core_dumps(#[case] core_dumped: bool, #[case] expected: &str) {
        let err = PumpError::Signaled {
            command: "sleep 9".into(),
            signal: 9,
            core_dumped,
        };
        assert_eq!(err.to_string(), expected);
    }

    #[rstest]
    fn unexpected_status_is_reported_in_hex() {
        let err = PumpError::UnexpectedStatus {
            command: "cat".into(),
            raw: 0x137f,
        };
        assert_eq!(
            err.to_string(),
            "internal error: process 'cat' terminated with unexpected status 0x137f"
        );
    }

    #[rstest]
    fn poll_errors_embed_command_and_os_error() {
        let err = PumpError::Poll {
            command: "zcat".into(),
            source: io::Error::from_raw_os_error(22),
        };
        let message = err.to_string();
        assert!(
            message.starts_with("error while doing poll() for 'zcat' (22): "),
            "{message}"
        );
        assert!(message.contains("os error 22"), "{message}");
    }

    #[rstest]
    fn read_errors_name_the_channel() {
        let err = PumpError::Read {
            command: "cat".into(),
            channel: Channel::Stderr,
            source: io::Error::from_raw_os_error(5),
        };
        assert!(err.to_string().starts_with("error while reading stderr"));
        assert_eq!(err.command(), "cat");
    }
}
