//! The child process and the three pipes connecting it to the pump.
//!
//! A [`ProcessHandle`] is the unit of lifetime management: it is created by
//! [`ProcessHandle::spawn`] and released by [`ProcessHandle::teardown`].

use std::{
    io,
    os::fd::AsFd,
    process::{Child, ChildStderr, ChildStdin, ChildStdout, ExitStatus},
};

use rustix::fs::{OFlags, fcntl_getfl, fcntl_setfl};
use tracing::debug;

use crate::{
    config::PumpConfig,
    error::{Channel, PumpError},
};

pub(crate) mod command;
pub(crate) mod poll;
pub(crate) mod transfer;

use command::CommandLine;

/// Lifecycle of one pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    /// The descriptor is held and may be polled.
    Open,
    /// We closed our end (a stdin half-close, or teardown).
    ClosedByUs,
    /// The child closed its end; observed as a zero-length read.
    ClosedByPeer,
}

/// A pipe end that moves from open to closed exactly once.
#[derive(Debug)]
pub(crate) struct Pipe<T> {
    end: Option<T>,
    state: PipeState,
}

impl<T> Pipe<T> {
    fn new(end: Option<T>) -> Self {
        let state = if end.is_some() {
            PipeState::Open
        } else {
            PipeState::ClosedByUs
        };
        Self { end, state }
    }

    pub(crate) const fn state(&self) -> PipeState {
        self.state
    }

    pub(crate) const fn is_open(&self) -> bool {
        matches!(self.state, PipeState::Open)
    }

    pub(crate) const fn get(&self) -> Option<&T> {
        self.end.as_ref()
    }

    pub(crate) const fn get_mut(&mut self) -> Option<&mut T> {
        self.end.as_mut()
    }

    /// Drops the descriptor. Has no effect on an already closed pipe.
    pub(crate) fn close(&mut self, state: PipeState) {
        if self.end.take().is_some() {
            self.state = state;
        }
    }
}

/// The spawned child plus its three pipe ends.
#[derive(Debug)]
pub(crate) struct ProcessHandle {
    child: Child,
    pub(crate) stdin: Pipe<ChildStdin>,
    pub(crate) stdout: Pipe<ChildStdout>,
    pub(crate) stderr: Pipe<ChildStderr>,
    reaped: bool,
}

impl ProcessHandle {
    /// Starts `command` through the configured shell and wrapper with exactly
    /// `env` as its environment, and makes all three pipes non-blocking.
    pub(crate) fn spawn(
        command: &str,
        env: &[String],
        config: &PumpConfig,
    ) -> Result<Self, PumpError> {
        let line = CommandLine::new(command, config);
        let mut child = line
            .to_command(env)
            .spawn()
            .map_err(|source| PumpError::Spawn {
                command: command.to_owned(),
                source,
            })?;
        debug!(pid = child.id(), program = %line.program, args = ?line.args, "spawned child");

        let mut handle = Self {
            stdin: Pipe::new(child.stdin.take()),
            stdout: Pipe::new(child.stdout.take()),
            stderr: Pipe::new(child.stderr.take()),
            child,
            reaped: false,
        };
        if let Err(err) = handle.set_nonblocking(command) {
            handle.teardown();
            return Err(err);
        }
        Ok(handle)
    }

    fn set_nonblocking(&self, command: &str) -> Result<(), PumpError> {
        let ends = [
            (Channel::Stdin, self.stdin.get().map(AsFd::as_fd)),
            (Channel::Stdout, self.stdout.get().map(AsFd::as_fd)),
            (Channel::Stderr, self.stderr.get().map(AsFd::as_fd)),
        ];
        for (channel, fd) in ends {
            let Some(fd) = fd else { continue };
            let flags = fcntl_getfl(fd).and_then(|flags| fcntl_setfl(fd, flags | OFlags::NONBLOCK));
            flags.map_err(|errno| PumpError::Setup {
                command: command.to_owned(),
                channel,
                source: errno.into(),
            })?;
        }
        Ok(())
    }

    /// OS process id of the child.
    pub(crate) fn pid(&self) -> u32 {
        self.child.id()
    }

    /// True once the child's exit status has been collected.
    pub(crate) const fn is_reaped(&self) -> bool {
        self.reaped
    }

    /// True once no pipe is open.
    pub(crate) const fn all_closed(&self) -> bool {
        !self.stdin.is_open() && !self.stdout.is_open() && !self.stderr.is_open()
    }

    /// Waits for the child to terminate. The wait is attempted at most once.
    pub(crate) fn reap(&mut self) -> Option<io::Result<ExitStatus>> {
        if self.reaped {
            return None;
        }
        self.reaped = true;
        let status = self.child.wait();
        debug!(pid = self.pid(), ?status, "reaped child");
        Some(status)
    }

    /// Closes every pipe still open and waits for the child if it has not
    /// been reaped, without inspecting its status.
    ///
    /// The child is never signalled: it may run under a lower-privilege
    /// identity the caller cannot signal, so a hung child blocks here.
    pub(crate) fn teardown(&mut self) {
        self.stdin.close(PipeState::ClosedByUs);
        self.stdout.close(PipeState::ClosedByUs);
        self.stderr.close(PipeState::ClosedByUs);
        if let Some(Err(err)) = self.reap() {
            tracing::warn!(pid = self.pid(), error = %err, "failed to reap child during teardown");
        }
    }
}
