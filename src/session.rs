//! The pump engine.
//!
//! A [`PumpSession`] adapts a child process into a pull-based stream. The host
//! calls [`PumpSession::step`] repeatedly with its own input and output
//! buffers; each step polls once, moves at most one chunk per pipe, and tells
//! the host what it must do next.

use std::time::Instant;

use tracing::{debug, trace};

use crate::{
    accumulator::{ErrorAccumulator, StderrVerdict},
    buffer::CursorBuffer,
    config::PumpConfig,
    error::{Channel, PumpError},
    exit::interpret_exit,
    process::{
        PipeState, ProcessHandle,
        poll::poll_readiness,
        transfer::{Transfer, read_chunk, write_chunk},
    },
};

/// What the host must do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSignal {
    /// Nothing to do; call `step` again.
    KeepGoing,
    /// The input buffer is consumed: refill it or signal end of input.
    InputNeeded,
    /// The output buffer is full: drain it.
    OutputNeeded,
    /// The child closed every pipe and exited successfully.
    Done,
}

/// Whether the host has more input to supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// More input may follow the current buffer.
    Pending,
    /// The current buffer is the last input.
    EndOfInput,
}

impl InputState {
    const fn is_exhausted(self) -> bool {
        matches!(self, Self::EndOfInput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Done,
    Failed,
}

/// One child process driven through setup, steps and teardown.
///
/// Dropping the session tears it down.
#[derive(Debug)]
pub struct PumpSession {
    command: String,
    env: Vec<String>,
    config: PumpConfig,
    process: Option<ProcessHandle>,
    stderr: ErrorAccumulator,
    phase: Phase,
}

impl PumpSession {
    /// Prepares a session for `command` with `env` (`NAME=VALUE` entries) as
    /// the child's complete environment. Nothing is spawned until
    /// [`Self::setup`].
    #[must_use]
    pub fn new(command: impl Into<String>, env: Vec<String>, config: PumpConfig) -> Self {
        let stderr = ErrorAccumulator::new(config.stderr_capacity);
        Self {
            command: command.into(),
            env,
            config,
            process: None,
            stderr,
            phase: Phase::Idle,
        }
    }

    /// The command string the child runs.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Process id of the child, once spawned.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(ProcessHandle::pid)
    }

    /// Stderr bytes collected so far.
    #[must_use]
    pub const fn stderr(&self) -> &ErrorAccumulator {
        &self.stderr
    }

    /// Lifecycle of each pipe as `[stdin, stdout, stderr]`, once spawned.
    #[must_use]
    pub fn pipe_states(&self) -> Option<[PipeState; 3]> {
        self.process.as_ref().map(|process| {
            [
                process.stdin.state(),
                process.stdout.state(),
                process.stderr.state(),
            ]
        })
    }

    /// Spawns the child.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Spawn`] if the process cannot be started,
    /// [`PumpError::Setup`] if its pipes cannot be made non-blocking, and
    /// [`PumpError::Misuse`] if the session was already set up or the stderr
    /// capacity is zero.
    pub fn setup(&mut self) -> Result<(), PumpError> {
        if self.phase != Phase::Idle {
            return Err(self.misuse("setup called twice"));
        }
        // A zero-capacity accumulator never reads stderr, so its EOF is never
        // observed and the child is never reaped.
        if self.stderr.capacity() == 0 {
            self.phase = Phase::Failed;
            return Err(self.misuse("stderr capacity must be at least one byte"));
        }
        match ProcessHandle::spawn(&self.command, &self.env, &self.config) {
            Ok(process) => {
                self.process = Some(process);
                self.phase = Phase::Running;
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    /// Performs one pump step.
    ///
    /// Bytes from `input` after its offset are written to the child's stdin
    /// and the offset advanced by what was accepted. Bytes read from the
    /// child's stdout land in `output` after its offset. `input_state` tells
    /// the pump whether `input` is the last of the data.
    ///
    /// # Errors
    ///
    /// Every error is fatal: the session is marked failed and any further
    /// call returns [`PumpError::Aborted`]. Stepping with a full output
    /// buffer, a consumed input buffer and more input pending is
    /// [`PumpError::Misuse`].
    pub fn step<I, O>(
        &mut self,
        input: &mut CursorBuffer<I>,
        input_state: InputState,
        output: &mut CursorBuffer<O>,
    ) -> Result<StreamSignal, PumpError>
    where
        I: AsRef<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        match self.phase {
            Phase::Done => return Ok(StreamSignal::Done),
            Phase::Failed => {
                return Err(PumpError::Aborted {
                    command: self.command.clone(),
                });
            }
            Phase::Idle | Phase::Running => {}
        }
        let result = self.pump(input, input_state, output);
        match result {
            Ok(StreamSignal::Done) => self.phase = Phase::Done,
            Ok(_) => {}
            Err(_) => self.phase = Phase::Failed,
        }
        result
    }

    fn pump<I, O>(
        &mut self,
        input: &mut CursorBuffer<I>,
        input_state: InputState,
        output: &mut CursorBuffer<O>,
    ) -> Result<StreamSignal, PumpError>
    where
        I: AsRef<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        if output.is_exhausted() && input.is_exhausted() && !input_state.is_exhausted() {
            return Err(self.misuse("can neither read nor write; output is full and input is empty"));
        }
        let Some(process) = self.process.as_mut() else {
            return Err(PumpError::Misuse {
                command: self.command.clone(),
                reason: "step called before setup",
            });
        };
        let command = self.command.as_str();

        let ready = poll_readiness(process, self.config.poll_timeout).map_err(|source| {
            PumpError::Poll {
                command: command.to_owned(),
                source,
            }
        })?;

        // Closing stdin while input is still being written can mask the
        // readable event that carries EOF on some platforms.
        if input_state.is_exhausted() && input.is_exhausted() && process.stdin.is_open() {
            process.stdin.close(PipeState::ClosedByUs);
            debug!(pid = process.pid(), "closed child stdin");
        }

        if ready.stderr_readable && !self.stderr.is_full() {
            drain_stderr(process, &mut self.stderr, command)?;
        }

        if ready.stdin_writable && !input.is_exhausted() {
            if let Some(stdin) = process.stdin.get_mut() {
                let moved = write_chunk(stdin, input.unread()).map_err(|source| {
                    PumpError::Write {
                        command: command.to_owned(),
                        source,
                    }
                })?;
                if let Transfer::Moved(count) = moved {
                    input.advance(count);
                    trace!(bytes = count, "wrote child stdin");
                }
            }
        }

        if ready.stdout_readable && !output.is_exhausted() {
            if let Some(stdout) = process.stdout.get_mut() {
                let moved = read_chunk(stdout, output.spare_mut()).map_err(|source| {
                    PumpError::Read {
                        command: command.to_owned(),
                        channel: Channel::Stdout,
                        source,
                    }
                })?;
                match moved {
                    Transfer::Moved(count) => {
                        output.advance(count);
                        trace!(bytes = count, "read child stdout");
                    }
                    Transfer::Closed => {
                        process.stdout.close(PipeState::ClosedByPeer);
                        debug!(pid = process.pid(), "child closed stdout");
                    }
                    Transfer::WouldBlock => {}
                }
            }
        }

        let verdict = self.stderr.verdict(
            Instant::now(),
            self.config.stderr_grace,
            process.stderr.is_open(),
        );
        match verdict {
            StderrVerdict::Collecting => return Ok(StreamSignal::KeepGoing),
            StderrVerdict::Fatal => {
                return Err(PumpError::ChildStderr {
                    command: command.to_owned(),
                    message: self.stderr.message(),
                });
            }
            StderrVerdict::Clean => {}
        }

        if process.all_closed() {
            if let Some(waited) = process.reap() {
                interpret_exit(command, waited)?;
            }
            return Ok(StreamSignal::Done);
        }
        if !input_state.is_exhausted() && input.is_exhausted() && process.stdin.is_open() {
            return Ok(StreamSignal::InputNeeded);
        }
        if output.is_exhausted() && process.stdout.is_open() {
            return Ok(StreamSignal::OutputNeeded);
        }
        Ok(StreamSignal::KeepGoing)
    }

    /// Closes the pipes still open and waits for the child unless it was
    /// already reaped. Safe to call more than once.
    ///
    /// The child is never killed, so a child that does not exit once its
    /// pipes are closed blocks this call.
    pub fn teardown(&mut self) {
        if let Some(process) = self.process.as_mut() {
            process.teardown();
        }
        if self.phase == Phase::Running || self.phase == Phase::Idle {
            self.phase = Phase::Failed;
        }
    }

    /// True once the child has been reaped.
    #[must_use]
    pub fn is_reaped(&self) -> bool {
        self.process.as_ref().is_some_and(ProcessHandle::is_reaped)
    }

    fn misuse(&self, reason: &'static str) -> PumpError {
        PumpError::Misuse {
            command: self.command.clone(),
            reason,
        }
    }
}

impl Drop for PumpSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn drain_stderr(
    process: &mut ProcessHandle,
    stderr: &mut ErrorAccumulator,
    command: &str,
) -> Result<(), PumpError> {
    let Some(pipe) = process.stderr.get_mut() else {
        return Ok(());
    };
    let moved = read_chunk(pipe, stderr.spare_mut()).map_err(|source| PumpError::Read {
        command: command.to_owned(),
        channel: Channel::Stderr,
        source,
    })?;
    match moved {
        Transfer::Moved(count) => {
            stderr.commit(count, Instant::now());
            debug!(pid = process.pid(), bytes = count, "child wrote to stderr");
        }
        Transfer::Closed => {
            process.stderr.close(PipeState::ClosedByPeer);
            debug!(pid = process.pid(), "child closed stderr");
        }
        Transfer::WouldBlock => {}
    }
    Ok(())
}
