//! A host loop driving a pump session between two blocking streams.
//!
//! This is what a load/filter framework does with a [`PumpSession`]: it
//! forwards its own input into the session, honours the returned
//! [`StreamSignal`], and hands the child's output on.

mod error;

pub use error::RunError;

use std::io::{self, ErrorKind, Read, Write};

use tracing::debug;

use crate::{
    buffer::CursorBuffer,
    session::{InputState, PumpSession, StreamSignal},
};

/// Default size of the input and output buffers used by [`run_filter`].
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Byte counts moved by [`run_filter`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    /// Bytes read from the input stream and handed to the child.
    pub bytes_in: u64,
    /// Bytes received from the child and written to the output stream.
    pub bytes_out: u64,
}

/// Spawns the session's child, streams `reader` through it into `writer`,
/// and always tears the session down.
///
/// # Errors
///
/// Returns [`RunError::Pump`] when the session fails, and
/// [`RunError::Input`]/[`RunError::Output`] when the host streams fail.
pub fn run_filter<R, W>(
    session: &mut PumpSession,
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> Result<FilterStats, RunError>
where
    R: Read,
    W: Write,
{
    let result = session
        .setup()
        .map_err(RunError::from)
        .and_then(|()| drive(session, reader, writer, buffer_size.max(1)));
    session.teardown();
    if let Ok(stats) = &result {
        debug!(command = session.command(), ?stats, "filter finished");
    }
    result
}

fn drive<R, W>(
    session: &mut PumpSession,
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> Result<FilterStats, RunError>
where
    R: Read,
    W: Write,
{
    let mut stats = FilterStats::default();
    let mut input = CursorBuffer::new(Vec::new());
    let mut output = CursorBuffer::new(vec![0_u8; buffer_size]);
    let mut input_state = InputState::Pending;

    loop {
        match session.step(&mut input, input_state, &mut output)? {
            StreamSignal::KeepGoing => {}
            StreamSignal::OutputNeeded => flush(writer, &mut output, &mut stats)?,
            StreamSignal::InputNeeded => {
                flush(writer, &mut output, &mut stats)?;
                let chunk = refill(reader, buffer_size)?;
                if chunk.is_empty() {
                    input_state = InputState::EndOfInput;
                }
                stats.bytes_in = stats.bytes_in.saturating_add(chunk.len() as u64);
                input.replace(chunk);
            }
            StreamSignal::Done => {
                flush(writer, &mut output, &mut stats)?;
                writer.flush().map_err(RunError::Output)?;
                return Ok(stats);
            }
        }
    }
}

fn flush<W: Write>(
    writer: &mut W,
    output: &mut CursorBuffer<Vec<u8>>,
    stats: &mut FilterStats,
) -> Result<(), RunError> {
    let filled = output.filled();
    if filled.is_empty() {
        return Ok(());
    }
    writer.write_all(filled).map_err(RunError::Output)?;
    stats.bytes_out = stats.bytes_out.saturating_add(filled.len() as u64);
    output.reset();
    Ok(())
}

fn refill<R: Read>(reader: &mut R, buffer_size: usize) -> Result<Vec<u8>, RunError> {
    let mut chunk = vec![0_u8; buffer_size];
    let count = loop {
        match reader.read(&mut chunk) {
            Ok(count) => break count,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(RunError::Input(err)),
        }
    };
    chunk.truncate(count);
    Ok(chunk)
}

/// Streams the process's stdin through `session` into its stdout.
///
/// # Errors
///
/// See [`run_filter`].
pub fn run_stdio_filter(
    session: &mut PumpSession,
    buffer_size: usize,
) -> Result<FilterStats, RunError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_filter(session, &mut stdin.lock(), &mut stdout.lock(), buffer_size)
}
