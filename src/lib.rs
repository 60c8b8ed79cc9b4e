//! Pipepump core library.
//!
//! This library adapts an external child process into a pull-based byte
//! stream. A [`PumpSession`] spawns the child with all three standard pipes
//! non-blocking, then moves bytes between caller-owned [`CursorBuffer`]s and
//! those pipes one bounded, non-blocking step at a time. Any output on the
//! child's stderr, a non-zero exit, or death by signal aborts the session with
//! a [`PumpError`].

#[cfg(not(unix))]
compile_error!("pipepump drives Unix pipes and only builds on Unix targets");

pub mod accumulator;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod error;
pub mod exit;
pub mod runner;
pub mod session;

mod process;

pub use accumulator::{ErrorAccumulator, StderrVerdict};
pub use buffer::CursorBuffer;
pub use config::{PrivilegeDrop, PumpConfig};
pub use error::{Channel, PumpError};
pub use exit::ExitOutcome;
pub use process::PipeState;
pub use session::{InputState, PumpSession, StreamSignal};
