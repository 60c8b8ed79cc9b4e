//! Test utilities for driving pump sessions against real shell children.
//!
//! All children run through `/bin/sh` with the privilege wrapper disabled and
//! a minimal `PATH`, so the tests need no `sudo` configuration.

use pipepump::{
    CursorBuffer, InputState, PrivilegeDrop, PumpConfig, PumpError, PumpSession, StreamSignal,
};
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::fmt;

/// Environment entry giving the child a usable `PATH`.
pub const PATH_ENV: &str = "PATH=/usr/bin:/bin";

/// Upper bound on how long a helper keeps stepping one session.
const STEP_DEADLINE: Duration = Duration::from_secs(20);

/// Installs a test-writer subscriber so session logs show up on failure.
pub fn init_tracing() {
    let _ignored = fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Configuration running the shell directly as the test user.
pub fn direct_config() -> PumpConfig {
    PumpConfig::default().with_privilege(PrivilegeDrop::Disabled)
}

/// A set-up session running `command` with only [`PATH_ENV`].
pub fn spawn(command: &str, config: PumpConfig) -> PumpSession {
    init_tracing();
    let mut session = PumpSession::new(command, vec![PATH_ENV.to_owned()], config);
    session.setup().expect("spawn child");
    session
}

/// Steps until the session reports something other than
/// [`StreamSignal::KeepGoing`].
pub fn step_until_signal<I, O>(
    session: &mut PumpSession,
    input: &mut CursorBuffer<I>,
    input_state: InputState,
    output: &mut CursorBuffer<O>,
) -> Result<StreamSignal, PumpError>
where
    I: AsRef<[u8]>,
    O: AsRef<[u8]> + AsMut<[u8]>,
{
    let deadline = Instant::now() + STEP_DEADLINE;
    loop {
        let signal = session.step(input, input_state, output)?;
        assert!(input.offset() <= input.capacity());
        assert!(output.offset() <= output.capacity());
        if signal != StreamSignal::KeepGoing {
            return Ok(signal);
        }
        assert!(Instant::now() < deadline, "session made no progress");
    }
}

/// Feeds `input` as the only input and collects everything the child
/// writes, draining an output buffer of `capacity` bytes whenever it fills.
pub fn pump_to_end(
    session: &mut PumpSession,
    input: &[u8],
    capacity: usize,
) -> Result<Vec<u8>, PumpError> {
    let mut input = CursorBuffer::new(input);
    let mut output = CursorBuffer::new(vec![0_u8; capacity]);
    let mut collected = Vec::new();
    loop {
        let signal =
            step_until_signal(session, &mut input, InputState::EndOfInput, &mut output)?;
        collected.extend_from_slice(output.filled());
        output.reset();
        match signal {
            StreamSignal::Done => return Ok(collected),
            StreamSignal::OutputNeeded => {}
            other => panic!("unexpected signal {other:?} with input exhausted"),
        }
    }
}
