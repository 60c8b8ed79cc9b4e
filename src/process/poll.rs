//! Readiness polling over the child's still-open pipes.

use std::{io, os::fd::AsFd, time::Duration};

use rustix::event::{PollFd, PollFlags, Timespec, poll};
use rustix::io::Errno;

use super::ProcessHandle;

/// Which channels can make progress without blocking.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Readiness {
    pub(crate) stdin_writable: bool,
    pub(crate) stdout_readable: bool,
    pub(crate) stderr_readable: bool,
}

/// Waits up to `timeout` for any open channel of `handle` to become ready.
///
/// Closed channels are never polled. Hang-up and error conditions count as
/// ready so the following transfer observes the close or the failure. An
/// interrupted poll reports nothing ready.
pub(crate) fn poll_readiness(handle: &ProcessHandle, timeout: Duration) -> io::Result<Readiness> {
    let stdin = handle.stdin.get().map(AsFd::as_fd);
    let stdout = handle.stdout.get().map(AsFd::as_fd);
    let stderr = handle.stderr.get().map(AsFd::as_fd);

    let mut fds = Vec::with_capacity(3);
    let mut slot = |fd: Option<_>, flags: PollFlags| {
        fd.map(|fd| {
            fds.push(PollFd::from_borrowed_fd(fd, flags));
            fds.len() - 1
        })
    };
    let stdin_slot = slot(stdin, PollFlags::OUT);
    let stdout_slot = slot(stdout, PollFlags::IN);
    let stderr_slot = slot(stderr, PollFlags::IN);

    if fds.is_empty() {
        return Ok(Readiness::default());
    }

    let timeout = to_timespec(timeout);
    match poll(&mut fds, Some(&timeout)) {
        Ok(_) => {}
        Err(Errno::INTR) => return Ok(Readiness::default()),
        Err(errno) => return Err(errno.into()),
    }

    let ready = |slot: Option<usize>, wanted: PollFlags| {
        slot.and_then(|index| fds.get(index))
            .is_some_and(|fd| fd.revents().intersects(wanted | PollFlags::HUP | PollFlags::ERR))
    };
    Ok(Readiness {
        stdin_writable: ready(stdin_slot, PollFlags::OUT),
        stdout_readable: ready(stdout_slot, PollFlags::IN),
        stderr_readable: ready(stderr_slot, PollFlags::IN),
    })
}

fn to_timespec(timeout: Duration) -> Timespec {
    Timespec {
        tv_sec: i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX),
        tv_nsec: i64::from(timeout.subsec_nanos()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespec_keeps_subsecond_precision() {
        let spec = to_timespec(Duration::from_millis(1_010));
        assert_eq!(spec.tv_sec, 1);
        assert_eq!(spec.tv_nsec, 10_000_000);
    }
}
