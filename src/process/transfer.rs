//! Non-blocking transfer primitives with explicit outcomes.
//!
//! The pipes are `O_NONBLOCK`, so a read or write that cannot make progress
//! surfaces as [`Transfer::WouldBlock`] rather than an error.

use std::io::{self, ErrorKind, Read, Write};

/// Outcome of a single read or write on a non-blocking pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transfer {
    /// `n` bytes moved. Writes may be partial.
    Moved(usize),
    /// The peer closed its end (zero-length read).
    Closed,
    /// Nothing could be moved right now.
    WouldBlock,
}

/// Reads once into `buf`.
pub(crate) fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<Transfer> {
    if buf.is_empty() {
        return Ok(Transfer::WouldBlock);
    }
    match reader.read(buf) {
        Ok(0) => Ok(Transfer::Closed),
        Ok(count) => Ok(Transfer::Moved(count)),
        Err(err) if is_transient(&err) => Ok(Transfer::WouldBlock),
        Err(err) => Err(err),
    }
}

/// Writes once from `buf`, accepting a partial write.
pub(crate) fn write_chunk<W: Write>(writer: &mut W, buf: &[u8]) -> io::Result<Transfer> {
    if buf.is_empty() {
        return Ok(Transfer::WouldBlock);
    }
    match writer.write(buf) {
        Ok(count) => Ok(Transfer::Moved(count)),
        Err(err) if is_transient(&err) => Ok(Transfer::WouldBlock),
        Err(err) => Err(err),
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    struct Stubborn(ErrorKind);

    impl Read for Stubborn {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(self.0))
        }
    }

    impl Write for Stubborn {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(self.0))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Accepts at most `limit` bytes per write.
    struct Trickle {
        limit: usize,
        sink: Vec<u8>,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let count = buf.len().min(self.limit);
            self.sink.extend(buf.iter().take(count));
            Ok(count)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    fn zero_length_read_reports_peer_close() {
        let mut reader = Cursor::new(Vec::new());
        let mut buf = [0_u8; 4];
        assert_eq!(read_chunk(&mut reader, &mut buf).ok(), Some(Transfer::Closed));
    }

    #[rstest]
    fn read_moves_available_bytes() {
        let mut reader = Cursor::new(b"abcdef".to_vec());
        let mut buf = [0_u8; 4];
        assert_eq!(read_chunk(&mut reader, &mut buf).ok(), Some(Transfer::Moved(4)));
        assert_eq!(&buf, b"abcd");
    }

    #[rstest]
    #[case(ErrorKind::WouldBlock)]
    #[case(ErrorKind::Interrupted)]
    fn transient_failures_are_deferred(#[case] kind: ErrorKind) {
        let mut pipe = Stubborn(kind);
        let mut buf = [0_u8; 4];
        assert_eq!(read_chunk(&mut pipe, &mut buf).ok(), Some(Transfer::WouldBlock));
        assert_eq!(write_chunk(&mut pipe, b"x").ok(), Some(Transfer::WouldBlock));
    }

    #[rstest]
    #[case(ErrorKind::BrokenPipe)]
    #[case(ErrorKind::PermissionDenied)]
    fn hard_failures_propagate(#[case] kind: ErrorKind) {
        let mut pipe = Stubborn(kind);
        let mut buf = [0_u8; 4];
        let read_err = read_chunk(&mut pipe, &mut buf).expect_err("read should fail");
        assert_eq!(read_err.kind(), kind);
        let write_err = write_chunk(&mut pipe, b"x").expect_err("write should fail");
        assert_eq!(write_err.kind(), kind);
    }

    #[rstest]
    fn partial_writes_are_normal() {
        let mut pipe = Trickle {
            limit: 3,
            sink: Vec::new(),
        };
        assert_eq!(write_chunk(&mut pipe, b"abcdef").ok(), Some(Transfer::Moved(3)));
        assert_eq!(pipe.sink, b"abc");
    }
}
