//! Channel-backed byte streams for transports that are not file descriptors.
//!
//! The input side is read on the blocking session thread; the output side
//! is drained by an async transport task.

use std::{
    io::{self, ErrorKind, Read, Write},
    sync::mpsc,
    time::Duration,
};

use tokio::sync::mpsc as async_mpsc;

/// Sending half of a channel input stream.
pub type InputSender = mpsc::Sender<Vec<u8>>;

/// Receiving half of a channel output stream.
pub type OutputReceiver = async_mpsc::UnboundedReceiver<Vec<u8>>;

/// Blocking input stream fed by an [`InputSender`].
///
/// `read` waits at most `poll_interval` before reporting `WouldBlock`, and
/// reports end-of-stream once every sender is dropped.
pub struct ChannelInput {
    rx: mpsc::Receiver<Vec<u8>>,
    poll_interval: Duration,
    leftover: Vec<u8>,
}

impl Read for ChannelInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Empty chunks would read as end-of-stream; skip them.
        while self.leftover.is_empty() {
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(chunk) => self.leftover = chunk,
                Err(mpsc::RecvTimeoutError::Timeout) => return Err(ErrorKind::WouldBlock.into()),
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.leftover.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.drain(..n);
        Ok(n)
    }
}

/// Output stream whose writes are forwarded as chunks to an async receiver.
#[derive(Clone)]
pub struct ChannelOutput {
    tx: async_mpsc::UnboundedSender<Vec<u8>>,
}

impl Write for ChannelOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "output channel closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Create a channel-backed input stream.
#[must_use]
pub fn input_channel(poll_interval: Duration) -> (InputSender, ChannelInput) {
    let (tx, rx) = mpsc::channel();
    (
        tx,
        ChannelInput {
            rx,
            poll_interval,
            leftover: Vec::new(),
        },
    )
}

/// Create a channel-backed output stream.
#[must_use]
pub fn output_channel() -> (ChannelOutput, OutputReceiver) {
    let (tx, rx) = async_mpsc::unbounded_channel();
    (ChannelOutput { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_reads_across_chunks() {
        let (tx, mut input) = input_channel(Duration::from_millis(10));
        tx.send(b"hello world".to_vec()).unwrap();

        let mut buf = [0u8; 5];
        assert_eq!(input.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(input.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b" worl");
        assert_eq!(input.read(&mut buf).unwrap(), 1);

        assert_eq!(
            input.read(&mut buf).unwrap_err().kind(),
            ErrorKind::WouldBlock
        );
        drop(tx);
        assert_eq!(input.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_empty_chunks_are_not_eof() {
        let (tx, mut input) = input_channel(Duration::from_millis(10));
        tx.send(Vec::new()).unwrap();
        tx.send(b"x".to_vec()).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(input.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn test_output_closed_is_broken_pipe() {
        let (mut output, mut rx) = output_channel();
        output.write_all(b"ok").unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"ok");

        drop(rx);
        assert_eq!(
            output.write(b"lost").unwrap_err().kind(),
            ErrorKind::BrokenPipe
        );
    }
}
