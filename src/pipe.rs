//! Bounded in-memory pipe.
//!
//! Connects a producer running on a worker thread (the encrypting writer) to a consumer that
//! wants a [`Read`] (the multipart file part). At most `capacity` chunks are in flight, so memory
//! stays bounded regardless of file size. The stream only ends cleanly after
//! [`PipeWriter::finish`]. A writer dropped without finishing (a failed or panicking producer)
//! and [`PipeWriter::abort`] both make the reader fail instead of returning a short stream. A
//! dropped reader makes further writes fail with [`io::ErrorKind::BrokenPipe`].

use std::io::{self, Read, Write};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

pub const DEFAULT_CAPACITY: usize = 16;

pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = sync_channel(capacity);
    (
        PipeWriter {
            tx,
            closed: false,
            finished: false,
        },
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
    )
}

pub struct PipeWriter {
    tx: SyncSender<io::Result<Vec<u8>>>,
    closed: bool,
    finished: bool,
}

impl PipeWriter {
    /// True once a write found the reader gone.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// End the stream; the reader sees EOF after draining pending chunks.
    pub fn finish(mut self) {
        self.finished = true;
    }

    /// Close the pipe with an error; the reader returns it after draining pending chunks.
    pub fn abort(mut self, reason: impl Into<String>) {
        self.finished = true;
        let _ = self.tx.send(Err(io::Error::other(reason.into())));
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if !self.finished && !self.closed {
            let _ = self.tx.send(Err(io::Error::other("pipe writer dropped before finishing")));
        }
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.tx.send(Ok(buf.to_vec())).is_err() {
            self.closed = true;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed"));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct PipeReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Err(err)) => return Err(err),
                // Writer finished: end of stream.
                Err(_) => return Ok(0),
            }
        }

        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
