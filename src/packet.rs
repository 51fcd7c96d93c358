//! Streaming OpenPGP packet framing for encrypted uploads.
//!
//! An upload is written as
//!
//! ```text
//! PKESK, SEIPD v1 ( Compressed ZLIB ( Literal binary, file name, creation time ) )
//! ```
//!
//! Each nested packet is produced by a [`PacketStream`], a [`Read`] adapter that frames whatever
//! its inner reader yields with new-format headers and partial body lengths. Nothing is buffered
//! beyond one chunk per layer, so files of unknown length stream straight into the request body.

use std::io::{self, Cursor, Read};

use chrono::{DateTime, Utc};
use flate2::{read::ZlibEncoder, Compression};
use pgp::{
    packet::{DataMode, PacketHeader},
    ser::Serialize,
    types::{CompressionAlgorithm, PacketHeaderVersion, PacketLength, Tag},
};

/// Partial body chunk size. Must be a power of two of at least 512.
pub const PARTIAL_CHUNK_SIZE: usize = 8192;

/// Longest file name a literal packet can carry.
const MAX_FILE_NAME: usize = 255;

const SEIPD_VERSION: u8 = 1;

/// Frames an inner reader as the body of one packet with the given tag.
pub struct PacketStream<R> {
    tag: Tag,
    inner: R,
    body: Vec<u8>,
    framed: Vec<u8>,
    pos: usize,
    started: bool,
    done: bool,
}

impl<R: Read> PacketStream<R> {
    pub fn new(tag: Tag, inner: R) -> Self {
        Self {
            tag,
            inner,
            body: vec![0; PARTIAL_CHUNK_SIZE],
            framed: Vec::with_capacity(PARTIAL_CHUNK_SIZE + 6),
            pos: 0,
            started: false,
            done: false,
        }
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        let read = fill(&mut self.inner, &mut self.body)?;
        let length = if read == PARTIAL_CHUNK_SIZE {
            PacketLength::Partial(PARTIAL_CHUNK_SIZE as u32)
        } else {
            // A short chunk ends the packet, zero length included.
            self.done = true;
            PacketLength::Fixed(read as u32)
        };

        self.framed.clear();
        self.pos = 0;
        if self.started {
            length.to_writer_new(&mut self.framed).map_err(framing_err)?;
        } else {
            PacketHeader::from_parts(PacketHeaderVersion::New, self.tag, length)
                .and_then(|header| header.to_writer(&mut self.framed))
                .map_err(framing_err)?;
            self.started = true;
        }
        self.framed.extend_from_slice(&self.body[..read]);
        Ok(())
    }
}

impl<R: Read> Read for PacketStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.framed.len() {
            if self.done {
                return Ok(0);
            }
            self.next_chunk()?;
        }

        let n = buf.len().min(self.framed.len() - self.pos);
        buf[..n].copy_from_slice(&self.framed[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Literal data packet in binary mode.
pub fn literal<R: Read>(
    file_name: &str,
    created: DateTime<Utc>,
    data: R,
) -> PacketStream<impl Read> {
    PacketStream::new(
        Tag::LiteralData,
        Cursor::new(literal_header(file_name, created)).chain(data),
    )
}

/// ZLIB compressed data packet around `inner`, usually a [`literal`] packet.
pub fn compressed<R: Read>(inner: R) -> PacketStream<impl Read> {
    let algorithm = [u8::from(CompressionAlgorithm::ZLIB)];
    PacketStream::new(
        Tag::CompressedData,
        Cursor::new(algorithm).chain(ZlibEncoder::new(inner, Compression::default())),
    )
}

/// SEIPD v1 packet around already encrypted data (prefix, ciphertext and MDC).
pub fn seipd_v1<R: Read>(encrypted: R) -> PacketStream<impl Read> {
    PacketStream::new(
        Tag::SymEncryptedProtectedData,
        Cursor::new([SEIPD_VERSION]).chain(encrypted),
    )
}

/// Mode, name length, name, creation time. Times outside the u32 range are written as 0.
fn literal_header(file_name: &str, created: DateTime<Utc>) -> Vec<u8> {
    let name = truncate_name(file_name);
    let created = u32::try_from(created.timestamp()).unwrap_or(0);

    let mut header = Vec::with_capacity(name.len() + 6);
    header.push(u8::from(DataMode::Binary));
    header.push(name.len() as u8);
    header.extend_from_slice(name.as_bytes());
    header.extend_from_slice(&created.to_be_bytes());
    header
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_FILE_NAME {
        return name;
    }
    let mut end = MAX_FILE_NAME;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn framing_err(err: pgp::errors::Error) -> io::Error {
    io::Error::other(err.to_string())
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
