use std::collections::VecDeque;
use std::io::{self, Error, ErrorKind, Read, Write};

/// An in-order byte stream with a fixed capacity, a sticky close flag, and a
/// sticky error flag. The producer half is exposed as [`Writer`], the
/// consumer half as [`Reader`].
#[derive(Debug)]
pub struct ByteStream {
    buffer: VecDeque<u8>,
    capacity: u64,
    pushed: u64,
    popped: u64,
    closed: bool,
    error: bool,
}

impl ByteStream {
    /// New `ByteStream` with capacity `N`
    pub fn new(capacity: u64) -> Self {
        ByteStream {
            buffer: VecDeque::with_capacity(capacity as usize),
            capacity,
            pushed: 0,
            popped: 0,
            closed: false, // It's always the producer's job to close the byte stream, never the consumer
            error: false,
        }
    }

    /// Producer view of the stream
    pub fn writer(&mut self) -> Writer<'_> {
        Writer { stream: self }
    }

    /// Consumer view of the stream
    pub fn reader(&mut self) -> Reader<'_> {
        Reader { stream: self }
    }

    /// Append as much of `data` as fits in the remaining capacity. Excess
    /// bytes are silently dropped; callers check `available_capacity` first.
    /// No-op once the stream is closed or errored.
    pub fn push(&mut self, data: &[u8]) {
        if self.closed || self.error {
            return;
        }
        let to_push = (data.len() as u64).min(self.available_capacity()) as usize;
        self.buffer.extend(&data[..to_push]);
        self.pushed += to_push as u64;
    }

    /// Close the byte stream
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Is the byte stream closed?
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set the sticky error flag
    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// Is the sticky error flag set?
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// The remaining capacity in the byte stream
    pub fn available_capacity(&self) -> u64 {
        self.capacity - self.buffer.len() as u64
    }

    /// A contiguous view over a non-empty prefix of the buffered bytes
    /// (empty only when the buffer is empty). Consumers loop peek/pop until
    /// the buffer drains.
    pub fn peek(&self) -> &[u8] {
        self.buffer.as_slices().0
    }

    /// Discard up to `len` leading bytes from the stream
    pub fn pop(&mut self, len: u64) {
        let to_pop = len.min(self.buffer.len() as u64) as usize;
        self.buffer.drain(..to_pop);
        self.popped += to_pop as u64;
    }

    /// Is the stream closed and fully drained?
    pub fn is_finished(&self) -> bool {
        self.closed && self.pushed == self.popped
    }

    /// The total number of bytes ever pushed
    pub fn bytes_pushed(&self) -> u64 {
        self.pushed
    }

    /// The total number of bytes ever popped
    pub fn bytes_popped(&self) -> u64 {
        self.popped
    }

    /// The number of bytes currently buffered
    pub fn bytes_buffered(&self) -> u64 {
        self.buffer.len() as u64
    }
}

/// Producer half of a `ByteStream`
#[derive(Debug)]
pub struct Writer<'a> {
    stream: &'a mut ByteStream,
}

impl Writer<'_> {
    pub fn push(&mut self, data: &[u8]) {
        self.stream.push(data);
    }

    pub fn close(&mut self) {
        self.stream.close();
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }

    pub fn set_error(&mut self) {
        self.stream.set_error();
    }

    pub fn has_error(&self) -> bool {
        self.stream.has_error()
    }

    pub fn available_capacity(&self) -> u64 {
        self.stream.available_capacity()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.stream.bytes_pushed()
    }
}

/// Consumer half of a `ByteStream`
#[derive(Debug)]
pub struct Reader<'a> {
    stream: &'a mut ByteStream,
}

impl Reader<'_> {
    pub fn peek(&self) -> &[u8] {
        self.stream.peek()
    }

    pub fn pop(&mut self, len: u64) {
        self.stream.pop(len);
    }

    pub fn is_finished(&self) -> bool {
        self.stream.is_finished()
    }

    pub fn has_error(&self) -> bool {
        self.stream.has_error()
    }

    pub fn set_error(&mut self) {
        self.stream.set_error();
    }

    pub fn bytes_buffered(&self) -> u64 {
        self.stream.bytes_buffered()
    }

    pub fn bytes_popped(&self) -> u64 {
        self.stream.bytes_popped()
    }
}

impl Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stream.closed {
            return Err(Error::new(ErrorKind::Other, "stream closed"));
        }
        let before = self.stream.bytes_pushed();
        self.stream.push(buf);
        Ok((self.stream.bytes_pushed() - before) as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(()) // no-op because this is an in-memory data structure
    }
}

impl Read for Reader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = buf.len().min(self.stream.buffer.len());

        if to_read > 0 {
            // Make ring buffer contiguous if not already
            let contiguous = self.stream.buffer.make_contiguous();
            buf[..to_read].copy_from_slice(&contiguous[..to_read]);
            self.stream.buffer.drain(..to_read);
            self.stream.popped += to_read as u64;
            Ok(to_read)
        } else {
            Ok(0)
        }
    }
}

// -- Unit tests --
