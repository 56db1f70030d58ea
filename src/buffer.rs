//! Fixed-capacity read/write buffers with explicit cursors, and the
//! line-extraction sub-state-machine used to pull `\r\n`-terminated lines
//! out of a streaming read buffer.

/// Default read buffer capacity.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 2048;
/// Default write buffer capacity.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 1024;

/// Outcome of scanning for the next `\r\n`-terminated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineResult {
    /// A complete line was found; NUL terminators were written in place of
    /// the `\r\n` and `checked_idx` now points just past them.
    Ok,
    /// Not enough bytes yet; the caller should wait for more data.
    Open,
    /// A bare `\n` without a preceding `\r`, or similar malformed input.
    Bad,
}

/// The connection's read side: a fixed-capacity buffer plus the three
/// cursors `spec.md` §3 defines (`read_idx`, `checked_idx`, `start_line`).
pub struct ReadBuffer {
    data: Box<[u8]>,
    /// Write cursor: number of bytes received so far.
    pub read_idx: usize,
    /// Parser cursor: how far the line extractor has scanned.
    pub checked_idx: usize,
    /// Index of the first byte of the line currently being examined.
    pub start_line: usize,
}

impl ReadBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            read_idx: 0,
            checked_idx: 0,
            start_line: 0,
        }
    }

    /// Total capacity of the backing array.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The unfilled tail of the buffer, ready for the next `recv`.
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.read_idx..]
    }

    /// Record that `n` more bytes were received.
    pub fn advance_read(&mut self, n: usize) {
        self.read_idx += n;
    }

    /// Whether the buffer has no room left for another `recv`.
    pub fn is_full(&self) -> bool {
        self.read_idx >= self.data.len()
    }

    /// Reset all cursors and zero the backing array, for keep-alive reuse.
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.read_idx = 0;
        self.checked_idx = 0;
        self.start_line = 0;
    }

    /// The line currently being examined, `read_buf[start_line..]` up to
    /// (but excluding) the NUL-terminated `\r\n` the last successful
    /// [`ReadBuffer::parse_line`] call wrote. Only valid to call right
    /// after a [`LineResult::Ok`].
    pub fn current_line(&self) -> &[u8] {
        let end = self.checked_idx.saturating_sub(2).max(self.start_line);
        &self.data[self.start_line..end]
    }

    /// Bytes available for the CONTENT state: everything from
    /// `checked_idx` to `read_idx`.
    pub fn unparsed(&self) -> &[u8] {
        &self.data[self.checked_idx..self.read_idx]
    }

    /// Scan `data[checked_idx..read_idx]` byte by byte for a `\r\n` or
    /// bare `\n` line terminator. On [`LineResult::Ok`], both terminator
    /// bytes are overwritten with NUL in place.
    pub fn parse_line(&mut self) -> LineResult {
        while self.checked_idx < self.read_idx {
            let byte = self.data[self.checked_idx];

            if byte == b'\r' {
                if self.checked_idx + 1 == self.read_idx {
                    return LineResult::Open;
                }
                if self.data[self.checked_idx + 1] == b'\n' {
                    self.data[self.checked_idx] = 0;
                    self.data[self.checked_idx + 1] = 0;
                    self.checked_idx += 2;
                    return LineResult::Ok;
                }
                return LineResult::Bad;
            } else if byte == b'\n' {
                if self.checked_idx > self.start_line && self.data[self.checked_idx - 1] == b'\r'
                {
                    self.data[self.checked_idx - 1] = 0;
                    self.data[self.checked_idx] = 0;
                    self.checked_idx += 1;
                    return LineResult::Ok;
                }
                return LineResult::Bad;
            }

            self.checked_idx += 1;
        }
        LineResult::Open
    }
}

/// The connection's write side: a fixed-capacity buffer plus a single
/// `write_idx` cursor marking how much has been staged for send.
pub struct WriteBuffer {
    data: Box<[u8]>,
    /// Number of bytes staged for send.
    pub write_idx: usize,
}

impl WriteBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            write_idx: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Append `s` to the buffer if it fits; fails (returning `false`)
    /// without writing anything otherwise.
    #[must_use]
    pub fn try_append(&mut self, s: &str) -> bool {
        self.try_append_bytes(s.as_bytes())
    }

    /// Byte-slice form of [`WriteBuffer::try_append`].
    #[must_use]
    pub fn try_append_bytes(&mut self, bytes: &[u8]) -> bool {
        let end = self.write_idx + bytes.len();
        if end > self.data.len() {
            return false;
        }
        self.data[self.write_idx..end].copy_from_slice(bytes);
        self.write_idx = end;
        true
    }

    /// The staged bytes, `write_buf[..write_idx]`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.write_idx]
    }

    /// The staged bytes starting at `from`, used when resuming a partial
    /// vectored write.
    pub fn as_slice_from(&self, from: usize) -> &[u8] {
        &self.data[from.min(self.write_idx)..self.write_idx]
    }

    pub fn reset(&mut self) {
        self.data.fill(0);
        self.write_idx = 0;
    }
}
