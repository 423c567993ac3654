use std::{
    cmp::{max, min},
    fmt,
    io::{self, Read},
    ops,
};

use super::{Error, Input};


/// The initial size of the buffer in bytes.
const START_BUFFER_SIZE: usize = 8 * 1024;

/// The maximum size the internal buffer can grow to.
///
/// Each piece of information in a mesh file (a header line, a number) is
/// tiny. The buffer only has to hold one such piece at a time, so a parser
/// asking for more than this is either fed a garbage file or buggy. Instead
/// of dying from OOM, parsing fails with `LookAheadTooBig`.
pub(crate) const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// A growable read buffer implementing [`Input`].
pub(crate) struct Buffer<R: Read> {
    reader: R,

    buf: Vec<u8>,

    /// Points to the first byte in `buf` that is real data. Invariants:
    /// - `0 <= start <= end`
    start: usize,

    /// Points to the byte after the last byte of real data. Invariants:
    /// - `0 <= end <= buf.len()`
    end: usize,

    consumed_total: usize,
}

impl<R: Read> fmt::Debug for Buffer<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Buffer {{ consumed_total: {}, .. }}", self.consumed_total)
    }
}

impl<R: Read> Buffer<R> {
    pub(crate) fn new(reader: R) -> Result<Self, Error> {
        let mut out = Self {
            buf: vec![0; START_BUFFER_SIZE],
            reader,
            start: 0,
            end: 0,
            consumed_total: 0,
        };

        // Read once to prefill the buffer.
        out.fill_buf()?;

        Ok(out)
    }

    // =======================================================================
    // ===== Internal methods
    // =======================================================================

    fn cap(&self) -> usize {
        self.buf.len()
    }

    fn raw_buf(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// Tries to fill the buffer with some new data, starting at `self.end`.
    /// Does not grow the buffer.
    fn fill_buf(&mut self) -> Result<usize, io::Error> {
        loop {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(n) => {
                    self.end += n;
                    return Ok(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Makes room for at least `additional` more bytes behind `self.end`,
    /// either by moving the data to the front or by growing the buffer.
    #[inline(never)]
    fn grow_buf(&mut self, additional: usize) -> Result<(), Error> {
        let space_after = self.cap() - self.end;
        let space_before = self.start;

        if space_after >= additional {
            return Ok(());
        }

        // Moving is only worth it if the data is small compared to the
        // buffer. Otherwise alternating small and large reads would copy
        // almost the whole buffer every time.
        let len = self.raw_buf().len();
        if space_after + space_before >= additional && len < self.cap() / 2 {
            self.buf.copy_within(self.start..self.end, 0);
        } else {
            if self.cap() >= MAX_BUFFER_SIZE {
                return Err(Error::LookAheadTooBig);
            }

            let new_len = min(max(len + additional, self.cap() * 2), MAX_BUFFER_SIZE);
            let mut new = Vec::with_capacity(new_len);
            new.extend_from_slice(self.raw_buf());
            new.resize(new_len, 0);
            self.buf = new;
        }

        // In both cases, the data starts at the very beginning now.
        self.end -= self.start;
        self.start = 0;

        Ok(())
    }

    /// Reads until `additional` new bytes are buffered or the reader is
    /// exhausted. Returns the number of bytes read.
    #[inline(never)]
    fn fill_buf_by(&mut self, additional: usize) -> Result<usize, Error> {
        self.grow_buf(additional)?;

        let mut bytes_read = 0;
        while bytes_read < additional {
            match self.fill_buf()? {
                // `buf[end..]` is not empty due to `grow_buf`, so 0 means EOF.
                0 => break,
                n => bytes_read += n,
            }
        }

        Ok(bytes_read)
    }
}

impl<R: Read> ops::Deref for Buffer<R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.raw_buf()
    }
}

impl<R: Read> Read for Buffer<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        if self.raw_buf().is_empty() {
            // Big reads bypass our buffer.
            if buf.len() >= self.cap() {
                let n = self.reader.read(buf)?;
                self.consumed_total += n;
                return Ok(n);
            }

            self.start = 0;
            self.end = 0;
            self.fill_buf()?;
        }

        let n = min(self.raw_buf().len(), buf.len());
        buf[..n].copy_from_slice(&self.raw_buf()[..n]);
        self.consume(n);

        Ok(n)
    }
}

impl<R: Read> Input for Buffer<R> {
    fn prepare(&mut self, num_bytes: usize) -> Result<(), Error> {
        let len = self.raw_buf().len();
        if len < num_bytes {
            let diff = num_bytes - len;
            if self.fill_buf_by(diff)? < diff {
                return Err(Error::UnexpectedEof(self.offset() + self.raw_buf().len()));
            }
        }

        Ok(())
    }

    fn saturating_prepare(&mut self, num_bytes: usize) -> Result<(), Error> {
        let len = self.raw_buf().len();
        if len < num_bytes {
            self.fill_buf_by(num_bytes - len)?;
        }

        Ok(())
    }

    fn consume(&mut self, num_bytes: usize) {
        assert!(self.start + num_bytes <= self.end, "consumed more bytes than buffered");

        self.start += num_bytes;
        self.consumed_total += num_bytes;

        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    fn is_eof(&mut self) -> Result<bool, Error> {
        if self.raw_buf().is_empty() {
            self.grow_buf(1)?;
            Ok(self.fill_buf()? == 0)
        } else {
            Ok(false)
        }
    }

    fn offset(&self) -> usize {
        self.consumed_total
    }
}
