//! Byte level parsing building blocks used by the PLY reader.
//!
//! [`Input`] is a buffered byte source that can look ahead a bounded number
//! of bytes and knows its absolute position in the stream. Bytes taken from
//! it are handed out as [`Token`]s, so that errors can point at a [`Span`].

use std::{
    fmt,
    io,
    ops,
    str,
};

use byteorder::{ByteOrder, ReadBytesExt};
use failure::Fail;


pub(crate) mod buf;

#[cfg(test)]
mod tests;


pub(crate) trait Input: io::Read + ops::Deref<Target = [u8]> {
    /// Makes sure at least `num_bytes` bytes are buffered. Fails with
    /// `UnexpectedEof` if the source ends before that.
    fn prepare(&mut self, num_bytes: usize) -> Result<(), Error>;

    /// Like `prepare`, but reaching EOF is not an error. Afterwards, fewer
    /// than `num_bytes` bytes might be buffered.
    fn saturating_prepare(&mut self, num_bytes: usize) -> Result<(), Error>;

    fn consume(&mut self, num_bytes: usize);
    fn is_eof(&mut self) -> Result<bool, Error>;

    /// Number of bytes consumed since the start of the stream.
    fn offset(&self) -> usize;


    /// The next `len` bytes. They have to be buffered already.
    fn token(&self, len: usize) -> Token<'_> {
        let lo = self.offset();
        Token {
            data: &self[..len],
            span: Span::new(lo, lo + len),
        }
    }

    /// Consumes bytes as long as `skip` returns `true` for them.
    fn skip_while(&mut self, skip: impl Fn(u8) -> bool) -> Result<(), Error> {
        loop {
            self.saturating_prepare(1)?;
            if self.is_empty() {
                return Ok(());
            }

            let n = self.iter().take_while(|&&b| skip(b)).count();
            let rest = self.len() - n;
            self.consume(n);
            if rest > 0 {
                return Ok(());
            }
        }
    }

    /// Passes the longest run of bytes accepted by `accept` to `func` and
    /// consumes it afterwards. EOF ends the run as well.
    fn take_while<F, O>(&mut self, accept: impl Fn(u8) -> bool, func: F) -> Result<O, Error>
    where
        F: FnOnce(Token<'_>) -> Result<O, Error>,
    {
        let mut len = 0;
        loop {
            len += self[len..].iter().take_while(|&&b| accept(b)).count();
            if len < self.len() {
                break;
            }

            self.saturating_prepare(len + 1)?;
            if len == self.len() {
                break;
            }
        }

        let out = func(self.token(len))?;
        self.consume(len);

        Ok(out)
    }

    /// Consumes `tag` or fails if the input continues with something else.
    fn expect_tag(&mut self, tag: &[u8]) -> Result<(), Error> {
        self.prepare(tag.len())?;

        let found = self.token(tag.len());
        if found.data != tag {
            let msg = format!("expected {}, found {}", fmt_bytes(tag), fmt_bytes(found.data));
            return Err(found.error(msg));
        }

        self.consume(tag.len());
        Ok(())
    }

    /// Checks (without consuming anything) whether `expected` comes next.
    fn is_next(&mut self, expected: &[u8]) -> Result<bool, Error> {
        self.saturating_prepare(expected.len())?;
        Ok(self.starts_with(expected))
    }
}

/// Bytes taken from an [`Input`] together with their position.
#[derive(Debug)]
pub struct Token<'a> {
    pub data: &'a [u8],
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn error(&self, msg: impl Into<String>) -> Error {
        Error::Custom(msg.into(), self.span)
    }

    /// Returns the token as string if it is pure ASCII.
    pub fn ascii(&self) -> Result<&'a str, Error> {
        match str::from_utf8(self.data) {
            Ok(s) if s.is_ascii() => Ok(s),
            _ => Err(Error::NotAscii(self.span)),
        }
    }
}

/// A byte range in the input stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    lo: usize,
    hi: usize,
}

impl Span {
    pub fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bytes {}..{}", self.lo, self.hi)
    }
}

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "IO error: {}", _0)]
    Io(#[cause] io::Error),

    #[fail(display = "input ended unexpectedly after {} bytes", _0)]
    UnexpectedEof(usize),

    #[fail(display = "non-ASCII data at {}", _0)]
    NotAscii(Span),

    #[fail(display = "lookahead exceeds the maximum buffer size (corrupt file or parser bug)")]
    LookAheadTooBig,

    #[fail(display = "{} (at {})", _0, _1)]
    Custom(String, Span)
}

impl From<io::Error> for Error {
    fn from(src: io::Error) -> Self {
        // `byteorder` reports a too short input as `UnexpectedEof` without
        // position. We keep it as IO error, the message is clear enough.
        Error::Io(src)
    }
}


// ===========================================================================
// ===== Numbers
// ===========================================================================

/// A number type that can be stored in the body of a PLY file.
pub(crate) trait Scalar: Sized {
    /// Rust name of the type, for error messages.
    const NAME: &'static str;

    fn parse_ascii(s: &str) -> Result<Self, String>;
    fn read_binary<B: ByteOrder, R: io::Read>(src: &mut R) -> io::Result<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ident => |$src:ident, $order:ident| $read:expr;)*) => {
        $(
            impl Scalar for $ty {
                const NAME: &'static str = stringify!($ty);

                fn parse_ascii(s: &str) -> Result<Self, String> {
                    s.parse::<$ty>().map_err(|e| e.to_string())
                }

                fn read_binary<$order: ByteOrder, R: io::Read>($src: &mut R) -> io::Result<Self> {
                    $read
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => |src, B| src.read_i8();
    u8 => |src, B| src.read_u8();
    i16 => |src, B| src.read_i16::<B>();
    u16 => |src, B| src.read_u16::<B>();
    i32 => |src, B| src.read_i32::<B>();
    u32 => |src, B| src.read_u32::<B>();
    f32 => |src, B| src.read_f32::<B>();
    f64 => |src, B| src.read_f64::<B>();
}


/// Formats bytes as string if they are valid UTF8, as byte list otherwise.
pub fn fmt_bytes(data: &[u8]) -> String {
    match str::from_utf8(data) {
        Ok(s) => format!("{:?}", s),
        Err(_) => format!("{:?}", data),
    }
}
