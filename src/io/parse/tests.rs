use std::io::{self, Read};

use byteorder::{BigEndian, LittleEndian};

use super::{*, buf::Buffer};


/// A reader that returns at most one byte per `read` call.
struct Trickle<'a>(&'a [u8]);

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.0.is_empty() || buf.is_empty() {
            return Ok(0);
        }

        buf[0] = self.0[0];
        self.0 = &self.0[1..];
        Ok(1)
    }
}

#[test]
fn prepare_across_reads() -> Result<(), Error> {
    let mut buf = Buffer::new(Trickle(b"hello world"))?;

    buf.prepare(5)?;
    assert_eq!(&buf[..5], b"hello");
    buf.prepare(6)?;
    assert_eq!(&buf[..6], b"hello ");
    buf.consume(6);
    assert_eq!(buf.offset(), 6);

    buf.saturating_prepare(100)?;
    assert_eq!(&*buf, b"world");
    assert!(matches!(buf.prepare(6), Err(Error::UnexpectedEof(11))));

    Ok(())
}

#[test]
fn take_while_stops_at_eof() -> Result<(), Error> {
    let mut buf = Buffer::new(Trickle(b"12 345"))?;

    let a = buf.take_while(|b| b != b' ', |t| Ok(t.ascii()?.to_string()))?;
    assert_eq!(a, "12");
    buf.consume(1);

    let b = buf.take_while(|b| b != b' ', |t| {
        assert_eq!(t.span, Span::new(3, 6));
        Ok(t.ascii()?.to_string())
    })?;
    assert_eq!(b, "345");
    assert!(buf.is_eof()?);

    Ok(())
}

#[test]
fn expect_tag_reports_span() -> Result<(), Error> {
    let mut buf = Buffer::new(&b"ply\nfoo"[..])?;
    buf.expect_tag(b"ply\n")?;

    match buf.expect_tag(b"bar") {
        Err(Error::Custom(msg, span)) => {
            assert_eq!(span, Span::new(4, 7));
            assert!(msg.contains("\"foo\""));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    Ok(())
}

#[test]
fn is_next_and_skip_while() -> Result<(), Error> {
    let mut buf = Buffer::new(&b"   comment x"[..])?;
    assert!(!buf.is_next(b"comment")?);

    buf.skip_while(|b| b == b' ')?;
    assert!(buf.is_next(b"comment")?);
    assert!(!buf.is_next(b"comment xyz")?);

    Ok(())
}

#[test]
fn not_ascii() -> Result<(), Error> {
    let mut buf = Buffer::new(&b"f\xF6\xF6 "[..])?;
    let res = buf.take_while(|b| b != b' ', |t| t.ascii().map(|s| s.len()));
    assert!(matches!(res, Err(Error::NotAscii(_))));

    Ok(())
}

#[test]
fn binary_scalars() -> Result<(), Error> {
    let data = [
        0x01, 0x02,
        0x01, 0x02,
        0x00, 0x00, 0x80, 0x3f,
        0xff,
    ];
    let mut buf = Buffer::new(Trickle(&data))?;

    assert_eq!(u16::read_binary::<LittleEndian, _>(&mut buf)?, 0x0201);
    assert_eq!(u16::read_binary::<BigEndian, _>(&mut buf)?, 0x0102);
    assert_eq!(f32::read_binary::<LittleEndian, _>(&mut buf)?, 1.0);
    assert_eq!(i8::read_binary::<BigEndian, _>(&mut buf)?, -1);
    assert_eq!(buf.offset(), data.len());
    assert!(u8::read_binary::<LittleEndian, _>(&mut buf).is_err());

    Ok(())
}

#[test]
fn ascii_scalars() {
    assert_eq!(u8::parse_ascii("255"), Ok(255));
    assert!(u8::parse_ascii("256").is_err());
    assert_eq!(f64::parse_ascii("-1.5e3"), Ok(-1500.0));
    assert!(i32::parse_ascii("1.0").is_err());
    assert_eq!(f32::NAME, "f32");
}

#[test]
fn skip_while_across_reads() -> Result<(), Error> {
    let mut buf = Buffer::new(Trickle(b"  \n\t x"))?;
    buf.skip_while(|b| b == b' ' || b == b'\n' || b == b'\t')?;
    assert_eq!(buf.offset(), 5);
    assert!(buf.is_next(b"x")?);

    buf.consume(1);
    buf.skip_while(|_| true)?;
    assert!(buf.is_eof()?);

    Ok(())
}

#[test]
fn large_lookahead_grows_buffer() -> Result<(), Error> {
    let data = vec![b'a'; 100_000];
    let mut buf = Buffer::new(&data[..])?;

    buf.prepare(100_000)?;
    assert_eq!(buf.len(), 100_000);
    buf.consume(99_999);
    buf.prepare(1)?;
    assert!(matches!(buf.prepare(2), Err(Error::UnexpectedEof(_))));

    Ok(())
}
