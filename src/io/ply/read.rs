use std::{
    cmp::min,
    convert::TryFrom,
    fs::File,
    io,
    path::Path,
};

use byteorder::{BigEndian, LittleEndian};
use fxhash::FxHashSet;
use log::{debug, warn};

use crate::{
    attr::{AttributeStore, AttributeValues, AttrKind, ElementKind},
    io::{
        Encoding, Error, MeshData, error,
        parse::{self, Input, Scalar, Span, fmt_bytes, buf::Buffer},
    },
};
use super::{ElementDef, PropIndex, PropertyDef, PropertyType, ScalarType};



// ===========================================================================
// ===== Parsing functions
// ===========================================================================
macro_rules! parser {
    ($name:ident = |$buf:ident| $body:expr) => {
        parser!($name = |$buf| -> () { $body });
    };
    ($name:ident = |$buf:ident| -> $out:ty $body:block) => {
        fn $name($buf: &mut impl Input) -> Result<$out, parse::Error> {
            $body
        }
    };
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_delimiter(b: u8) -> bool {
    is_blank(b) || b == b'\r' || b == b'\n'
}

fn is_word(b: u8) -> bool {
    !is_delimiter(b)
}

// Optionally skip whitespace
parser!(opt_whitespace = |buf| buf.skip_while(is_blank));

// Requires at least one whitespace, skips all whitespace that follows
// it.
parser!(whitespace = |buf| {
    buf.prepare(1)?;
    if !is_blank(buf[0]) {
        let sd = buf.token(1);
        return Err(sd.error(format!("expected whitespace, found {}", fmt_bytes(sd.data))));
    }
    buf.consume(1);
    opt_whitespace(buf)
});

/// Requires a linebreak with optional whitespace before it. Both `\n` and
/// `\r\n` are accepted, as files written on Windows are common.
parser!(linebreak = |buf| {
    opt_whitespace(buf)?;
    if buf.is_next(b"\r")? {
        buf.consume(1);
    }
    buf.expect_tag(b"\n")?;
    Ok(())
});

/// Calls the passed parser and requires a linebreak at the end.
fn line<I, F, O>(buf: &mut I, func: F) -> Result<O, parse::Error>
where
    I: Input,
    F: FnOnce(&mut I) -> Result<O, parse::Error>,
{
    let out = func(buf)?;
    linebreak(buf)?;
    Ok(out)
}

/// Returns the rest of the current line (without linebreak) and consumes it
/// including the linebreak.
parser!(rest_of_line = |buf| -> String {
    let rest = buf.take_while(|b| b != b'\n', |rest| {
        Ok(String::from_utf8_lossy(rest.data).trim().to_string())
    })?;
    buf.expect_tag(b"\n")?;
    Ok(rest)
});


// ===========================================================================
// ===== Definition of `Reader`
// ===========================================================================

/// A reader able to read PLY files.
///
/// The header is parsed when creating the reader with [`Reader::open`] or
/// [`Reader::new`], so that it can be inspected before reading the body with
/// [`Reader::read`] or [`Reader::read_raw_into`].
#[derive(Debug)]
pub struct Reader<R: io::Read> {
    buf: Buffer<R>,
    comments: Vec<String>,
    encoding: Encoding,
    elements: Vec<ElementDef>,
}

impl Reader<File> {
    /// Tries to open the file specified by the given path and creates a new
    /// `Reader` from that file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        // We don't need a `BufReader` here, because we will use our internal
        // parse buffer anyway.
        Self::new(File::open(path)?)
    }
}

impl<R: io::Read> Reader<R> {
    /// Creates a new `Reader` from the given `io::Read` instance and parses
    /// the header of the given input.
    ///
    /// If you want to open a file, rather use [`Reader::open`].
    pub fn new(reader: R) -> Result<Self, Error> {
        /// Parses a scalar type delimited by whitespace (whitespace is not
        /// read by this function).
        fn parse_scalar_type(buf: &mut impl Input) -> Result<ScalarType, parse::Error> {
            buf.take_while(is_word, |word| {
                word.ascii()?
                    .parse::<ScalarType>()
                    .map_err(|e| word.error(e.to_string()))
            })
        }

        /// Parses a single word delimited by whitespace or newline.
        fn parse_ident(buf: &mut impl Input) -> Result<String, parse::Error> {
            buf.take_while(is_word, |s| {
                if s.data.is_empty() {
                    return Err(s.error("expected identifier"));
                }
                s.ascii().map(|s| s.to_string())
            })
        }

        // Wrap reader into parse buffer.
        let mut buf = Buffer::new(reader)?;
        let mut comments = Vec::new();


        // ===== Parse magic number and format line ===========================
        // PLY files always start with `ply`. This serves as magic number.
        line(&mut buf, |buf| buf.expect_tag(b"ply")).map_err(|e| {
            match e {
                parse::Error::Io(e) => parse::Error::Io(e),
                _ => parse::Error::Custom(
                    "not a valid PLY file (does not start with \"ply\\n\")".into(),
                    Span::new(0, 4),
                ),
            }
        })?;

        // Read any comment lines that might be here
        while buf.is_next(b"comment")? {
            buf.consume(b"comment".len());
            comments.push(rest_of_line(&mut buf)?);
        }

        // Parse format line. This is required to be before everything else in
        // the header (except the magic number and potential comments).
        let encoding = line(&mut buf, |buf| {
            buf.expect_tag(b"format")?;
            whitespace(buf)?;

            let encoding = buf.take_while(is_word, |word| {
                match word.data {
                    b"ascii" => Ok(Encoding::Ascii),
                    b"binary_little_endian" => Ok(Encoding::BinaryLittleEndian),
                    b"binary_big_endian" => Ok(Encoding::BinaryBigEndian),
                    other => {
                        let len = min(other.len(), 50); // limit size of error string
                        let msg = format!(
                            "expected \"ascii\", \"binary_little_endian\" or \
                                \"binary_big_endian\", found {}",
                            fmt_bytes(&other[..len]),
                        );
                        Err(word.error(msg))
                    }
                }
            })?;

            whitespace(buf)?;
            buf.expect_tag(b"1.0")?;

            Ok(encoding)
        })?;


        // ===== Parse elements and their properties =========================
        let mut elements: Vec<ElementDef> = Vec::new();

        // Attribute keys seen so far, to reject duplicates early.
        let mut keys = FxHashSet::default();

        // Line by line until we reach the end of the header
        while !buf.is_next(b"end_header")? {
            match () {
                () if buf.is_next(b"comment")? => {
                    buf.consume(b"comment".len());
                    comments.push(rest_of_line(&mut buf)?);
                }

                () if buf.is_next(b"obj_info")? => {
                    buf.consume(b"obj_info".len());
                    let info = rest_of_line(&mut buf)?;
                    debug!("ignoring PLY obj_info '{}'", info);
                }

                // Element definition, e.g. `element vertex 8`
                () if buf.is_next(b"element")? => {
                    buf.consume(b"element".len());
                    whitespace(&mut buf)?;

                    let name = parse_ident(&mut buf)?;
                    whitespace(&mut buf)?;

                    let count = buf.take_while(is_word, |n| {
                        match n.ascii()?.parse::<u64>() {
                            Ok(v) => Ok(v),
                            Err(e) => {
                                let msg = format!("invalid integer as element count ({})", e);
                                Err(n.error(msg))
                            }
                        }
                    })?;

                    elements.push(ElementDef {
                        name,
                        count,
                        property_defs: vec![],
                    });

                    linebreak(&mut buf)?;
                }

                // Property definition, e.g. `property float x` or
                // `property list uchar int vertex_index`
                () if buf.is_next(b"property")? => {
                    let line_start = buf.offset();

                    // Get last element or error if there wasn't a preceeding
                    // `element` line.
                    let elem = elements.last_mut().ok_or_else(|| {
                        buf.token(b"property".len())
                            .error("property definition without preceding element definition")
                    })?;

                    buf.consume(b"property".len());
                    whitespace(&mut buf)?;

                    let (ty, name) = if buf.is_next(b"list")? {
                        buf.consume(b"list".len());
                        whitespace(&mut buf)?;

                        let len_type = parse_scalar_type(&mut buf)?;
                        whitespace(&mut buf)?;
                        let scalar_type = parse_scalar_type(&mut buf)?;
                        whitespace(&mut buf)?;
                        let name = parse_ident(&mut buf)?;

                        // We don't allow floating point or signed integer
                        // types to specify the length as they don't make a lot
                        // of sense.
                        if !len_type.is_unsigned_integer()  {
                            return Err(parse::Error::Custom(
                                format!("only unsigned integers can be used to store list \
                                    lengths (property '{}')", name),
                                Span::new(line_start, buf.offset()),
                            ).into());
                        }

                        (PropertyType::List { len_type, scalar_type }, name)
                    } else {
                        let ty = PropertyType::Scalar(parse_scalar_type(&mut buf)?);
                        whitespace(&mut buf)?;
                        (ty, parse_ident(&mut buf)?)
                    };

                    let element = ElementKind::from_name(&elem.name);
                    if !keys.insert(element.attribute_name(&name)) {
                        return Err(error::duplicate_attribute(&element, &name));
                    }

                    elem.property_defs.push(PropertyDef { name, ty });
                    linebreak(&mut buf)?;
                }

                // Something else...
                () => {
                    buf.saturating_prepare(10)?;
                    let len = min(buf.len(), 10);
                    let start = buf.token(len);
                    let msg = format!(
                        "expected line starting with \"comment\", \"element\" or \
                            \"property\", found {}",
                        fmt_bytes(start.data),
                    );

                    return Err(start.error(msg).into());
                }
            }
        }

        // Consume the remaining header
        line(&mut buf, |buf| buf.expect_tag(b"end_header"))?;

        debug!(
            "read PLY header: {} encoding, elements: {:?}",
            encoding.ply_keyword(),
            elements.iter().map(|e| (&e.name, e.count)).collect::<Vec<_>>(),
        );

        Ok(Self { buf, comments, encoding, elements })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// All `comment` lines of the header, without the `comment` keyword.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// The element groups declared in the header, in file order.
    pub fn elements(&self) -> &[ElementDef] {
        &self.elements
    }

    /// Reads the whole file and assembles vertices, faces, voxels and
    /// attributes.
    pub fn read(self) -> Result<MeshData, Error> {
        let mut sink = BucketSink::default();
        self.read_raw_into(&mut sink)?;
        sink.into_mesh()
    }

    /// Reads the whole body and passes every single value to the given sink.
    ///
    /// This is a low level building block that you usually don't want to use
    /// directly.
    pub fn read_raw_into(mut self, sink: &mut impl ValueSink) -> Result<(), Error> {
        let buf = &mut self.buf;

        // Iterate through each element group
        for element_def in &self.elements {
            sink.element_group_start(element_def);

            // Just read as many elements as specfied in the header. A faulty
            // number in the header won't lead to any DOS dangerous things. The
            // time and memory we use here is still limited by the file size.
            for _ in 0..element_def.count {
                match self.encoding {
                    Encoding::Ascii => {
                        parse_element::<AsciiEncoding, _>(buf, element_def, sink)?;
                    }
                    Encoding::BinaryBigEndian => {
                        parse_element::<BbeEncoding, _>(buf, element_def, sink)?;
                    }
                    Encoding::BinaryLittleEndian => {
                        parse_element::<BleEncoding, _>(buf, element_def, sink)?;
                    }
                }
            }
        }

        Ok(())
    }
}


// ===========================================================================
// ===== Helpers for body parsing
// ===========================================================================
/// Helper trait to abstract the three different encodings.
trait EncodingReader {
    fn read<T: Scalar, I: Input>(buf: &mut I) -> Result<T, parse::Error>;

    /// Skips a separator between two values. Only relevant for ASCII
    /// (whitespace), therefore this empty implementation is provided.
    fn skip_separator(_buf: &mut impl Input) -> Result<(), parse::Error> {
        Ok(())
    }

    /// Skips anything that may precede an element. Only relevant for ASCII
    /// (indentation and empty lines).
    fn start_element(_buf: &mut impl Input) -> Result<(), parse::Error> {
        Ok(())
    }

    /// Finish reading one element. Only relevant for ASCII (where a linebreak
    /// needs to be skipped), therefore this empty implementation is provided.
    fn finish_element(_buf: &mut impl Input) -> Result<(), parse::Error> {
        Ok(())
    }
}

/// Binary big endian encoding.
enum BbeEncoding {}
impl EncodingReader for BbeEncoding {
    fn read<T: Scalar, I: Input>(buf: &mut I) -> Result<T, parse::Error> {
        Ok(T::read_binary::<BigEndian, _>(buf)?)
    }
}

/// Binary little endian encoding.
enum BleEncoding {}
impl EncodingReader for BleEncoding {
    fn read<T: Scalar, I: Input>(buf: &mut I) -> Result<T, parse::Error> {
        Ok(T::read_binary::<LittleEndian, _>(buf)?)
    }
}

/// ASCII encoding.
enum AsciiEncoding {}
impl EncodingReader for AsciiEncoding {
    /// Reads until the next whitespace or linebreak and parses that word.
    fn read<T: Scalar, I: Input>(buf: &mut I) -> Result<T, parse::Error> {
        buf.take_while(is_word, |word| {
            T::parse_ascii(word.ascii()?).map_err(|e| {
                word.error(format!("invalid '{}' literal: {}", T::NAME, e))
            })
        })
    }

    fn skip_separator(buf: &mut impl Input) -> Result<(), parse::Error> {
        whitespace(buf)
    }
    fn start_element(buf: &mut impl Input) -> Result<(), parse::Error> {
        buf.skip_while(is_delimiter)
    }
    fn finish_element(buf: &mut impl Input) -> Result<(), parse::Error> {
        // The last line might not be terminated.
        opt_whitespace(buf)?;
        if buf.is_eof()? {
            return Ok(());
        }
        linebreak(buf)
    }
}

/// Reads a single value of type `ty`.
fn read_value<E: EncodingReader, I: Input>(buf: &mut I, ty: ScalarType) -> Result<Value, parse::Error> {
    let v = match ty {
        ScalarType::Char => Value::Int(E::read::<i8, _>(buf)?.into()),
        ScalarType::UChar => Value::Int(E::read::<u8, _>(buf)?.into()),
        ScalarType::Short => Value::Int(E::read::<i16, _>(buf)?.into()),
        ScalarType::UShort => Value::Int(E::read::<u16, _>(buf)?.into()),
        ScalarType::Int => Value::Int(E::read::<i32, _>(buf)?.into()),
        ScalarType::UInt => Value::Int(E::read::<u32, _>(buf)?.into()),
        ScalarType::Float => Value::Float(E::read::<f32, _>(buf)?.into()),
        ScalarType::Double => Value::Float(E::read::<f64, _>(buf)?),
    };

    Ok(v)
}

/// Parses one element with all its properties as described by `def`. Every
/// value is passed to `sink`. The type parameter `E` is used to actually read
/// values.
fn parse_element<E: EncodingReader, I: Input>(
    buf: &mut I,
    def: &ElementDef,
    sink: &mut impl ValueSink,
) -> Result<(), Error> {
    if def.property_defs.is_empty() {
        E::finish_element(buf)?;
        return Ok(());
    }

    E::start_element(buf)?;
    let last = def.property_defs.len() - 1;
    for (i, prop_def) in def.property_defs.iter().enumerate() {
        let prop = PropIndex::from(i);

        match prop_def.ty {
            PropertyType::Scalar(ty) => sink.value(prop, read_value::<E, _>(buf, ty)?)?,
            PropertyType::List { len_type, scalar_type } => {
                let start = buf.offset();
                let len = match read_value::<E, _>(buf, len_type)? {
                    // We know that the `len_type` is an unsigned integer type,
                    // because it was checked while parsing the header.
                    Value::Int(len) => u32::try_from(len).ok(),
                    Value::Float(_) => None,
                };
                let len = len.ok_or_else(|| parse::Error::Custom(
                    format!("invalid list length for property '{}'", prop_def.name),
                    Span::new(start, buf.offset()),
                ))?;

                sink.list_start(prop, len);
                for _ in 0..len {
                    E::skip_separator(buf)?;
                    sink.value(prop, read_value::<E, _>(buf, scalar_type)?)?;
                }
            }
        }

        // If this was the last property, finish the element, otherwise skip a
        // separator.
        if i == last {
            E::finish_element(buf)?;
        } else {
            E::skip_separator(buf)?;
        }
    }

    Ok(())
}


// ===========================================================================
// ===== ValueSink
// ===========================================================================

/// One scalar value read from the body of a PLY file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Any of the integer types.
    Int(i64),

    /// `float` or `double`.
    Float(f64),
}

/// A type that accepts the raw values of a PLY file one by one. This is
/// mainly used for [`Reader::read_raw_into`].
pub trait ValueSink {
    /// Is called when a new element group begins. `def` describes the layout
    /// of all elements in this group. This method is *always* called before
    /// values of that group are passed.
    fn element_group_start(&mut self, def: &ElementDef);

    /// Is called before the entries of a list property are passed via
    /// `value`. Does nothing by default.
    fn list_start(&mut self, _prop: PropIndex, _len: u32) {}

    /// Is called for each scalar and for each list entry, in file order.
    /// `prop` refers to the property list of the current element group.
    fn value(&mut self, prop: PropIndex, value: Value) -> Result<(), Error>;
}


// ===========================================================================
// ===== Assembling the mesh
// ===========================================================================

/// The values of one property.
#[derive(Debug)]
struct Bucket {
    /// Attribute key, `"<element>_<property>"`.
    name: String,
    values: AttributeValues,
    shape: Shape,
}

#[derive(Debug)]
enum Shape {
    Scalar,

    /// `len` is the length of the first list, `uniform` says whether all
    /// other lists had the same length.
    List {
        len: Option<u32>,
        uniform: bool,
    },
}

impl Bucket {
    /// Number of values per element, if that is well defined.
    fn arity(&self) -> Option<usize> {
        match self.shape {
            Shape::Scalar => Some(1),
            Shape::List { len: Some(len), uniform: true } => Some(len as usize),
            Shape::List { .. } => None,
        }
    }
}

#[derive(Debug)]
struct Group {
    element: ElementKind,
    count: usize,
    buckets: Vec<Bucket>,
}

/// Collects all values in one bucket per property.
#[derive(Debug, Default)]
struct BucketSink {
    groups: Vec<Group>,
}

impl ValueSink for BucketSink {
    fn element_group_start(&mut self, def: &ElementDef) {
        let element = ElementKind::from_name(&def.name);
        let buckets = def.property_defs.iter()
            .map(|prop| {
                let kind = if prop.ty.scalar_type().is_floating_point() {
                    AttrKind::Float
                } else {
                    AttrKind::Int
                };
                let shape = match prop.ty {
                    PropertyType::Scalar(_) => Shape::Scalar,
                    PropertyType::List { .. } => Shape::List { len: None, uniform: true },
                };

                Bucket {
                    name: element.attribute_name(&prop.name),
                    values: AttributeValues::new(kind),
                    shape,
                }
            })
            .collect();

        self.groups.push(Group {
            element,
            count: def.count as usize,
            buckets,
        });
    }

    fn list_start(&mut self, prop: PropIndex, len: u32) {
        if let Some(bucket) = self.bucket(prop) {
            if let Shape::List { len: first, uniform } = &mut bucket.shape {
                match *first {
                    None => *first = Some(len),
                    Some(l) if l != len => *uniform = false,
                    Some(_) => {}
                }
            }
        }
    }

    fn value(&mut self, prop: PropIndex, value: Value) -> Result<(), Error> {
        let bucket = match self.bucket(prop) {
            Some(bucket) => bucket,
            None => return Ok(()),
        };

        let Bucket { name, values, .. } = bucket;
        match (values, value) {
            (AttributeValues::Float(values), Value::Float(v)) => values.push(v),
            (AttributeValues::Float(values), Value::Int(v)) => values.push(v as f64),
            (AttributeValues::Int(values), Value::Int(v)) => match i32::try_from(v) {
                Ok(v) => values.push(v),
                Err(_) => return Err(error::value_out_of_range(name.as_str(), v as f64, "int")),
            },
            (AttributeValues::Int(values), Value::Float(v)) => values.push(v as i32),
        }

        Ok(())
    }
}

impl BucketSink {
    fn bucket(&mut self, prop: PropIndex) -> Option<&mut Bucket> {
        self.groups.last_mut().and_then(|g| g.buckets.get_mut(prop.idx()))
    }

    fn find(&self, name: &str) -> Option<(&Group, &Bucket)> {
        self.groups.iter()
            .flat_map(|g| g.buckets.iter().map(move |b| (g, b)))
            .find(|(_, b)| b.name == name)
    }

    fn into_mesh(self) -> Result<MeshData, Error> {
        let (dim, vertices) = self.vertices()?;
        let num_vertices = if dim == 0 { 0 } else { vertices.len() / dim };
        let (faces, vertex_per_face) = self.connectivity(ElementKind::Face, num_vertices, 3)?;
        let (voxels, vertex_per_voxel) = self.connectivity(ElementKind::Voxel, num_vertices, 0)?;

        let mut attributes = AttributeStore::new();
        for group in self.groups {
            for bucket in group.buckets {
                let arity = match bucket.arity() {
                    Some(arity) => arity,
                    None if bucket.values.is_empty() => 1,
                    None => {
                        warn!(
                            "lists of '{}' have different lengths, storing its values with \
                                arity 1",
                            bucket.name,
                        );
                        1
                    }
                };

                attributes.insert(bucket.name, group.element.clone(), arity, bucket.values)?;
            }
        }

        Ok(MeshData {
            // A file without coordinates still describes a (3D) mesh.
            dim: if dim == 0 { 3 } else { dim },
            vertices,
            faces,
            vertex_per_face,
            voxels,
            vertex_per_voxel,
            attributes,
        })
    }

    /// Interleaves the `vertex_x`, `vertex_y` and `vertex_z` buckets (as far
    /// as they exist) into one coordinate buffer.
    fn vertices(&self) -> Result<(usize, Vec<f64>), Error> {
        let axes = ["vertex_x", "vertex_y", "vertex_z"].iter()
            .filter_map(|name| self.find(name))
            .map(|(_, b)| &b.values)
            .collect::<Vec<_>>();

        let dim = axes.len();
        let num_vertices = axes.iter().map(|values| values.len()).min().unwrap_or(0);

        let mut vertices = Vec::with_capacity(dim * num_vertices);
        for i in 0..num_vertices {
            for values in &axes {
                let v = values.value_as_f64(i);
                if !v.is_finite() {
                    return Err(Error::NonFiniteVertex);
                }
                vertices.push(v);
            }
        }

        Ok((dim, vertices))
    }

    /// Extracts the vertex indices of all faces or voxels from
    /// `<element>_vertex_indices` or `<element>_vertex_index`. Returns the
    /// flat index list and the arity.
    fn connectivity(
        &self,
        element: ElementKind,
        num_vertices: usize,
        default_arity: usize,
    ) -> Result<(Vec<u32>, usize), Error> {
        let found = self.find(&element.attribute_name("vertex_indices"))
            .or_else(|| self.find(&element.attribute_name("vertex_index")));
        let (group, bucket) = match found {
            Some(found) => found,
            None => return Ok((vec![], default_arity)),
        };

        let total = bucket.values.len();
        if group.count == 0 && total == 0 {
            return Ok((vec![], default_arity));
        }

        let arity = match bucket.arity() {
            Some(arity) if arity > 0 && arity * group.count == total => arity,
            _ => {
                return Err(Error::InconsistentArity {
                    element,
                    total,
                    count: group.count,
                });
            }
        };

        let indices = (0..total)
            .map(|i| {
                let index = bucket.values.value_as_f64(i) as i64;
                if index < 0 || index as usize >= num_vertices {
                    return Err(Error::IndexOutOfBounds {
                        element: element.clone(),
                        index,
                        len: num_vertices,
                    });
                }
                Ok(index as u32)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((indices, arity))
    }
}
