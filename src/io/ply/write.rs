//! Everything related to writing a PLY file.
//!
//! # Random notes on the format
//!
//! - The header always ends its lines with `'\n'`, like all files in the
//!   wild do.
//! - For ASCII encoding we simply use the `fmt::Display` impl of all types,
//!   which prints the shortest representation that parses back to the same
//!   value.
//! - Attribute properties are named like the attribute, without any
//!   processing. Properties named `red`, `green` or `blue` are always written
//!   as `uchar`, as that's what everyone expects for color channels.


use std::{
    fmt,
    io::{self, Write},
};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use log::warn;

use crate::{
    attr::{AttrKind, AttributeValues, ElementKind},
    io::{Encoding, Error, MeshSource, MeshWriter, error},
};
use super::{ElementDef, PropertyDef, PropertyType, ScalarType};



// ===============================================================================================
// ===== PLY Config
// ===============================================================================================

/// The type used for coordinates and float attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatType {
    Float,
    Double,
}

impl FloatType {
    fn scalar_type(self) -> ScalarType {
        match self {
            FloatType::Float => ScalarType::Float,
            FloatType::Double => ScalarType::Double,
        }
    }
}

/// Used to configure and create a [`Writer`].
///
/// This is used to configure basic settings for the file to be written. Most
/// importantly, this is the file encoding and the list of attributes to
/// write. Additionally, you can add comments to the file header. With
/// [`Config::into_writer`] you can create a [`Writer`] for a specific mesh.
#[derive(Clone, Debug)]
pub struct Config {
    encoding: Encoding,
    float_type: FloatType,
    comments: Vec<String>,
    attributes: Vec<String>,
}

impl Config {
    /// Creates a new configuration with binary little endian encoding.
    pub fn binary() -> Self {
        Self::new(Encoding::BinaryLittleEndian)
    }

    /// Creates a new configuration with ASCII encoding.
    ///
    /// ASCII encoding is usually a lot less space efficient and a lot slower
    /// to read and write. The PLY file header is always ASCII.
    pub fn ascii() -> Self {
        Self::new(Encoding::Ascii)
    }

    /// Creates a new configuration with the given encoding. Floats are
    /// written as `double` and the header contains one comment naming this
    /// library.
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            float_type: FloatType::Double,
            comments: vec![concat!("Generated by ", env!("CARGO_PKG_NAME")).into()],
            attributes: vec![],
        }
    }

    /// Sets the type used for vertex coordinates and float attributes.
    pub fn scalar_type(mut self, ty: FloatType) -> Self {
        self.float_type = ty;
        self
    }

    /// Adds a `comment` line to the file header.
    ///
    /// The given string must not contain `'\n'` or else this method panics.
    pub fn add_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();

        assert!(!comment.contains('\n'), "PLY comments must not contain '\\n'!");

        self.comments.push(comment);
        self
    }

    /// Adds the attribute with the given name to the list of attributes to
    /// write. The element (vertex, face or voxel) is determined from the
    /// number of values when writing.
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// Creates a writer for the given mesh with `self` as configuration.
    pub fn into_writer<S: MeshSource>(self, src: &S) -> Writer<'_, S> {
        Writer {
            config: self,
            src,
        }
    }
}


// ===============================================================================================
// ===== PLY Writer
// ===============================================================================================

/// A writer able to write binary and ASCII PLY files. Implements
/// [`MeshWriter`].
///
/// # Example
///
/// ```no_run
/// use polyio::io::{Error, MeshSource, MeshWriter, ply::Config};
///
/// fn write_both_encodings(src: &impl MeshSource) -> Result<(), Error> {
///     Config::ascii().into_writer(src).write_to_file("mesh_ascii.ply")?;
///     Config::binary()
///         .with_attribute("vertex_weight")
///         .into_writer(src)
///         .write_to_file("mesh_binary.ply")?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Writer<'a, S: MeshSource> {
    config: Config,
    src: &'a S,
}

/// One attribute property of an element.
#[derive(Debug)]
struct Column<'a> {
    name: &'a str,
    values: &'a AttributeValues,
    arity: usize,
    ty: ScalarType,
}

/// The attribute properties per element, in the order they were requested.
#[derive(Debug, Default)]
struct Layout<'a> {
    vertex: Vec<Column<'a>>,
    face: Vec<Column<'a>>,
    voxel: Vec<Column<'a>>,
}

const AXES: [&str; 3] = ["x", "y", "z"];

impl<'a, S: MeshSource> Writer<'a, S> {
    /// Assigns every requested attribute to an element: the first of
    /// vertex, face and voxel whose (non-zero) count divides the number of
    /// values.
    fn layout(&self) -> Result<Layout<'_>, Error> {
        let src = self.src;
        let counts = [
            (ElementKind::Vertex, src.num_vertices()),
            (ElementKind::Face, src.num_faces()),
            (ElementKind::Voxel, src.num_voxels()),
        ];

        let mut layout = Layout::default();
        for name in &self.config.attributes {
            let values = src.attribute(name)
                .ok_or_else(|| Error::AttributeNotFound(name.clone()))?;
            let len = values.len();

            let (element, count) = counts.iter()
                .find(|(_, count)| *count > 0 && len >= *count && len % count == 0)
                .ok_or_else(|| Error::UnclassifiableAttribute {
                    name: name.clone(),
                    len,
                    num_vertices: counts[0].1,
                    num_faces: counts[1].1,
                    num_voxels: counts[2].1,
                })?;

            // The list length is stored as `uchar`
            let arity = len / count;
            if arity > u8::max_value() as usize {
                return Err(error::value_out_of_range(name, arity as f64, "uchar"));
            }

            let ty = match (name.as_str(), values.kind()) {
                ("red", _) | ("green", _) | ("blue", _) => ScalarType::UChar,
                (_, AttrKind::Int) => ScalarType::Int,
                (_, AttrKind::Float) => self.config.float_type.scalar_type(),
            };

            let column = Column { name: name.as_str(), values, arity, ty };
            match element {
                ElementKind::Vertex => layout.vertex.push(column),
                ElementKind::Face => layout.face.push(column),
                _ => layout.voxel.push(column),
            }
        }

        Ok(layout)
    }

    /// Builds the element definitions of the header.
    fn header(&self, layout: &Layout<'_>) -> Result<Vec<ElementDef>, Error> {
        fn property_def(col: &Column<'_>) -> PropertyDef {
            let ty = if col.arity == 1 {
                PropertyType::Scalar(col.ty)
            } else {
                PropertyType::List { len_type: ScalarType::UChar, scalar_type: col.ty }
            };

            PropertyDef { ty, name: col.name.to_string() }
        }

        fn indices_def(element: &str, arity: usize) -> Result<PropertyDef, Error> {
            if arity > u8::max_value() as usize {
                let name = format!("{}_vertex_indices", element);
                return Err(error::value_out_of_range(&name, arity as f64, "uchar"));
            }

            Ok(PropertyDef {
                ty: PropertyType::List {
                    len_type: ScalarType::UChar,
                    scalar_type: ScalarType::Int,
                },
                name: "vertex_indices".into(),
            })
        }

        let src = self.src;
        let coord_type = PropertyType::Scalar(self.config.float_type.scalar_type());

        let mut vertex_def = ElementDef {
            name: "vertex".into(),
            count: src.num_vertices() as u64,
            property_defs: AXES.iter()
                .take(src.dim())
                .map(|&axis| PropertyDef { ty: coord_type, name: axis.into() })
                .collect(),
        };
        vertex_def.property_defs.extend(layout.vertex.iter().map(property_def));

        let mut face_def = ElementDef {
            name: "face".into(),
            count: src.num_faces() as u64,
            property_defs: vec![indices_def("face", src.vertex_per_face())?],
        };
        face_def.property_defs.extend(layout.face.iter().map(property_def));

        let mut header = vec![vertex_def, face_def];

        if src.num_voxels() > 0 {
            let mut voxel_def = ElementDef {
                name: "voxel".into(),
                count: src.num_voxels() as u64,
                property_defs: vec![indices_def("voxel", src.vertex_per_voxel())?],
            };
            voxel_def.property_defs.extend(layout.voxel.iter().map(property_def));
            header.push(voxel_def);
        }

        Ok(header)
    }

    /// Writes the header lines for the given element definitions.
    fn write_header(&self, w: &mut impl Write, header: &[ElementDef]) -> Result<(), Error> {
        // Magic signature
        w.write_all(b"ply\n")?;

        // The line defining the format of the file
        writeln!(w, "format {} 1.0", self.config.encoding.ply_keyword())?;

        // Add all comments
        for comment in &self.config.comments {
            writeln!(w, "comment {}", comment)?;
        }

        // Define all elements with their properties
        for element_def in header {
            writeln!(w, "element {} {}", element_def.name, element_def.count)?;
            for prop in &element_def.property_defs {
                match prop.ty {
                    PropertyType::Scalar(ty) => {
                        writeln!(w, "property {} {}", ty, prop.name)?;
                    }
                    PropertyType::List { scalar_type, len_type } => {
                        writeln!(w, "property list {} {} {}", len_type, scalar_type, prop.name)?;
                    }
                }
            }
        }

        w.write_all(b"end_header\n")?;
        Ok(())
    }

    /// Writes all elements in header order.
    fn write_body(&self, ser: &mut impl Serializer, layout: &Layout<'_>) -> Result<(), Error> {
        let src = self.src;
        let dim = src.dim();
        if dim > AXES.len() {
            warn!("PLY only stores 3 coordinates per vertex, ignoring the others");
        }

        for (i, coords) in src.vertices().chunks(dim.max(1)).enumerate() {
            for &c in coords.iter().take(AXES.len()) {
                self.write_float(ser, c)?;
            }
            for col in &layout.vertex {
                self.write_column(ser, col, i)?;
            }
            ser.end_element()?;
        }

        let elements = [
            (src.faces(), src.vertex_per_face(), &layout.face, "face_vertex_indices"),
            (src.voxels(), src.vertex_per_voxel(), &layout.voxel, "voxel_vertex_indices"),
        ];
        for &(indices, arity, columns, name) in &elements {
            if arity == 0 {
                continue;
            }

            for (i, element) in indices.chunks(arity).enumerate() {
                ser.add(arity as u8)?;
                for &idx in element {
                    if idx > i32::max_value() as u32 {
                        return Err(error::value_out_of_range(name, idx.into(), "int"));
                    }
                    ser.add(idx as i32)?;
                }
                for col in columns {
                    self.write_column(ser, col, i)?;
                }
                ser.end_element()?;
            }
        }

        Ok(())
    }

    fn write_float(&self, ser: &mut impl Serializer, v: f64) -> Result<(), Error> {
        match self.config.float_type {
            FloatType::Float => ser.add(v as f32),
            FloatType::Double => ser.add(v),
        }
    }

    /// Writes the values of the `i`-th element of the given attribute.
    fn write_column(&self, ser: &mut impl Serializer, col: &Column<'_>, i: usize) -> Result<(), Error> {
        if col.arity != 1 {
            ser.add(col.arity as u8)?;
        }

        for idx in i * col.arity..(i + 1) * col.arity {
            match (col.ty, col.values) {
                (ScalarType::UChar, values) => {
                    let v = values.value_as_f64(idx);
                    if !(0.0..=255.0).contains(&v) {
                        return Err(error::value_out_of_range(col.name, v, "uchar"));
                    }
                    ser.add(v as u8)?;
                }
                (_, AttributeValues::Int(values)) => ser.add(values[idx])?,
                (_, AttributeValues::Float(values)) => self.write_float(ser, values[idx])?,
            }
        }

        Ok(())
    }
}

impl<S: MeshSource> MeshWriter for Writer<'_, S> {
    fn write_to(&self, mut writer: impl Write) -> Result<(), Error> {
        let layout = self.layout()?;
        let header = self.header(&layout)?;
        self.write_header(&mut writer, &header)?;

        match self.config.encoding {
            Encoding::Ascii => self.write_body(&mut AsciiSerializer::new(&mut writer), &layout),
            Encoding::BinaryBigEndian => {
                self.write_body(&mut BinaryBeSerializer::new(&mut writer), &layout)
            }
            Encoding::BinaryLittleEndian => {
                self.write_body(&mut BinaryLeSerializer::new(&mut writer), &layout)
            }
        }
    }
}


// ===============================================================================================
// ===== Definition of ASCII and binary serializers
// ===============================================================================================
// These serializers are just used to abstract over the encoding (and things
// like separators and line endings).

/// The primitive types we write.
trait PlyScalar: Copy + fmt::Display {
    fn write_binary<B: ByteOrder, W: Write>(self, w: &mut W) -> io::Result<()>;
}

impl PlyScalar for u8 {
    fn write_binary<B: ByteOrder, W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_u8(self)
    }
}

impl PlyScalar for i32 {
    fn write_binary<B: ByteOrder, W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_i32::<B>(self)
    }
}

impl PlyScalar for f32 {
    fn write_binary<B: ByteOrder, W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_f32::<B>(self)
    }
}

impl PlyScalar for f64 {
    fn write_binary<B: ByteOrder, W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_f64::<B>(self)
    }
}

trait Serializer {
    fn add<P: PlyScalar>(&mut self, v: P) -> Result<(), Error>;
    fn end_element(&mut self) -> Result<(), Error>;
}

#[derive(Debug)]
struct AsciiSerializer<'a, W: Write> {
    writer: &'a mut W,
    at_start_of_line: bool,
}

impl<'a, W: Write> AsciiSerializer<'a, W> {
    fn new(w: &'a mut W) -> Self {
        Self {
            writer: w,
            at_start_of_line: true,
        }
    }

    fn write_separator(&mut self) -> Result<(), Error> {
        if self.at_start_of_line {
            self.at_start_of_line = false;
        } else {
            self.writer.write_all(b" ")?;
        }

        Ok(())
    }
}

impl<W: Write> Serializer for AsciiSerializer<'_, W> {
    fn add<P: PlyScalar>(&mut self, v: P) -> Result<(), Error> {
        self.write_separator()?;
        write!(self.writer, "{}", v)?;
        Ok(())
    }

    fn end_element(&mut self) -> Result<(), Error> {
        self.writer.write_all(b"\n")?;
        self.at_start_of_line = true;
        Ok(())
    }
}

macro_rules! gen_binary_block {
    ($name:ident, $endianness:ident) => {
        #[derive(Debug)]
        struct $name<'a, W: Write> {
            writer: &'a mut W,
        }

        impl<'a, W: Write> $name<'a, W> {
            fn new(w: &'a mut W) -> Self {
                Self {
                    writer: w,
                }
            }
        }

        impl<W: Write> Serializer for $name<'_, W> {
            fn add<P: PlyScalar>(&mut self, v: P) -> Result<(), Error> {
                v.write_binary::<$endianness, _>(&mut *self.writer).map_err(|e| e.into())
            }

            fn end_element(&mut self) -> Result<(), Error> {
                // NOOP
                Ok(())
            }
        }
    }
}

gen_binary_block!(BinaryBeSerializer, BigEndian);
gen_binary_block!(BinaryLeSerializer, LittleEndian);
