//! Reading and writing mesh files.
//!
//! Both readers produce a [`MeshData`]. Anything that implements
//! [`MeshSource`] can be written with the PLY writer, and a parsed mesh can
//! be pushed into any [`MeshSink`].

use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Cursor, Read, Write},
    path::Path,
};

use log::warn;

use crate::attr::{AttrKind, AttributeStore, AttributeValues, ElementKind};


pub(crate) mod error;
pub mod obj;
pub mod parse;
pub mod ply;

#[cfg(test)]
mod tests;


pub use self::error::Error;


// ===========================================================================
// ===== File formats and encodings
// ===========================================================================

/// Represents one of the supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Obj,
    Ply,
}

/// How likely it is that some data is in a specific format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsFormat {
    /// The data starts with the magic number of the format.
    Probably,

    /// The format has no magic number, but nothing speaks against it.
    Maybe,

    No,
}

/// Line prefixes that commonly start an OBJ file.
const OBJ_LINE_STARTS: &[&[u8]] = &[
    b"#", b"v ", b"v\t", b"vn ", b"vt ", b"vp ", b"f ", b"o ", b"g ", b"s ",
    b"mtllib", b"usemtl",
];

impl FileFormat {
    /// Tries to guess the file format from the file extension (ignoring
    /// case).
    ///
    /// Returns `None` if:
    /// - the path/file has no extension in its name, or
    /// - the extension is no valid UTF8, or
    /// - the file extension is not known.
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| {
                match ext.to_ascii_lowercase().as_str() {
                    "obj" => Some(FileFormat::Obj),
                    "ply" => Some(FileFormat::Ply),
                    _ => None,
                }
            })
    }

    /// Guesses the file format from the first few bytes of a file. A PLY
    /// magic number wins, otherwise the data is checked for plausible OBJ
    /// lines.
    pub fn from_file_start(data: &[u8]) -> Option<Self> {
        match (FileFormat::Ply.is_file_start(data), FileFormat::Obj.is_file_start(data)) {
            (IsFormat::Probably, _) => Some(FileFormat::Ply),
            (_, IsFormat::Probably) | (_, IsFormat::Maybe) => Some(FileFormat::Obj),
            (IsFormat::Maybe, IsFormat::No) => Some(FileFormat::Ply),
            (IsFormat::No, IsFormat::No) => None,
        }
    }

    /// Checks whether `data`, the start of a file, could be in this format.
    pub fn is_file_start(&self, data: &[u8]) -> IsFormat {
        match self {
            FileFormat::Ply => {
                if data.starts_with(b"ply\n") || data.starts_with(b"ply\r\n") {
                    IsFormat::Probably
                } else if !data.is_empty() && b"ply\n".starts_with(data) {
                    IsFormat::Maybe
                } else {
                    IsFormat::No
                }
            }
            FileFormat::Obj => {
                // OBJ is a text format without magic number.
                if !data.is_ascii() {
                    return IsFormat::No;
                }

                let first_line = data.split(|&b| b == b'\n')
                    .map(|line| {
                        let start = line.iter()
                            .position(|b| !b.is_ascii_whitespace())
                            .unwrap_or(line.len());
                        &line[start..]
                    })
                    .find(|line| !line.is_empty());

                match first_line {
                    None => IsFormat::Maybe,
                    Some(line) if OBJ_LINE_STARTS.iter().any(|s| line.starts_with(s)) => {
                        IsFormat::Maybe
                    }
                    Some(_) => IsFormat::No,
                }
            }
        }
    }

    /// Returns the canonical (lowercase) file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Obj => "obj",
            FileFormat::Ply => "ply",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            FileFormat::Obj => "OBJ",
            FileFormat::Ply => "PLY",
        })
    }
}

/// Describes the encoding of the main data of a mesh file.
///
/// OBJ is always ASCII, PLY supports all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    BinaryBigEndian,
    BinaryLittleEndian,
}

impl Encoding {
    /// The keyword used in the `format` line of a PLY header.
    pub fn ply_keyword(&self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::BinaryBigEndian => "binary_big_endian",
            Encoding::BinaryLittleEndian => "binary_little_endian",
        }
    }
}


// ===========================================================================
// ===== Reading
// ===========================================================================

/// Reads the mesh file at `path`. The format is determined by the file
/// extension or, if that fails, by looking at the start of the file.
pub fn read_file(path: impl AsRef<Path>) -> Result<MeshData, Error> {
    let path = path.as_ref();
    let format = match FileFormat::from_extension(path) {
        Some(format) => format,
        None => {
            let mut start = Vec::with_capacity(512);
            File::open(path)?.take(512).read_to_end(&mut start)?;
            FileFormat::from_file_start(&start)
                .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?
        }
    };

    read(File::open(path)?, format)
}

/// Reads a mesh in the given format from `reader`.
pub fn read(reader: impl Read, format: FileFormat) -> Result<MeshData, Error> {
    match format {
        FileFormat::Obj => obj::Reader::new(reader).read(),
        FileFormat::Ply => ply::Reader::new(reader)?.read(),
    }
}


// ===========================================================================
// ===== Writing
// ===========================================================================

/// Types that can serialize a mesh. The mesh is already stored within the
/// type.
///
/// The main method of this trait is `write_to` which writes the mesh to a
/// given `io::Write` destination. There are some other provided methods for
/// easily writing to a file, to stdout and to memory.
pub trait MeshWriter {
    /// Writes the mesh into the given `Write` instance.
    fn write_to(&self, writer: impl Write) -> Result<(), Error>;

    /// Writes the mesh to the file given by the filename. Overwrites the file
    /// if it already exists.
    fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Writes the mesh to stdout. Locks stdout for the time the mesh is being
    /// written.
    fn write_to_stdout(&self) -> Result<(), Error> {
        let stdout = io::stdout();
        let lock = stdout.lock();
        self.write_to(lock)
    }

    /// Writes the mesh into a `Vec<u8>` which is returned on success.
    fn write_to_memory(&self) -> Result<Vec<u8>, Error> {
        let mut w = Cursor::new(Vec::new());
        self.write_to(&mut w)?;
        Ok(w.into_inner())
    }
}


// ===========================================================================
// ===== Source and sink contracts
// ===========================================================================

/// Read access to a mesh with flat buffers.
///
/// Vertices are stored as `dim()` coordinates each, faces as
/// `vertex_per_face()` 0-based vertex indices each, voxels likewise.
pub trait MeshSource {
    /// Dimension of the vertex coordinates, 2 or 3.
    fn dim(&self) -> usize;
    fn vertex_per_face(&self) -> usize;

    /// Vertices per voxel, 0 for surface meshes.
    fn vertex_per_voxel(&self) -> usize;

    fn vertices(&self) -> &[f64];
    fn faces(&self) -> &[u32];
    fn voxels(&self) -> &[u32];

    fn attribute(&self, name: &str) -> Option<&AttributeValues>;

    /// Names of all float attributes, in declaration order.
    fn float_attribute_names(&self) -> Vec<&str>;

    /// Names of all integer attributes, in declaration order.
    fn int_attribute_names(&self) -> Vec<&str>;


    fn vertex_arity(&self) -> usize {
        self.dim()
    }

    fn num_vertices(&self) -> usize {
        count_chunks(self.vertices().len(), self.dim())
    }

    fn num_faces(&self) -> usize {
        count_chunks(self.faces().len(), self.vertex_per_face())
    }

    fn num_voxels(&self) -> usize {
        count_chunks(self.voxels().len(), self.vertex_per_voxel())
    }

    /// Total number of scalars of the named attribute, or `None` if there is
    /// no such attribute.
    fn attribute_size(&self, name: &str) -> Option<usize> {
        self.attribute(name).map(|values| values.len())
    }

    /// Copies all vertex coordinates into `buffer`, which has to hold at
    /// least `vertices().len()` values.
    fn export_vertices(&self, buffer: &mut [f64]) {
        let src = self.vertices();
        buffer[..src.len()].copy_from_slice(src);
    }

    fn export_faces(&self, buffer: &mut [u32]) {
        let src = self.faces();
        buffer[..src.len()].copy_from_slice(src);
    }

    fn export_voxels(&self, buffer: &mut [u32]) {
        let src = self.voxels();
        buffer[..src.len()].copy_from_slice(src);
    }

    /// Copies the values of the named attribute into `buffer`, converting
    /// integers to floats. If the attribute does not exist, a warning is
    /// logged and `buffer` is left untouched.
    fn export_float_attribute(&self, name: &str, buffer: &mut [f64]) {
        match self.attribute(name) {
            Some(AttributeValues::Float(values)) => {
                buffer[..values.len()].copy_from_slice(values);
            }
            Some(AttributeValues::Int(values)) => {
                for (out, &v) in buffer.iter_mut().zip(values) {
                    *out = v.into();
                }
            }
            None => warn!("mesh does not have an attribute named '{}'", name),
        }
    }

    /// Copies the values of the named attribute into `buffer`, truncating
    /// floats. If the attribute does not exist, a warning is logged and
    /// `buffer` is left untouched.
    fn export_int_attribute(&self, name: &str, buffer: &mut [i32]) {
        match self.attribute(name) {
            Some(AttributeValues::Int(values)) => {
                buffer[..values.len()].copy_from_slice(values);
            }
            Some(AttributeValues::Float(values)) => {
                for (out, &v) in buffer.iter_mut().zip(values) {
                    *out = v as i32;
                }
            }
            None => warn!("mesh does not have an attribute named '{}'", name),
        }
    }
}

fn count_chunks(len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 { 0 } else { len / chunk_size }
}

/// A mesh builder that can be filled element by element.
///
/// The arities have to be set before the first vertex, face or voxel is
/// added. Attributes have to be declared before values are added to them.
pub trait MeshSink {
    fn set_dim(&mut self, dim: usize);
    fn set_vertex_per_face(&mut self, arity: usize);
    fn set_vertex_per_voxel(&mut self, arity: usize);

    fn add_vertex(&mut self, coords: &[f64]);
    fn add_face(&mut self, vertices: &[u32]);
    fn add_voxel(&mut self, vertices: &[u32]);

    fn declare_attribute(
        &mut self,
        name: &str,
        element: ElementKind,
        kind: AttrKind,
        arity: usize,
    ) -> Result<(), Error>;

    fn add_float_values(&mut self, name: &str, values: &[f64]) -> Result<(), Error>;
    fn add_int_values(&mut self, name: &str, values: &[i32]) -> Result<(), Error>;
}


// ===========================================================================
// ===== MeshData
// ===========================================================================

/// The uniform result of reading a mesh file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub(crate) dim: usize,
    pub(crate) vertices: Vec<f64>,
    pub(crate) faces: Vec<u32>,
    pub(crate) vertex_per_face: usize,
    pub(crate) voxels: Vec<u32>,
    pub(crate) vertex_per_voxel: usize,
    pub(crate) attributes: AttributeStore,
}

impl Default for MeshData {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshData {
    /// An empty 3D triangle mesh without voxels.
    pub fn new() -> Self {
        Self {
            dim: 3,
            vertices: Vec::new(),
            faces: Vec::new(),
            vertex_per_face: 3,
            voxels: Vec::new(),
            vertex_per_voxel: 0,
            attributes: AttributeStore::new(),
        }
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Pushes the whole mesh, including all attributes in declaration
    /// order, into `sink`.
    pub fn transfer_to(&self, sink: &mut impl MeshSink) -> Result<(), Error> {
        sink.set_dim(self.dim);
        sink.set_vertex_per_face(self.vertex_per_face);
        sink.set_vertex_per_voxel(self.vertex_per_voxel);

        if self.dim > 0 {
            self.vertices.chunks(self.dim).for_each(|v| sink.add_vertex(v));
        }
        if self.vertex_per_face > 0 {
            self.faces.chunks(self.vertex_per_face).for_each(|f| sink.add_face(f));
        }
        if self.vertex_per_voxel > 0 {
            self.voxels.chunks(self.vertex_per_voxel).for_each(|v| sink.add_voxel(v));
        }

        for (id, def) in self.attributes.iter() {
            sink.declare_attribute(&def.name, def.element.clone(), def.kind, def.arity)?;
            match self.attributes.values(id) {
                AttributeValues::Float(values) => sink.add_float_values(&def.name, values)?,
                AttributeValues::Int(values) => sink.add_int_values(&def.name, values)?,
            }
        }

        Ok(())
    }
}

impl MeshSource for MeshData {
    fn dim(&self) -> usize {
        self.dim
    }

    fn vertex_per_face(&self) -> usize {
        self.vertex_per_face
    }

    fn vertex_per_voxel(&self) -> usize {
        self.vertex_per_voxel
    }

    fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    fn faces(&self) -> &[u32] {
        &self.faces
    }

    fn voxels(&self) -> &[u32] {
        &self.voxels
    }

    fn attribute(&self, name: &str) -> Option<&AttributeValues> {
        self.attributes.get(name)
    }

    fn float_attribute_names(&self) -> Vec<&str> {
        self.attributes.float_names()
    }

    fn int_attribute_names(&self) -> Vec<&str> {
        self.attributes.int_names()
    }
}

impl MeshSink for MeshData {
    fn set_dim(&mut self, dim: usize) {
        self.dim = dim;
    }

    fn set_vertex_per_face(&mut self, arity: usize) {
        self.vertex_per_face = arity;
    }

    fn set_vertex_per_voxel(&mut self, arity: usize) {
        self.vertex_per_voxel = arity;
    }

    fn add_vertex(&mut self, coords: &[f64]) {
        debug_assert_eq!(coords.len(), self.dim);
        self.vertices.extend_from_slice(coords);
    }

    fn add_face(&mut self, vertices: &[u32]) {
        debug_assert_eq!(vertices.len(), self.vertex_per_face);
        self.faces.extend_from_slice(vertices);
    }

    fn add_voxel(&mut self, vertices: &[u32]) {
        debug_assert_eq!(vertices.len(), self.vertex_per_voxel);
        self.voxels.extend_from_slice(vertices);
    }

    fn declare_attribute(
        &mut self,
        name: &str,
        element: ElementKind,
        kind: AttrKind,
        arity: usize,
    ) -> Result<(), Error> {
        self.attributes.insert(name, element, arity, AttributeValues::new(kind))?;
        Ok(())
    }

    fn add_float_values(&mut self, name: &str, values: &[f64]) -> Result<(), Error> {
        let id = self.attributes.id(name)
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))?;
        for &v in values {
            self.attributes.push_float(id, v);
        }

        Ok(())
    }

    fn add_int_values(&mut self, name: &str, values: &[i32]) -> Result<(), Error> {
        let id = self.attributes.id(name)
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))?;
        for &v in values {
            self.attributes.push_int(id, v);
        }

        Ok(())
    }
}
