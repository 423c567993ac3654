//! Reading and writing PLY files.
//!
//! The reader accepts all three encodings (`ascii`, `binary_little_endian`
//! and `binary_big_endian`) and arbitrary elements and properties. Every
//! property ends up as attribute `"<element>_<property>"` of the resulting
//! [`MeshData`][crate::io::MeshData]; vertex positions, faces and voxels are
//! additionally extracted from the well known properties `vertex_{x,y,z}`,
//! `face_vertex_indices` and `voxel_vertex_indices`.
//!
//! The writer is configured with a [`Config`] and writes any
//! [`MeshSource`][crate::io::MeshSource] plus a list of its attributes.

use std::{
    fmt,
    str::FromStr,
};

use derive_more::From;


mod read;
mod write;



pub use self::{
    read::{Reader, Value, ValueSink},
    write::{Config, FloatType, Writer},
};


// ===========================================================================
// ===== Header definitions
// ===========================================================================

/// The header definition of one element group.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDef {
    pub name: String,

    /// Number of elements in this group.
    pub count: u64,

    /// Definitions for all properties of elements in this group.
    pub property_defs: Vec<PropertyDef>,
}

/// The header definition of one property of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub ty: PropertyType,
    pub name: String,
}

/// Index of a property within its [`ElementDef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
pub struct PropIndex(usize);

impl PropIndex {
    pub fn idx(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Scalar(ScalarType),
    List {
        len_type: ScalarType,
        scalar_type: ScalarType,
    }
}

impl PropertyType {
    /// The type of the values (for lists: of the list entries).
    pub fn scalar_type(&self) -> ScalarType {
        match *self {
            PropertyType::Scalar(ty) => ty,
            PropertyType::List { scalar_type, .. } => scalar_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    /// Returns `true` if and only if the type is either `float` or `double`.
    pub fn is_floating_point(&self) -> bool {
        *self == ScalarType::Float || *self == ScalarType::Double
    }

    /// Returns `true` if and only if the type is one of `uchar`, `ushort` or
    /// `uint`.
    pub fn is_unsigned_integer(&self) -> bool {
        match self {
            ScalarType::UChar | ScalarType::UShort | ScalarType::UInt => true,
            _ => false,
        }
    }

    /// Returns the type name used in the header (e.g. `short`).
    pub fn ply_type_name(&self) -> &'static str {
        match *self {
            ScalarType::Char => "char",
            ScalarType::UChar => "uchar",
            ScalarType::Short => "short",
            ScalarType::UShort => "ushort",
            ScalarType::Int => "int",
            ScalarType::UInt => "uint",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.ply_type_name())
    }
}

/// The error emitted when the `FromStr` implementation for `ScalarType` cannot
/// parse the given string.
pub struct ScalarTypeParseError(String);

impl fmt::Display for ScalarTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\" is not a valid PLY scalar type", self.0)
    }
}

impl fmt::Debug for ScalarTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for ScalarType {
    type Err = ScalarTypeParseError;

    /// Besides the names from the original PLY description, the sized
    /// aliases (`int8`, `uint32`, `float64`, ...) written by some tools are
    /// accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "char" | "int8" => Ok(ScalarType::Char),
            "uchar" | "uint8" => Ok(ScalarType::UChar),
            "short" | "int16" => Ok(ScalarType::Short),
            "ushort" | "uint16" => Ok(ScalarType::UShort),
            "int" | "int32" => Ok(ScalarType::Int),
            "uint" | "uint32" => Ok(ScalarType::UInt),
            "float" | "float32" => Ok(ScalarType::Float),
            "double" | "float64" => Ok(ScalarType::Double),
            other => Err(ScalarTypeParseError(other.to_string())),
        }
    }
}
