//! The error type of all reading and writing operations, plus small helpers
//! to construct the variants that are created in several places.

use std::io;

use failure::Fail;

use crate::attr::ElementKind;
use super::parse;


/// Everything that can go wrong while reading or writing a mesh file.
///
/// Only fatal conditions are represented here. Problems a reader can recover
/// from (e.g. an inconsistent corner normal list) are reported via `log`
/// warnings and the affected data is dropped.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "IO error: {}", _0)]
    Io(#[cause] io::Error),

    /// Syntax error in a PLY file.
    #[fail(display = "invalid PLY file: {}", _0)]
    Parse(#[cause] parse::Error),

    /// Syntax or schema error in an OBJ file. `line` is the 1-based number of
    /// the physical line the logical line started at.
    #[fail(display = "invalid OBJ file (line {}): {}", line, msg)]
    Obj {
        line: usize,
        msg: String,
    },

    #[fail(
        display = "line {} is longer than the maximum of {} bytes (after joining continued lines)",
        line,
        max,
    )]
    LineTooLong {
        line: usize,
        max: usize,
    },

    #[fail(
        display = "duplicate property name '{}' on element '{}' (property names have to be unique)",
        prop,
        element,
    )]
    DuplicateAttribute {
        element: ElementKind,
        prop: String,
    },

    #[fail(display = "unsupported attribute type '{}' (line {})", ty, line)]
    UnknownAttributeType {
        line: usize,
        ty: String,
    },

    #[fail(
        display = "attribute values line {} has {} values, but the declared '{}' attributes \
            require exactly {}",
        line,
        found,
        element,
        expected,
    )]
    AttributeValueCount {
        line: usize,
        element: ElementKind,
        expected: usize,
        found: usize,
    },

    #[fail(display = "attribute '{}' does not exist", _0)]
    AttributeNotFound(String),

    #[fail(
        display = "attribute '{}' has {} values which is not a multiple of the number of \
            vertices ({}), faces ({}) or voxels ({})",
        name,
        len,
        num_vertices,
        num_faces,
        num_voxels,
    )]
    UnclassifiableAttribute {
        name: String,
        len: usize,
        num_vertices: usize,
        num_faces: usize,
        num_voxels: usize,
    },

    #[fail(display = "NaN or Inf detected in vertex coordinates")]
    NonFiniteVertex,

    #[fail(
        display = "{} vertex indices cannot be split evenly into {} {} elements",
        total,
        count,
        element,
    )]
    InconsistentArity {
        element: ElementKind,
        total: usize,
        count: usize,
    },

    #[fail(display = "{} references vertex {}, but there are only {} vertices", element, index, len)]
    IndexOutOfBounds {
        element: ElementKind,
        index: i64,
        len: usize,
    },

    #[fail(display = "value {} of '{}' does not fit into the PLY type '{}'", value, name, ty)]
    ValueOutOfRange {
        name: String,
        value: f64,
        ty: &'static str,
    },

    #[fail(display = "could not determine the mesh file format of '{}'", _0)]
    UnknownFormat(String),
}

impl From<io::Error> for Error {
    fn from(src: io::Error) -> Self {
        Error::Io(src)
    }
}

impl From<parse::Error> for Error {
    fn from(src: parse::Error) -> Self {
        match src {
            parse::Error::Io(e) => Error::Io(e),
            other => Error::Parse(other),
        }
    }
}


pub(crate) fn duplicate_attribute(element: &ElementKind, prop: &str) -> Error {
    Error::DuplicateAttribute {
        element: element.clone(),
        prop: prop.to_string(),
    }
}

pub(crate) fn obj(line: usize, msg: impl Into<String>) -> Error {
    Error::Obj {
        line,
        msg: msg.into(),
    }
}

pub(crate) fn value_out_of_range(name: &str, value: f64, ty: &'static str) -> Error {
    Error::ValueOutOfRange {
        name: name.to_string(),
        value,
        ty,
    }
}
