//! Reading and writing polygonal and polyhedral meshes.
//!
//! Two file formats are supported: an extended OBJ dialect (with typed custom
//! attributes declared in structured comments) and PLY (ASCII and binary).
//! Both readers produce the same uniform representation, [`io::MeshData`]:
//! flat vertex coordinates, faces and voxels of uniform arity, plus named
//! per-element attributes of float or integer type.
//!
//! ```no_run
//! use polyio::io::{self, MeshSource, MeshWriter, ply};
//!
//! # fn main() -> Result<(), polyio::io::Error> {
//! let mesh = io::read_file("bunny.obj")?;
//! println!("{} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
//!
//! ply::Config::binary()
//!     .with_attribute("corner_normal")
//!     .into_writer(&mesh)
//!     .write_to_file("bunny.ply")?;
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod algo;
pub mod attr;
pub mod io;


pub use self::{
    attr::{AttrKind, AttrType, AttributeValues, ElementKind},
    io::{MeshData, MeshSink, MeshSource},
};
