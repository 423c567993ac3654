//! Geometry algorithms used while reading meshes.

pub mod triangulate;
