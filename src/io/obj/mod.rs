//! Reading OBJ files.
//!
//! Besides the usual `v`, `vn`, `vt`, `vp` and `f` lines, this reader
//! understands typed custom attributes that are stored in structured
//! comments:
//!
//! ```text
//! # attribute weight vertex real
//! # attribute uv vertex vec2
//! # attribute label facet int
//! v 0 0 0
//! # attrs v 1 0.5 0.0 1.0
//! ...
//! f 1 2 3
//! # attrs f 1 7
//! ```
//!
//! Each `# attrs` line carries the values of one element for all attributes
//! declared on that element, in declaration order.
//!
//! All faces of the result have the same arity. Triangles and quads are kept
//! as is (quads are split if the file also contains triangles), polygons with
//! more than four corners are triangulated via ear clipping. Per-corner
//! normals and texture coordinates are available as the float attributes
//! `corner_normal` and `corner_texture` (face-major, corner-minor, `NaN` for
//! corners without value), `vp` lines as `vertex_parameter`.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    iter, mem,
    path::Path,
};

use cgmath::Point3;
use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::{
    algo::triangulate,
    attr::{AttrId, AttrKind, AttrType, AttributeStore, AttributeValues, ElementKind},
};
use super::{Error, MeshData, error};


#[cfg(test)]
mod tests;


/// Default for [`Reader::max_line_len`].
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

pub const CORNER_NORMAL: &str = "corner_normal";
pub const CORNER_TEXTURE: &str = "corner_texture";
pub const VERTEX_PARAMETER: &str = "vertex_parameter";


// ===========================================================================
// ===== Reader
// ===========================================================================

/// A reader for OBJ files.
///
/// A reader is consumed by [`Reader::read`], so every instance parses exactly
/// one file.
#[derive(Debug)]
pub struct Reader<R: Read> {
    reader: R,
    max_line_len: usize,
}

impl Reader<File> {
    /// Tries to open the file specified by the given path and creates a new
    /// `Reader` from that file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> Reader<R> {
    /// Creates a new `Reader` from the given `io::Read` instance. The reader
    /// is buffered internally.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Sets the maximum length of a line in bytes, after joining lines
    /// continued with `\`. Longer lines make [`Reader::read`] fail with
    /// [`Error::LineTooLong`].
    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max;
        self
    }

    /// Reads the whole file.
    pub fn read(self) -> Result<MeshData, Error> {
        let mut lines = Lines::new(BufReader::new(self.reader), self.max_line_len);
        let mut parser = Parser::default();

        while let Some((line_no, line)) = lines.next_line()? {
            parser.parse_line(line_no, &line)?;
        }

        parser.finish()
    }
}


// ===========================================================================
// ===== Line splitting
// ===========================================================================

/// Splits the input into logical lines: a line ending in `\` is joined with
/// the next one.
struct Lines<R: BufRead> {
    reader: R,
    max_len: usize,

    /// Number of physical lines read so far.
    physical: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R, max_len: usize) -> Self {
        Self {
            reader,
            max_len,
            physical: 0,
        }
    }

    /// Returns the next logical line together with the (1-based) number of
    /// the physical line it starts at, or `None` at EOF.
    fn next_line(&mut self) -> Result<Option<(usize, String)>, Error> {
        let mut line = Vec::new();
        if !self.read_physical(&mut line)? {
            return Ok(None);
        }
        let start = self.physical;

        loop {
            let continued = line.last() == Some(&b'\\');
            if continued {
                line.pop();
            }

            if line.len() > self.max_len {
                return Err(Error::LineTooLong { line: start, max: self.max_len });
            }

            if !continued || !self.read_physical(&mut line)? {
                break;
            }
        }

        // OBJ is ASCII, but comments in the wild contain all sorts of
        // encodings. Those never matter for parsing.
        Ok(Some((start, String::from_utf8_lossy(&line).into_owned())))
    }

    /// Appends the next physical line without line terminator to `out`.
    /// Returns `false` at EOF.
    fn read_physical(&mut self, out: &mut Vec<u8>) -> Result<bool, Error> {
        // Reading a bit more than allowed is enough to detect a too long line
        // without buffering arbitrarily long garbage.
        let limit = (self.max_len + 3) as u64;
        let start = out.len();
        let n = self.reader.by_ref().take(limit).read_until(b'\n', out)?;
        if n == 0 {
            return Ok(false);
        }

        self.physical += 1;
        if out.last() == Some(&b'\n') {
            out.pop();
            if out.len() > start && out.last() == Some(&b'\r') {
                out.pop();
            }
        }

        Ok(true)
    }
}


// ===========================================================================
// ===== Parser state
// ===========================================================================

/// Faces with a fixed number of corners, plus one row of texture and normal
/// indices per face (`None` for corners without index). Corner indices are
/// 0-based but unchecked (they might be negative or too large).
#[derive(Debug, Default)]
struct Faces<V, C> {
    vertices: Vec<V>,
    textures: Vec<C>,
    normals: Vec<C>,
}

type Tris = Faces<[u32; 3], [Option<i64>; 3]>;
type Quads = Faces<[u32; 4], [Option<i64>; 4]>;

/// Raw values of `vn`, `vt` and `vp` lines.
type Components = SmallVec<[f64; 3]>;

/// All state of one parse.
#[derive(Debug, Default)]
struct Parser {
    /// Set by the first vertex.
    dim: Option<usize>,
    vertices: Vec<f64>,

    normals: Vec<Components>,
    textures: Vec<Components>,
    parameters: Vec<Components>,

    tris: Tris,
    quads: Quads,
    num_polygons: usize,

    attributes: AttributeStore,
    vertex_attrs: Vec<AttrId>,
    face_attrs: Vec<AttrId>,

    /// Number of `# attrs` lines read per element.
    vertex_attr_rows: usize,
    face_attr_rows: usize,

    // Flags to warn only once per file about things that might occur on
    // every line.
    warned_extra_coords: bool,
    warned_attr_index: bool,
    warned_halfedge: bool,
}

/// The face list after merging triangles and quads.
struct UnifiedFaces {
    faces: Vec<u32>,
    vertex_per_face: usize,
    textures: Vec<Option<i64>>,
    normals: Vec<Option<i64>>,
}

impl Parser {
    fn num_vertices(&self) -> usize {
        match self.dim {
            Some(dim) => self.vertices.len() / dim,
            None => 0,
        }
    }

    fn parse_line(&mut self, line_no: usize, line: &str) -> Result<(), Error> {
        let line = line.trim_start();
        match line.as_bytes().first() {
            Some(b'v') => self.parse_vertex_line(line_no, line),
            Some(b'f') => self.parse_face_line(line_no, line),
            Some(b'#') => self.parse_comment_line(line_no, line),

            // Groups, materials, smoothing groups, ...
            _ => Ok(()),
        }
    }

    // =======================================================================
    // ===== Vertex lines
    // =======================================================================

    fn parse_vertex_line(&mut self, line_no: usize, line: &str) -> Result<(), Error> {
        let mut tokens = line.split_whitespace();
        match tokens.next().unwrap_or_default() {
            "v" => self.parse_coordinates(line_no, tokens)?,
            "vn" => {
                let values = parse_components(line_no, "vn", tokens)?;
                self.normals.push(values);
            }
            "vt" => {
                let values = parse_components(line_no, "vt", tokens)?;
                self.textures.push(values);
            }
            "vp" => {
                let values = parse_components(line_no, "vp", tokens)?;
                self.parameters.push(values);
            }

            // Vertex colors of some exporters
            tag if tag.starts_with("vc") => {}

            tag => {
                return Err(error::obj(line_no, format!("invalid vertex line tag '{}'", tag)));
            }
        }

        Ok(())
    }

    fn parse_coordinates<'a>(
        &mut self,
        line_no: usize,
        tokens: impl Iterator<Item = &'a str>,
    ) -> Result<(), Error> {
        let mut values = parse_floats::<[f64; 4]>(line_no, tokens)?;

        if values.len() > 4 {
            // Usually `x y z r g b`
            if !self.warned_extra_coords {
                warn!(
                    "vertex in line {} has {} values, ignoring all but the first three \
                        (further warnings suppressed)",
                    line_no,
                    values.len(),
                );
                self.warned_extra_coords = true;
            }
            values.truncate(3);
        } else if values.len() == 4 {
            // Homogeneous coordinates
            let w = values[3];
            values.truncate(3);
            values.iter_mut().for_each(|v| *v /= w);
        }

        if values.len() < 2 {
            return Err(error::obj(line_no, format!(
                "vertex needs at least 2 coordinates, found {}",
                values.len(),
            )));
        }

        match self.dim {
            None => self.dim = Some(values.len()),
            Some(dim) if dim != values.len() => {
                return Err(error::obj(line_no, format!(
                    "vertex has {} coordinates, but previous vertices have {}",
                    values.len(),
                    dim,
                )));
            }
            Some(_) => {}
        }

        self.vertices.extend_from_slice(&values);
        Ok(())
    }

    // =======================================================================
    // ===== Face lines
    // =======================================================================

    fn parse_face_line(&mut self, line_no: usize, line: &str) -> Result<(), Error> {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("f") {
            return Ok(());
        }

        let mut vertices = SmallVec::<[u32; 8]>::new();
        let mut textures = SmallVec::<[Option<i64>; 8]>::new();
        let mut normals = SmallVec::<[Option<i64>; 8]>::new();

        // Each corner is `v`, `v/vt`, `v/vt/vn` or `v//vn`
        for token in tokens {
            let mut parts = token.split('/');
            let v = parts.next().unwrap_or_default();
            let vt = parts.next();
            let vn = parts.next();
            if parts.next().is_some() {
                return Err(error::obj(line_no, format!("invalid face corner '{}'", token)));
            }

            vertices.push(self.resolve_vertex_index(line_no, v)?);
            textures.push(resolve_corner_index(line_no, vt, self.textures.len())?);
            normals.push(resolve_corner_index(line_no, vn, self.normals.len())?);
        }

        match *vertices {
            [a, b, c] => {
                self.tris.vertices.push([a, b, c]);
                self.tris.textures.push([textures[0], textures[1], textures[2]]);
                self.tris.normals.push([normals[0], normals[1], normals[2]]);
            }
            [a, b, c, d] => {
                let (t, n) = (&textures, &normals);
                self.quads.vertices.push([a, b, c, d]);
                self.quads.textures.push([t[0], t[1], t[2], t[3]]);
                self.quads.normals.push([n[0], n[1], n[2], n[3]]);
            }
            _ if vertices.len() < 3 => {
                return Err(error::obj(line_no, format!(
                    "face with {} corners, at least 3 are required",
                    vertices.len(),
                )));
            }
            _ => {
                let triangles = self.triangulate(line_no, &vertices)?;
                for &[a, b, c] in &triangles {
                    self.tris.vertices.push([vertices[a], vertices[b], vertices[c]]);
                    self.tris.textures.push([textures[a], textures[b], textures[c]]);
                    self.tris.normals.push([normals[a], normals[b], normals[c]]);
                }
            }
        }

        Ok(())
    }

    /// Parses a 1-based, possibly relative, vertex index and returns it
    /// 0-based.
    fn resolve_vertex_index(&self, line_no: usize, s: &str) -> Result<u32, Error> {
        let raw = parse_index(line_no, s)?;
        let resolved = resolve_relative(raw, self.num_vertices());
        if raw == 0 || resolved < 1 || resolved - 1 > i64::from(u32::max_value()) {
            return Err(error::obj(line_no, format!("invalid vertex index '{}'", s)));
        }

        Ok((resolved - 1) as u32)
    }

    /// Splits the polygon with the given (0-based) vertex indices into
    /// triangles. Returns triangles as indices into `vertices`.
    fn triangulate(&mut self, line_no: usize, vertices: &[u32]) -> Result<Vec<[usize; 3]>, Error> {
        let num_vertices = self.num_vertices();
        let dim = self.dim.unwrap_or(3);

        let points = vertices.iter()
            .map(|&v| {
                let v = v as usize;
                if v >= num_vertices {
                    return Err(Error::IndexOutOfBounds {
                        element: ElementKind::Face,
                        index: v as i64,
                        len: num_vertices,
                    });
                }

                let c = &self.vertices[v * dim..(v + 1) * dim];
                let z = if dim == 3 { c[2] } else { 0.0 };
                Ok(Point3::new(c[0], c[1], z))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("{}-gon in line {}, converting to triangles", vertices.len(), line_no);
        self.num_polygons += 1;

        Ok(triangulate::ear_clip(&points))
    }

    // =======================================================================
    // ===== Comment lines and attributes
    // =======================================================================

    fn parse_comment_line(&mut self, line_no: usize, line: &str) -> Result<(), Error> {
        let mut tokens = line[1..].split_whitespace();
        match tokens.next() {
            Some("attribute") => {
                match (tokens.next(), tokens.next(), tokens.next()) {
                    (Some(name), Some(localization), Some(ty)) => {
                        self.declare_attribute(line_no, name, localization, ty)
                    }
                    _ => Ok(()),
                }
            }
            Some("attrs") => {
                let localization = tokens.next();
                let index = tokens.next().and_then(|s| s.parse::<usize>().ok());
                match (localization, index) {
                    (Some(localization), Some(index)) => {
                        self.parse_attribute_values(line_no, localization, index, tokens)
                    }
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn declare_attribute(
        &mut self,
        line_no: usize,
        name: &str,
        localization: &str,
        ty: &str,
    ) -> Result<(), Error> {
        let element = match localization {
            "vertex" => ElementKind::Vertex,
            "facet" => ElementKind::Face,
            other => {
                warn!(
                    "unsupported attribute localization '{}' in line {}, ignoring attribute '{}'",
                    other,
                    line_no,
                    name,
                );
                return Ok(());
            }
        };

        let ty = AttrType::from_keyword(ty).ok_or_else(|| Error::UnknownAttributeType {
            line: line_no,
            ty: ty.to_string(),
        })?;

        let id = self.attributes.declare(element.clone(), name, ty.kind(), ty.arity())?;
        info!(
            "found {} attribute '{}' on element '{}' with arity {}",
            ty.kind(),
            name,
            element,
            ty.arity(),
        );

        match element {
            ElementKind::Vertex => self.vertex_attrs.push(id),
            _ => self.face_attrs.push(id),
        }

        Ok(())
    }

    fn parse_attribute_values<'a>(
        &mut self,
        line_no: usize,
        localization: &str,
        index: usize,
        tokens: impl Iterator<Item = &'a str>,
    ) -> Result<(), Error> {
        let (element, ids, rows) = match localization {
            "v" => (ElementKind::Vertex, self.vertex_attrs.clone(), self.vertex_attr_rows),
            "f" => (ElementKind::Face, self.face_attrs.clone(), self.face_attr_rows),
            "h" => {
                if !self.warned_halfedge {
                    warn!("half-edge attributes are not supported, ignoring their values");
                    self.warned_halfedge = true;
                }
                return Ok(());
            }
            other => {
                return Err(error::obj(line_no, format!(
                    "invalid attribute localization '{}' (expected 'v', 'f' or 'h')",
                    other,
                )));
            }
        };

        let values = tokens.collect::<SmallVec<[&str; 16]>>();
        let expected = ids.iter().map(|&id| self.attributes.def(id).arity).sum::<usize>();
        if values.len() != expected {
            return Err(Error::AttributeValueCount {
                line: line_no,
                element,
                expected,
                found: values.len(),
            });
        }

        // Element indices are 1-based like everything else in OBJ.
        if index != rows + 1 && !self.warned_attr_index {
            warn!(
                "attribute values in line {} are for {} {}, but are stored as {} {} \
                    (values are assigned in file order, further warnings suppressed)",
                line_no,
                element,
                index,
                element,
                rows + 1,
            );
            self.warned_attr_index = true;
        }

        let mut values = values.into_iter();
        for id in ids {
            let def = self.attributes.def(id);
            let (kind, arity) = (def.kind, def.arity);

            for s in values.by_ref().take(arity) {
                match kind {
                    AttrKind::Float => {
                        let v = s.parse::<f64>()
                            .map_err(|_| self.invalid_value(line_no, id, s))?;
                        self.attributes.push_float(id, v);
                    }
                    AttrKind::Int => {
                        let v = s.parse::<i32>()
                            .map_err(|_| self.invalid_value(line_no, id, s))?;
                        self.attributes.push_int(id, v);
                    }
                }
            }
        }

        match element {
            ElementKind::Vertex => self.vertex_attr_rows += 1,
            _ => self.face_attr_rows += 1,
        }

        Ok(())
    }

    fn invalid_value(&self, line_no: usize, id: AttrId, s: &str) -> Error {
        let def = self.attributes.def(id);
        error::obj(line_no, format!(
            "invalid {} value '{}' for attribute '{}'",
            def.kind,
            s,
            def.name,
        ))
    }

    // =======================================================================
    // ===== Post processing
    // =======================================================================

    fn finish(mut self) -> Result<MeshData, Error> {
        let dim = self.dim.unwrap_or(3);
        let num_vertices = self.num_vertices();
        let unified = self.unify_faces();
        let vertex_per_face = unified.vertex_per_face;
        let num_faces = unified.faces.len() / vertex_per_face;

        if let Some(&v) = unified.faces.iter().find(|&&v| v as usize >= num_vertices) {
            return Err(Error::IndexOutOfBounds {
                element: ElementKind::Face,
                index: v.into(),
                len: num_vertices,
            });
        }

        if self.num_polygons > 0 {
            info!(
                "converted {} polygons with more than 4 corners to triangles",
                self.num_polygons,
            );
        }

        // Check custom attributes before adding our own.
        for (id, def) in self.attributes.iter() {
            let count = match def.element {
                ElementKind::Vertex => num_vertices,
                _ => num_faces,
            };
            let len = self.attributes.values(id).len();
            if len != count * def.arity {
                warn!(
                    "attribute '{}' has {} values, but {} {}s with arity {} need {}",
                    def.name,
                    len,
                    count,
                    def.element,
                    def.arity,
                    count * def.arity,
                );
            }
        }

        let corner_attrs = [
            (CORNER_NORMAL, &self.normals, &unified.normals),
            (CORNER_TEXTURE, &self.textures, &unified.textures),
        ];
        for &(name, raw, rows) in &corner_attrs {
            if let Some((arity, values)) = densify_corners(name, raw, rows, vertex_per_face, num_faces) {
                self.attributes.insert(name, ElementKind::Corner, arity, AttributeValues::Float(values))?;
            }
        }

        if let Some((arity, values)) = check_parameters(&self.parameters, num_vertices) {
            self.attributes.insert(
                VERTEX_PARAMETER,
                ElementKind::Vertex,
                arity,
                AttributeValues::Float(values),
            )?;
        }

        Ok(MeshData {
            dim,
            vertices: self.vertices,
            faces: unified.faces,
            vertex_per_face,
            voxels: vec![],
            vertex_per_voxel: 0,
            attributes: self.attributes,
        })
    }

    /// Merges triangles and quads into one face list. If both exist, quads
    /// are split into two triangles each and appended after all triangles.
    fn unify_faces(&mut self) -> UnifiedFaces {
        fn flatten<T: Copy>(arrays: &[impl AsRef<[T]>]) -> Vec<T> {
            arrays.iter().flat_map(|a| a.as_ref().iter().copied()).collect()
        }

        fn split_quads<T: Copy>(out: &mut Vec<T>, quads: &[[T; 4]]) {
            for q in quads {
                out.extend_from_slice(&[q[0], q[1], q[2], q[0], q[2], q[3]]);
            }
        }

        let tris = mem::take(&mut self.tris);
        let quads = mem::take(&mut self.quads);

        match (tris.vertices.is_empty(), quads.vertices.is_empty()) {
            (true, true) => UnifiedFaces {
                faces: vec![],
                vertex_per_face: 3,
                textures: vec![],
                normals: vec![],
            },
            (false, true) => UnifiedFaces {
                faces: flatten(&tris.vertices),
                vertex_per_face: 3,
                textures: flatten(&tris.textures),
                normals: flatten(&tris.normals),
            },
            (true, false) => UnifiedFaces {
                faces: flatten(&quads.vertices),
                vertex_per_face: 4,
                textures: flatten(&quads.textures),
                normals: flatten(&quads.normals),
            },
            (false, false) => {
                warn!(
                    "mixed triangles ({}) and quads ({}), splitting quads into triangles \
                        (face order is not preserved)",
                    tris.vertices.len(),
                    quads.vertices.len(),
                );

                let mut out = UnifiedFaces {
                    faces: flatten(&tris.vertices),
                    vertex_per_face: 3,
                    textures: flatten(&tris.textures),
                    normals: flatten(&tris.normals),
                };
                split_quads(&mut out.faces, &quads.vertices);
                split_quads(&mut out.textures, &quads.textures);
                split_quads(&mut out.normals, &quads.normals);
                out
            }
        }
    }
}


// ===========================================================================
// ===== Helper functions
// ===========================================================================

fn parse_floats<'a, A>(
    line_no: usize,
    tokens: impl Iterator<Item = &'a str>,
) -> Result<SmallVec<A>, Error>
where
    A: smallvec::Array<Item = f64>,
{
    tokens
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| error::obj(line_no, format!("invalid number '{}'", s)))
        })
        .collect()
}

/// Parses the 1 to 3 numbers of a `vn`, `vt` or `vp` line.
fn parse_components<'a>(
    line_no: usize,
    tag: &str,
    tokens: impl Iterator<Item = &'a str>,
) -> Result<Components, Error> {
    let values = parse_floats::<[f64; 3]>(line_no, tokens)?;
    if values.is_empty() || values.len() > 3 {
        return Err(error::obj(line_no, format!(
            "'{}' line needs 1 to 3 values, found {}",
            tag,
            values.len(),
        )));
    }

    Ok(values)
}

fn parse_index(line_no: usize, s: &str) -> Result<i64, Error> {
    s.parse::<i64>().map_err(|_| error::obj(line_no, format!("invalid index '{}'", s)))
}

/// Turns a negative (relative) 1-based index into an absolute one. `-1` is
/// the last of the `count` values read so far.
fn resolve_relative(raw: i64, count: usize) -> i64 {
    if raw < 0 {
        count as i64 + raw + 1
    } else {
        raw
    }
}

/// Resolves an optional texture or normal index to 0-based. Range checks are
/// done later, an invalid index only invalidates the corner attribute.
fn resolve_corner_index(line_no: usize, s: Option<&str>, count: usize) -> Result<Option<i64>, Error> {
    match s {
        None | Some("") => Ok(None),
        Some(s) => {
            let raw = parse_index(line_no, s)?;
            Ok(Some(resolve_relative(raw, count) - 1))
        }
    }
}

/// Turns per-corner indices into per-corner values. Returns the arity and
/// the values, or `None` (with a warning) if the data is inconsistent.
fn densify_corners(
    name: &str,
    raw: &[Components],
    rows: &[Option<i64>],
    vertex_per_face: usize,
    num_faces: usize,
) -> Option<(usize, Vec<f64>)> {
    // Not referenced by any face
    if raw.is_empty() || rows.iter().all(Option::is_none) {
        return None;
    }

    if rows.len() != num_faces * vertex_per_face {
        warn!(
            "{} {} indices for {} faces with {} corners, ignoring '{}'",
            rows.len(),
            name,
            num_faces,
            vertex_per_face,
            name,
        );
        return None;
    }

    let arity = raw[0].len();
    if raw.iter().any(|v| v.len() != arity) {
        warn!("values for '{}' have inconsistent arity, ignoring them", name);
        return None;
    }

    if let Some(idx) = rows.iter().flatten().find(|&&i| i < 0 || i as usize >= raw.len()) {
        warn!(
            "index {} for '{}' out of bounds (there are {} values), ignoring '{}'",
            idx + 1,
            name,
            raw.len(),
            name,
        );
        return None;
    }

    let mut values = Vec::with_capacity(rows.len() * arity);
    for idx in rows {
        match *idx {
            Some(i) => values.extend_from_slice(&raw[i as usize]),
            None => values.extend(iter::repeat(std::f64::NAN).take(arity)),
        }
    }

    Some((arity, values))
}

/// Checks that there is one parameter of consistent arity per vertex.
fn check_parameters(params: &[Components], num_vertices: usize) -> Option<(usize, Vec<f64>)> {
    let arity = params.first()?.len();

    if params.len() != num_vertices {
        warn!(
            "{} vertex parameters, but {} vertices, ignoring '{}'",
            params.len(),
            num_vertices,
            VERTEX_PARAMETER,
        );
        return None;
    }

    if params.iter().any(|p| p.len() != arity) {
        warn!("inconsistent vertex parameter arity, ignoring '{}'", VERTEX_PARAMETER);
        return None;
    }

    Some((arity, params.iter().flat_map(|p| p.iter().copied()).collect()))
}
