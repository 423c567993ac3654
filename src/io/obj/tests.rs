use std::io::Cursor;

use crate::{
    attr::{AttributeValues, ElementKind},
    io::{Error, MeshData, MeshSource},
};
use super::{Reader, CORNER_NORMAL, CORNER_TEXTURE, VERTEX_PARAMETER};


fn read_str(s: &str) -> Result<MeshData, Error> {
    Reader::new(Cursor::new(s.as_bytes())).read()
}

fn floats<'a>(mesh: &'a MeshData, name: &str) -> &'a [f64] {
    mesh.attribute(name)
        .and_then(|v| v.as_float())
        .unwrap_or_else(|| panic!("no float attribute '{}'", name))
}

macro_rules! assert_obj_err {
    ($input:expr, $pat:pat) => {{
        let res = read_str($input);
        assert!(matches!(res, Err($pat)), "unexpected result: {:?}", res);
    }}
}


// ===========================================================================
// ===== Geometry
// ===========================================================================

#[test]
fn single_triangle() -> Result<(), Error> {
    let mesh = read_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")?;

    assert_eq!(mesh.dim(), 3);
    assert_eq!(mesh.vertex_per_face(), 3);
    assert_eq!(mesh.vertices(), &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    assert_eq!(mesh.faces(), &[0, 1, 2]);
    assert_eq!(mesh.num_voxels(), 0);
    assert!(mesh.attributes().is_empty());

    Ok(())
}

#[test]
fn homogeneous_coordinates() -> Result<(), Error> {
    let mesh = read_str("v 1 2 3 2\n")?;
    assert_eq!(mesh.dim(), 3);
    assert_approx_eq!(mesh.vertices(), [0.5, 1.0, 1.5]);

    Ok(())
}

#[test]
fn relative_indices() -> Result<(), Error> {
    let mesh = read_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -1 -2 -3\n")?;
    assert_eq!(mesh.faces(), &[2, 1, 0]);

    Ok(())
}

#[test]
fn two_dimensional() -> Result<(), Error> {
    let mesh = read_str("v 0 0\nv 1 0\nv 1 1\nv 0 1\n\tf 1 2 3 4\n")?;
    assert_eq!(mesh.dim(), 2);
    assert_eq!(mesh.num_vertices(), 4);
    assert_eq!(mesh.vertex_per_face(), 4);
    assert_eq!(mesh.faces(), &[0, 1, 2, 3]);

    Ok(())
}

#[test]
fn dimension_mismatch() {
    assert_obj_err!("v 0 0 0\nv 1 0\n", Error::Obj { line: 2, .. });
}

#[test]
fn too_few_coordinates() {
    assert_obj_err!("v 1\n", Error::Obj { line: 1, .. });
}

#[test]
fn extra_vertex_values_are_ignored() -> Result<(), Error> {
    crate::test_utils::init_logger();

    // Vertex colors appended to the position
    let mesh = read_str("v 1 2 3 0.5 0.5 0.5\nv 4 5 6 1 1 1\n")?;
    assert_eq!(mesh.dim(), 3);
    assert_eq!(mesh.vertices(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    Ok(())
}

#[test]
fn quads_only() -> Result<(), Error> {
    crate::test_utils::init_logger();
    let mesh = Reader::new(include_test_file!("cube_quads.obj")).read()?;

    assert_eq!(mesh.num_vertices(), 8);
    assert_eq!(mesh.vertex_per_face(), 4);
    assert_eq!(mesh.num_faces(), 6);
    assert_eq!(&mesh.faces()[..8], &[0, 3, 2, 1, 4, 5, 6, 7]);

    // Only two of six faces have normals, the others are filled with NaN
    let normals = floats(&mesh, CORNER_NORMAL);
    assert_eq!(normals.len(), 6 * 4 * 3);
    assert_eq!(&normals[..3], &[0.0, 0.0, -1.0]);
    assert_eq!(&normals[21..24], &[0.0, 0.0, 1.0]);
    assert!(normals[24..].iter().all(|v| v.is_nan()));

    Ok(())
}

#[test]
fn mixed_triangles_and_quads() -> Result<(), Error> {
    crate::test_utils::init_logger();
    let mesh = Reader::new(include_test_file!("mixed.obj")).read()?;

    // Triangles first, then the split quads
    assert_eq!(mesh.vertex_per_face(), 3);
    assert_eq!(mesh.faces(), &[1, 4, 2, 0, 1, 3, 0, 3, 2]);

    Ok(())
}

#[test]
fn polygon_is_triangulated() -> Result<(), Error> {
    crate::test_utils::init_logger();
    let mesh = Reader::new(include_test_file!("pentagon.obj")).read()?;

    assert_eq!(mesh.vertex_per_face(), 3);
    assert_eq!(mesh.faces(), &[1, 2, 3, 0, 1, 3, 4, 0, 3]);

    // Texture coordinates follow their corners
    assert_eq!(mesh.attribute_size(CORNER_TEXTURE), Some(18));
    assert_approx_eq!(floats(&mesh, CORNER_TEXTURE), [
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 1.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    Ok(())
}

#[test]
fn polygon_with_missing_vertex() {
    assert_obj_err!(
        "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4 9\n",
        Error::IndexOutOfBounds { index: 8, len: 4, .. }
    );
}

#[test]
fn continued_lines() -> Result<(), Error> {
    let mesh = read_str("v 0 0 0\nv 1 \\\n0 0\nv 0 1 0\r\nf 1 2 \\\n 3\n# 5 is bad\nv 9 9\n");

    // The second vertex is fine, the last one is reported with its own line
    assert!(matches!(mesh, Err(Error::Obj { line: 8, .. })), "{:?}", mesh);

    let mesh = read_str("v 0 0 0\nv 1 \\\n0 0\nv 0 1 0\r\nf 1 2 \\\n 3\n")?;
    assert_eq!(mesh.num_vertices(), 3);
    assert_eq!(mesh.faces(), &[0, 1, 2]);

    Ok(())
}

#[test]
fn line_too_long() -> Result<(), Error> {
    let long = format!("v 0 0 0\n# {}\n", "x".repeat(100));
    let res = Reader::new(Cursor::new(long.as_bytes())).max_line_len(50).read();
    assert!(matches!(res, Err(Error::LineTooLong { line: 2, max: 50 })), "{:?}", res);

    // Joined lines count as one
    let joined = format!("# {}\\\n{}\n", "x".repeat(30), "y".repeat(30));
    let res = Reader::new(Cursor::new(joined.as_bytes())).max_line_len(50).read();
    assert!(matches!(res, Err(Error::LineTooLong { line: 1, max: 50 })), "{:?}", res);

    // The backslash itself doesn't count
    let exact = format!("# {}\\\n\nv 1 2 3\n", "x".repeat(48));
    let mesh = Reader::new(Cursor::new(exact.as_bytes())).max_line_len(50).read()?;
    assert_eq!(mesh.vertices(), &[1.0, 2.0, 3.0]);

    Ok(())
}

#[test]
fn empty_file() -> Result<(), Error> {
    let mesh = read_str("")?;
    assert_eq!(mesh.dim(), 3);
    assert_eq!(mesh.vertex_per_face(), 3);
    assert_eq!(mesh.num_vertices(), 0);
    assert_eq!(mesh.num_faces(), 0);

    let mesh = read_str("# nothing\n\no object\nusemtl foo\n")?;
    assert_eq!(mesh.num_vertices(), 0);

    Ok(())
}


// ===========================================================================
// ===== Errors in faces and vertex lines
// ===========================================================================

#[test]
fn face_index_errors() {
    let verts = "v 0 0 0\nv 1 0 0\nv 0 1 0\n";
    assert_obj_err!(&format!("{}f 1 2 4\n", verts), Error::IndexOutOfBounds { index: 3, len: 3, .. });
    assert_obj_err!(&format!("{}f 0 1 2\n", verts), Error::Obj { line: 4, .. });
    assert_obj_err!(&format!("{}f -4 1 2\n", verts), Error::Obj { line: 4, .. });
    assert_obj_err!(&format!("{}f a 1 2\n", verts), Error::Obj { line: 4, .. });
    assert_obj_err!(&format!("{}f 1/x 2 3\n", verts), Error::Obj { line: 4, .. });
    assert_obj_err!(&format!("{}f 1/1/1/1 2 3\n", verts), Error::Obj { line: 4, .. });
    assert_obj_err!(&format!("{}f 1 2\n", verts), Error::Obj { line: 4, .. });
}

#[test]
fn vertex_line_tags() -> Result<(), Error> {
    assert_obj_err!("vx 1 2 3\n", Error::Obj { line: 1, .. });
    assert_obj_err!("vn 1 2 3 4\n", Error::Obj { line: 1, .. });
    assert_obj_err!("vt\n", Error::Obj { line: 1, .. });
    assert_obj_err!("v 1 2 abc\n", Error::Obj { line: 1, .. });

    let mesh = read_str("vc 1 0 0\nv 1 2 3\nfo 1 2 3\n")?;
    assert_eq!(mesh.num_vertices(), 1);

    Ok(())
}


// ===========================================================================
// ===== Corner and vertex attributes
// ===========================================================================

#[test]
fn corner_normals() -> Result<(), Error> {
    let mesh = Reader::new(include_test_file!("corner_normals.obj")).read()?;

    let nan = std::f64::NAN;
    assert_eq!(mesh.attribute_size(CORNER_NORMAL), Some(18));
    assert_approx_eq!(floats(&mesh, CORNER_NORMAL), [
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0, nan, nan, nan,
        0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    ]);
    assert_eq!(mesh.float_attribute_names(), vec![CORNER_NORMAL]);

    Ok(())
}

#[test]
fn faces_without_texture_indices() -> Result<(), Error> {
    let mesh = read_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nvt 0 0\nvt 1 0\nvt 0 1\n\
        f 1/1 2/2 3/3\nf 2 4 3\n")?;

    let nan = std::f64::NAN;
    assert_eq!(mesh.num_faces(), 2);
    assert_eq!(mesh.attribute_size(CORNER_TEXTURE), Some(12));
    assert_approx_eq!(floats(&mesh, CORNER_TEXTURE), [
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
        nan, nan, nan, nan, nan, nan,
    ]);

    // Texture coordinates no face refers to
    let mesh = read_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1 2 3\n")?;
    assert!(mesh.attribute(CORNER_TEXTURE).is_none());

    Ok(())
}

#[test]
fn invalid_normal_index_drops_attribute() -> Result<(), Error> {
    crate::test_utils::init_logger();

    let mesh = read_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//2 2//1 3//1\n")?;
    assert_eq!(mesh.faces(), &[0, 1, 2]);
    assert!(mesh.attribute(CORNER_NORMAL).is_none());

    Ok(())
}

#[test]
fn vertex_parameters() -> Result<(), Error> {
    crate::test_utils::init_logger();

    let mesh = read_str("v 0 0 0\nvp 0.5 1\nv 1 0 0\nvp 0.25 2\n")?;
    let param = mesh.attributes().id(VERTEX_PARAMETER).map(|id| mesh.attributes().def(id));
    assert_eq!(param.map(|def| (&def.element, def.arity)), Some((&ElementKind::Vertex, 2)));
    assert_approx_eq!(floats(&mesh, VERTEX_PARAMETER), [0.5, 1.0, 0.25, 2.0]);

    // One parameter too few
    let mesh = read_str("v 0 0 0\nvp 0.5\nv 1 0 0\n")?;
    assert!(mesh.attribute(VERTEX_PARAMETER).is_none());

    // Inconsistent arity
    let mesh = read_str("v 0 0 0\nvp 0.5\nv 1 0 0\nvp 0.5 0.5\n")?;
    assert!(mesh.attribute(VERTEX_PARAMETER).is_none());

    Ok(())
}


// ===========================================================================
// ===== Custom attributes in comments
// ===========================================================================

#[test]
fn custom_attributes() -> Result<(), Error> {
    crate::test_utils::init_logger();
    let mesh = Reader::new(include_test_file!("attributes.obj")).read()?;

    assert_eq!(mesh.num_vertices(), 3);
    assert_eq!(mesh.float_attribute_names(), vec!["vertex_weight", "vertex_uv"]);
    assert_eq!(mesh.int_attribute_names(), vec!["face_label"]);

    assert_approx_eq!(floats(&mesh, "vertex_weight"), [0.5, 0.25, 1.0]);
    assert_approx_eq!(floats(&mesh, "vertex_uv"), [0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    assert_eq!(mesh.attribute("face_label"), Some(&AttributeValues::Int(vec![7])));

    Ok(())
}

#[test]
fn duplicate_attribute() {
    assert_obj_err!(
        "# attribute w vertex real\n# attribute w vertex int\n",
        Error::DuplicateAttribute { element: ElementKind::Vertex, .. }
    );
}

#[test]
fn unknown_attribute_type() {
    assert_obj_err!("# attribute w vertex mat3\n", Error::UnknownAttributeType { line: 1, .. });
}

#[test]
fn attribute_value_errors() {
    let decl = "# attribute w vertex real\n# attribute l vertex int\nv 0 0 0\n";

    assert_obj_err!(
        &format!("{}# attrs v 1 0.5\n", decl),
        Error::AttributeValueCount { line: 4, expected: 2, found: 1, .. }
    );
    assert_obj_err!(&format!("{}# attrs v 1 0.5 2.5\n", decl), Error::Obj { line: 4, .. });
    assert_obj_err!(&format!("{}# attrs x 1 0.5 2\n", decl), Error::Obj { line: 4, .. });
}

#[test]
fn attribute_lookalike_comments() -> Result<(), Error> {
    // Not a valid element index, so just a comment
    let mesh = read_str("# attribute w vertex real\n# attrs are great\n# attribute\n")?;
    assert_eq!(mesh.attribute("vertex_w"), Some(&AttributeValues::Float(vec![])));

    Ok(())
}
