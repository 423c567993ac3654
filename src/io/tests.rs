use crate::attr::{AttrKind, AttributeValues, ElementKind};
use super::{
    Error, FileFormat, IsFormat, MeshData, MeshSink, MeshSource,
};

#[test]
fn from_extension() {
    macro_rules! check_for_format {
        ($lower:literal $upper:literal $mixed:literal => $variant:ident) => {{
            let exp = Some(FileFormat::$variant);
            assert_eq!(FileFormat::from_extension(concat!("foo.", $lower)), exp);
            assert_eq!(FileFormat::from_extension(concat!("foo.", $upper)), exp);
            assert_eq!(FileFormat::from_extension(concat!("foo.", $mixed)), exp);
            assert_eq!(FileFormat::from_extension(concat!("föö.", $lower)), exp);
            assert_eq!(FileFormat::from_extension(concat!("/bar/foo.", $lower)), exp);
        }}
    }

    check_for_format!("ply" "PLY" "pLy" => Ply);
    check_for_format!("obj" "OBJ" "oBj" => Obj);
}

#[test]
fn from_extension_none() {
    assert_eq!(FileFormat::from_extension("foo/bar/"), None);
    assert_eq!(FileFormat::from_extension("foo/bar"), None);
    assert_eq!(FileFormat::from_extension("foo/bar."), None);
    assert_eq!(FileFormat::from_extension("foo/.bar"), None);
    assert_eq!(FileFormat::from_extension("foo/bar.stl"), None);
}

#[test]
fn extension() {
    assert_eq!(FileFormat::Ply.extension(), "ply");
    assert_eq!(FileFormat::Obj.extension(), "obj");
}

#[test]
fn from_file_start() {
    assert_eq!(FileFormat::Ply.is_file_start(b"ply\nformat ascii 1.0\n"), IsFormat::Probably);
    assert_eq!(FileFormat::Ply.is_file_start(b"pl"), IsFormat::Maybe);
    assert_eq!(FileFormat::Ply.is_file_start(b"v 1 2 3\n"), IsFormat::No);

    assert_eq!(FileFormat::from_file_start(b"ply\r\nformat"), Some(FileFormat::Ply));
    assert_eq!(FileFormat::from_file_start(b"# exported\nv 1 2 3\n"), Some(FileFormat::Obj));
    assert_eq!(FileFormat::from_file_start(b"\n\n  v 1 2 3\n"), Some(FileFormat::Obj));
    assert_eq!(FileFormat::from_file_start(b"solid cube\n"), None);
    assert_eq!(FileFormat::from_file_start(b"\x00\x01\x02\xff"), None);
}

fn two_triangles() -> Result<MeshData, Error> {
    let mut mesh = MeshData::new();
    mesh.set_dim(2);
    mesh.set_vertex_per_face(3);
    for v in &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
        mesh.add_vertex(v);
    }
    mesh.add_face(&[0, 1, 2]);
    mesh.add_face(&[0, 2, 3]);

    mesh.declare_attribute("face_label", ElementKind::Face, AttrKind::Int, 1)?;
    mesh.add_int_values("face_label", &[4, 5])?;
    mesh.declare_attribute("vertex_weight", ElementKind::Vertex, AttrKind::Float, 1)?;
    mesh.add_float_values("vertex_weight", &[0.1, 0.2, 0.3, 0.4])?;

    Ok(mesh)
}

#[test]
fn mesh_data_counts() -> Result<(), Error> {
    let mesh = two_triangles()?;

    assert_eq!(mesh.num_vertices(), 4);
    assert_eq!(mesh.vertex_arity(), 2);
    assert_eq!(mesh.num_faces(), 2);
    assert_eq!(mesh.num_voxels(), 0);
    assert_eq!(mesh.attribute_size("face_label"), Some(2));
    assert_eq!(mesh.attribute_size("face_nope"), None);
    assert_eq!(mesh.float_attribute_names(), vec!["vertex_weight"]);
    assert_eq!(mesh.int_attribute_names(), vec!["face_label"]);

    let mut faces = [0; 6];
    mesh.export_faces(&mut faces);
    assert_eq!(faces, [0, 1, 2, 0, 2, 3]);

    Ok(())
}

#[test]
fn export_attributes() -> Result<(), Error> {
    crate::test_utils::init_logger();
    let mesh = two_triangles()?;

    let mut labels = [0.0; 2];
    mesh.export_float_attribute("face_label", &mut labels);
    assert_eq!(labels, [4.0, 5.0]);

    let mut weights = [0; 4];
    mesh.export_int_attribute("vertex_weight", &mut weights);
    assert_eq!(weights, [0; 4]);

    // Missing attribute: buffer untouched
    let mut untouched = [7.0; 3];
    mesh.export_float_attribute("vertex_normal", &mut untouched);
    assert_eq!(untouched, [7.0; 3]);

    let mut untouched = [7; 3];
    mesh.export_int_attribute("vertex_normal", &mut untouched);
    assert_eq!(untouched, [7; 3]);

    Ok(())
}

#[test]
fn transfer_to_copies_everything() -> Result<(), Error> {
    let mesh = two_triangles()?;

    let mut copy = MeshData::new();
    mesh.transfer_to(&mut copy)?;
    assert_eq!(copy, mesh);
    assert_eq!(copy.attribute("vertex_weight"), Some(&AttributeValues::Float(vec![0.1, 0.2, 0.3, 0.4])));

    // Transferring twice declares the attributes twice
    let res = mesh.transfer_to(&mut copy);
    assert!(matches!(res, Err(Error::DuplicateAttribute { .. })));

    Ok(())
}

#[test]
fn add_values_to_undeclared_attribute() {
    let mut mesh = MeshData::new();
    let res = mesh.add_float_values("vertex_foo", &[1.0]);
    assert!(matches!(res, Err(Error::AttributeNotFound(_))));
}
