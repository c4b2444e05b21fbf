use std::io::{self, Write};

use asset_common::transform::transform_normal;
use ultraviolet::{Mat4, Vec3};

use super::TriangleMesh;

/// Writes a Wavefront OBJ with one object, triangulated, 1-based indices.
/// Positions are moved by `transform`, normals follow it.
pub fn write_obj(
    writer: &mut impl Write,
    name: &str,
    mesh: &TriangleMesh,
    transform: &Mat4,
) -> io::Result<()> {
    let vertex_count = mesh.positions.len();
    if mesh.indices.len() % 3 != 0 {
        return Err(invalid_data(format!(
            "{} indices don't form triangles",
            mesh.indices.len()
        )));
    }
    if let Some(index) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(invalid_data(format!(
            "index {} is out of bounds for {} vertices",
            index, vertex_count
        )));
    }
    let has_normals = mesh.normals.len() == vertex_count && vertex_count > 0;
    let has_uvs = mesh.uvs.len() == vertex_count && vertex_count > 0;

    writeln!(writer, "o {}", name)?;
    for position in mesh.positions.iter() {
        let p = transform.transform_point3(Vec3::from(*position));
        writeln!(writer, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
    }
    if has_uvs {
        for [u, v] in mesh.uvs.iter() {
            writeln!(writer, "vt {:.6} {:.6}", u, v)?;
        }
    }
    if has_normals {
        for normal in mesh.normals.iter() {
            let n = transform_normal(transform, Vec3::from(*normal));
            writeln!(writer, "vn {:.4} {:.4} {:.4}", n.x, n.y, n.z)?;
        }
    }

    for triangle in mesh.indices.chunks_exact(3) {
        write!(writer, "f")?;
        for index in triangle {
            let i = index + 1;
            match (has_uvs, has_normals) {
                (true, true) => write!(writer, " {i}/{i}/{i}")?,
                (true, false) => write!(writer, " {i}/{i}")?,
                (false, true) => write!(writer, " {i}//{i}")?,
                (false, false) => write!(writer, " {i}")?,
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
    use asset_common::transform::{AxisConversion, UpAxis};

    use super::*;

    fn triangle() -> TriangleMesh {
        TriangleMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            normals: vec![[0.0, -1.0, 0.0]; 3],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn writes_all_attributes() {
        let mut bytes = Vec::new();
        write_obj(&mut bytes, "Tri", &triangle(), &Mat4::identity()).expect("write");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(
            text,
            "o Tri\n\
             v 0.000000 0.000000 0.000000\n\
             v 1.000000 0.000000 0.000000\n\
             v 0.000000 0.000000 1.000000\n\
             vt 0.000000 0.000000\n\
             vt 1.000000 0.000000\n\
             vt 0.000000 1.000000\n\
             vn 0.0000 -1.0000 0.0000\n\
             vn 0.0000 -1.0000 0.0000\n\
             vn 0.0000 -1.0000 0.0000\n\
             f 1/1/1 2/2/2 3/3/3\n"
        );
    }

    #[test]
    fn z_up_geometry_is_converted_to_y_up() {
        let conversion = AxisConversion::from_up_axis(UpAxis::Z);
        let mut bytes = Vec::new();
        write_obj(&mut bytes, "Tri", &triangle(), &conversion.matrix()).expect("write");
        let text = String::from_utf8(bytes).expect("utf8");
        // +Z becomes +Y, -Y becomes +Z
        assert!(text.contains("v 0.000000 1.000000 0.000000\n"));
        assert!(text.contains("vn 0.0000 0.0000 1.0000\n"));
    }

    #[test]
    fn positions_only_mesh_uses_plain_faces() {
        let mesh = TriangleMesh {
            normals: vec![],
            uvs: vec![],
            ..triangle()
        };
        let mut bytes = Vec::new();
        write_obj(&mut bytes, "Tri", &mesh, &Mat4::identity()).expect("write");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.ends_with("f 1 2 3\n"));
        assert!(!text.contains("vt "));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mesh = TriangleMesh {
            indices: vec![0, 1, 7],
            ..triangle()
        };
        let err = write_obj(&mut Vec::new(), "Tri", &mesh, &Mat4::identity()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
