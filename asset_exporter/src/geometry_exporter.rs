mod obj_writer;

pub use obj_writer::*;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use asset_common::{
    transform::{AxisConversion, UpAxis},
    GeometryKey, SceneNode,
};
use ultraviolet::Mat4;

/// Writes the geometry of a node to a file. The format is up to the exporter.
pub trait GeometryExporter {
    /// File extension of what [`GeometryExporter::export`] writes, without the dot.
    fn extension(&self) -> &str;

    /// Writes the geometry of `node` to `destination`.
    /// Exporters bake `node.world_transform` into the vertices.
    fn export(&mut self, node: &SceneNode, destination: &Path) -> anyhow::Result<()>;
}

/// Replaces the world transform of a node with the identity for as long as it lives,
/// so that exported geometry ends up in object space.
/// The original transform is put back when the guard is dropped, whatever happened in between.
pub struct TransformOverride<'a> {
    node: &'a mut SceneNode,
    original: Mat4,
}

impl<'a> TransformOverride<'a> {
    pub fn identity(node: &'a mut SceneNode) -> Self {
        let original = node.world_transform;
        node.world_transform = Mat4::identity();
        Self { node, original }
    }

    pub fn node(&self) -> &SceneNode {
        self.node
    }
}

impl Drop for TransformOverride<'_> {
    fn drop(&mut self) {
        self.node.world_transform = self.original;
    }
}

/// Triangle soup with optional per vertex attributes.
/// Texture coordinates use a bottom left origin.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct TriangleMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Three per triangle, zero based.
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Appends another mesh, offsetting its indices.
    pub fn append(&mut self, other: TriangleMesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.uvs.extend(other.uvs);
        self.indices
            .extend(other.indices.into_iter().map(|index| index + offset));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    /// A geometry file that already exists, copied as is.
    File(PathBuf),
    Mesh(TriangleMesh),
}

pub type GeometryTable = HashMap<GeometryKey, GeometrySource>;

/// Exports the geometry a scene source loaded next to the scene.
pub struct SceneGeometryExporter {
    geometry: GeometryTable,
    axis_conversion: AxisConversion,
}

impl SceneGeometryExporter {
    pub fn new(geometry: GeometryTable, up_axis: UpAxis) -> Self {
        Self {
            geometry,
            axis_conversion: AxisConversion::from_up_axis(up_axis),
        }
    }
}

impl GeometryExporter for SceneGeometryExporter {
    fn extension(&self) -> &str {
        "obj"
    }

    fn export(&mut self, node: &SceneNode, destination: &Path) -> anyhow::Result<()> {
        let geometry = node
            .kind
            .geometry()
            .ok_or_else(|| anyhow::format_err!("Node {:?} has no geometry", node.name))?;
        let source = self
            .geometry
            .get(&geometry.key)
            .ok_or_else(|| anyhow::format_err!("Geometry {} not found", geometry.key))?;

        match source {
            GeometrySource::File(path) => {
                std::fs::copy(path, destination)
                    .with_context(|| format!("Failed to copy geometry file {:?}", path))?;
            }
            GeometrySource::Mesh(mesh) => {
                let transform = self.axis_conversion.matrix() * node.world_transform;
                let file = std::fs::File::create(destination)
                    .with_context(|| format!("Failed to create {:?}", destination))?;
                let mut writer = std::io::BufWriter::new(file);
                write_obj(&mut writer, &geometry.name, mesh, &transform)?;
                std::io::Write::flush(&mut writer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use asset_common::GeometryRef;
    use ultraviolet::Vec3;

    use super::*;

    struct FailingExporter {
        seen: Option<Mat4>,
    }

    impl GeometryExporter for FailingExporter {
        fn extension(&self) -> &str {
            "obj"
        }

        fn export(&mut self, node: &SceneNode, _destination: &Path) -> anyhow::Result<()> {
            self.seen = Some(node.world_transform);
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn override_is_restored_even_if_the_export_fails() {
        let moved = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mut node =
            SceneNode::mesh("Cube", GeometryRef::named("Cube")).with_root_transform(moved);
        let mut exporter = FailingExporter { seen: None };

        let result = {
            let guard = TransformOverride::identity(&mut node);
            exporter.export(guard.node(), Path::new("Cube.obj"))
        };

        assert!(result.is_err());
        assert_eq!(exporter.seen, Some(Mat4::identity()));
        assert_eq!(node.world_transform, moved);
    }

    #[test]
    fn append_offsets_indices() {
        let triangle = TriangleMesh {
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let mut mesh = triangle.clone();
        mesh.append(triangle);
        assert_eq!(mesh.indices, [0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.positions.len(), 6);
    }

    #[test]
    fn file_geometry_is_copied_verbatim() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = dir.path().join("source.obj");
        std::fs::write(&source, b"o Data\n").expect("write");

        let mut table = GeometryTable::new();
        table.insert(GeometryKey::new("Data"), GeometrySource::File(source));
        let mut exporter = SceneGeometryExporter::new(table, UpAxis::Z);

        let destination = dir.path().join("Data.obj");
        let node = SceneNode::mesh("A", GeometryRef::named("Data"));
        exporter.export(&node, &destination).expect("export");
        assert_eq!(std::fs::read(&destination).expect("read"), b"o Data\n");
    }

    #[test]
    fn unknown_geometry_is_an_error() {
        let mut exporter = SceneGeometryExporter::new(GeometryTable::new(), UpAxis::Z);
        let node = SceneNode::mesh("A", GeometryRef::named("Missing"));
        assert!(exporter.export(&node, Path::new("Missing.obj")).is_err());
    }
}
