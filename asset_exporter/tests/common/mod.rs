//! Reads BOXF archives back, only for checking what the exporter wrote.
#![allow(dead_code)]

use std::path::Path;

use asset_exporter::{
    error::ExportError,
    export_config::ExportConfig,
    export_scene,
    geometry_exporter::{GeometrySource, GeometryTable, SceneGeometryExporter, TriangleMesh},
    ExportReport,
};
use asset_common::{GeometryKey, SceneSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub path: String,
    pub offset: u64,
    pub size: u64,
}

pub struct ReadArchive {
    pub bytes: Vec<u8>,
    pub entry_count: u64,
    pub records: Vec<IndexRecord>,
}

impl ReadArchive {
    pub fn open(path: &Path) -> Self {
        let bytes = std::fs::read(path).expect("read archive");
        assert_eq!(&bytes[..4], b"BOXF", "magic");
        let entry_count = u64::from_le_bytes(bytes[4..12].try_into().expect("count"));

        let mut cursor = 12;
        let mut take = |len: usize| {
            let slice = &bytes[cursor..cursor + len];
            cursor += len;
            slice
        };
        let mut records = Vec::new();
        for _ in 0..entry_count {
            let path_len = u32::from_le_bytes(take(4).try_into().expect("path length")) as usize;
            let path = String::from_utf8(take(path_len).to_vec()).expect("ascii path");
            let offset = u64::from_le_bytes(take(8).try_into().expect("offset"));
            let size = u64::from_le_bytes(take(8).try_into().expect("size"));
            records.push(IndexRecord { path, offset, size });
        }

        Self {
            bytes,
            entry_count,
            records,
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.path.as_str()).collect()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.records
            .iter()
            .find(|record| record.path == path)
            .map(|record| &self.bytes[record.offset as usize..(record.offset + record.size) as usize])
    }

    pub fn text(&self, path: &str) -> String {
        let bytes = self.get(path).unwrap_or_else(|| panic!("no entry {path:?}"));
        String::from_utf8(bytes.to_vec()).expect("utf8 entry")
    }

    /// Size of header plus index, computed from the paths alone.
    pub fn expected_data_start(&self) -> u64 {
        12 + self
            .records
            .iter()
            .map(|record| 4 + record.path.len() as u64 + 16)
            .sum::<u64>()
    }
}

pub fn triangle() -> TriangleMesh {
    TriangleMesh {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        indices: vec![0, 1, 2],
        ..Default::default()
    }
}

/// Exports with in-memory triangles for each of `geometry`.
pub fn export_with_triangles(
    config: &ExportConfig,
    scene: &mut SceneSnapshot,
    geometry: &[&str],
) -> Result<ExportReport, ExportError> {
    let mut table = GeometryTable::new();
    for key in geometry {
        table.insert(GeometryKey::new(*key), GeometrySource::Mesh(triangle()));
    }
    let mut exporter = SceneGeometryExporter::new(table, scene.up_axis);
    export_scene(config, scene, &mut exporter)
}
