mod gltf_sourcer;
mod json_sourcer;

pub use gltf_sourcer::*;
pub use json_sourcer::*;

use std::path::Path;

use asset_common::SceneSnapshot;

use crate::geometry_exporter::GeometryTable;

/// What a scene source hands to the exporter.
pub struct LoadedScene {
    pub scene: SceneSnapshot,
    pub geometry: GeometryTable,
}

pub trait SceneSource {
    /// Rough filtering for files.
    /// Concrete checks are done when loading.
    fn can_potentially_handle(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> anyhow::Result<LoadedScene>;
}

/// Every scene source this crate knows about.
pub fn scene_sources() -> Vec<Box<dyn SceneSource>> {
    vec![Box::new(JsonSceneSource {}), Box::new(GltfSceneSource {})]
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    match path.extension() {
        Some(extension) => extensions
            .iter()
            .any(|candidate| extension.eq_ignore_ascii_case(candidate)),
        None => false,
    }
}
