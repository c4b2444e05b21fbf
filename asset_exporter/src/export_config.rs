use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::logical_path::LogicalPath;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// The `.asset` file that gets written.
    pub archive_path: PathBuf,
    /// Prepended to every in-archive path except the index.
    pub logical_prefix: String,
    /// Extensions of files in the staging directory that get packed even if nothing referenced them.
    pub image_extensions: Vec<String>,
    pub index_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            archive_path: "scene.asset".into(),
            logical_prefix: String::new(),
            image_extensions: ["png", "jpg", "bmp", "tga", "hdr"]
                .into_iter()
                .map(String::from)
                .collect(),
            index_name: "INDEX".into(),
        }
    }
}

impl ExportConfig {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export config {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid export config {:?}", path))
    }

    /// Where the individual files are written before they are packed.
    /// `out/level.asset` stages into `out/level_root`.
    pub fn get_staging_dir(&self) -> PathBuf {
        let stem = self
            .archive_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".into());
        let mut path = self
            .archive_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        path.push(format!("{stem}_root"));
        path
    }

    pub fn logical_path(&self, file_name: &str) -> LogicalPath {
        LogicalPath::with_prefix(&self.logical_prefix, file_name)
    }

    pub fn index_path(&self) -> LogicalPath {
        LogicalPath::new(&self.index_name)
    }

    pub fn is_image_file(&self, path: &Path) -> bool {
        match path.extension() {
            Some(extension) => self
                .image_extensions
                .iter()
                .any(|image| extension.eq_ignore_ascii_case(image.as_str())),
            None => false,
        }
    }
}
