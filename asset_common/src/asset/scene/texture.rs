use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// What a material property points at, as written by the host.
/// Either the name of an image in the host's [`ImageTable`] or a raw file path.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct TextureRef(String);
impl TextureRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Images known to the host, by name.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ImageTable {
    images: HashMap<String, PathBuf>,
}

impl ImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, file_path: impl Into<PathBuf>) {
        self.images.insert(name.into(), file_path.into());
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.images.get(name).map(|path| path.as_path())
    }
}

/// Outcome of looking a [`TextureRef`] up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTexture {
    /// Found in the image table.
    Image(PathBuf),
    /// Not an image name, the raw reference was used as a path.
    RawPath(PathBuf),
}

impl ImageTable {
    /// Turns a reference into an absolute path. Relative paths are taken relative to
    /// `base_dir`, which is usually the directory the scene was loaded from.
    pub fn resolve(&self, reference: &TextureRef, base_dir: &Path) -> ResolvedTexture {
        let absolute = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            }
        };
        match self.get(reference.as_str()) {
            Some(path) => ResolvedTexture::Image(absolute(path)),
            None => ResolvedTexture::RawPath(absolute(Path::new(reference.as_str()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_names_win_over_raw_paths() {
        let mut images = ImageTable::new();
        images.insert("wood", "/tmp/tex/wood.png");

        let resolved = images.resolve(&TextureRef::new("wood"), Path::new("/scenes"));
        assert_eq!(resolved, ResolvedTexture::Image("/tmp/tex/wood.png".into()));
    }

    #[test]
    fn unknown_references_fall_back_to_the_raw_path() {
        let images = ImageTable::new();
        let resolved = images.resolve(&TextureRef::new("tex/stone.png"), Path::new("/scenes"));
        assert_eq!(
            resolved,
            ResolvedTexture::RawPath(Path::new("/scenes").join("tex/stone.png"))
        );
    }
}
