use std::{
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::error::ExportError;

/// The flat working directory where every archive entry is materialized before packing.
pub struct StagingDir {
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(PathBuf),
    /// A file with that name was already staged and was left untouched.
    AlreadyPresent(PathBuf),
}

impl CopyOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CopyOutcome::Copied(path) | CopyOutcome::AlreadyPresent(path) => path,
        }
    }
}

impl StagingDir {
    /// Creates an empty staging directory.
    /// Whatever was at `path` before gets deleted, nothing is merged.
    /// Returns whether something had to be removed.
    pub fn recreate(path: impl Into<PathBuf>) -> Result<(Self, bool), ExportError> {
        let path = path.into();
        let existed = path.exists();
        if existed {
            log::warn!("Removing existing output directory {:?}", path);
            fs::remove_dir_all(&path)
                .map_err(ExportError::io("Failed to remove output directory", &path))?;
        }
        fs::create_dir_all(&path)
            .map_err(ExportError::io("Failed to create output directory", &path))?;
        Ok((Self { path }, existed))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    pub fn write_file(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ExportError> {
        let path = self.file_path(file_name);
        fs::write(&path, contents).map_err(ExportError::io("Failed to write", &path))?;
        log::debug!("Wrote {:?}", path);
        Ok(path)
    }

    /// Copies a file in under its own name, unless that name is already taken.
    /// Existing files are neither overwritten nor compared.
    pub fn copy_in(&self, source: &Path) -> io::Result<CopyOutcome> {
        let file_name = source.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} has no file name", source),
            )
        })?;
        let destination = self.path.join(file_name);
        if destination.exists() {
            return Ok(CopyOutcome::AlreadyPresent(destination));
        }
        fs::copy(source, &destination)?;
        log::debug!("Copied {:?} to {:?}", source, destination);
        Ok(CopyOutcome::Copied(destination))
    }

    /// Files directly inside the staging directory, sorted by name.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Failed to read staging directory entry: {}", err);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files
    }
}
