use std::{io, path::PathBuf};

use asset_common::{archive::ArchiveFormatError, SceneError};
use thiserror::Error;

/// Everything that makes an export produce no archive.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("source of {logical_path:?} is missing at {path:?}")]
    MissingSource {
        logical_path: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} changed size while it was being packed")]
    SourceChanged { path: PathBuf },

    #[error("failed to export the geometry of node {node:?}")]
    GeometryExport {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context} {path:?}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveFormatError),
}

impl ExportError {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ExportError::Io {
            context,
            path,
            source,
        }
    }
}

/// Things worth telling the caller about that don't stop the export.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// The staging directory existed and was wiped.
    #[error("removed the existing output directory {0:?}")]
    ReplacedOutputDirectory(PathBuf),

    /// A texture reference was not an image name and was used as a path instead.
    #[error("material {material:?} references {reference:?}, which is not a known image, using it as a path")]
    UnresolvedTextureReference { material: String, reference: String },

    /// A different file with the same name was already staged, so this one was skipped.
    #[error("texture {file_name:?} from {skipped:?} was skipped, {kept:?} already provides {file_name}")]
    CopyCollision {
        file_name: String,
        skipped: PathBuf,
        kept: PathBuf,
    },

    /// A node names a parent that isn't part of the scene.
    #[error("node {node:?} has an unknown parent {parent:?}")]
    UnknownParent { node: String, parent: String },
}
