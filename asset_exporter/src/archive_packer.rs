use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use asset_common::archive::{ArchiveEntry, ArchiveLayout};
use uuid::Uuid;

use crate::{asset_collector::PackEntry, error::ExportError};

/// Writes `entries` into a BOXF archive at `archive_path`.
///
/// Sizes are taken up front so that the index can be written before the payload.
/// The archive only appears at `archive_path` once it is complete, a failed write leaves
/// whatever was there before untouched.
pub fn pack_archive(
    archive_path: &Path,
    entries: &[PackEntry],
) -> Result<Vec<ArchiveEntry>, ExportError> {
    let mut sizes = Vec::with_capacity(entries.len());
    for entry in entries.iter() {
        let metadata = fs::metadata(&entry.source).map_err(|source| ExportError::MissingSource {
            logical_path: entry.logical_path.to_string(),
            path: entry.source.clone(),
            source,
        })?;
        sizes.push((entry.logical_path.as_str(), metadata.len()));
    }
    let layout = ArchiveLayout::new(sizes)?;

    let temp_file = TempFile::new(temp_path_for(archive_path));
    let file = File::create(temp_file.path())
        .map_err(ExportError::io("Failed to create", temp_file.path()))?;
    let mut writer = BufWriter::new(file);

    layout
        .write_index(&mut writer)
        .map_err(ExportError::io("Failed to write the index of", archive_path))?;
    for (entry, record) in entries.iter().zip(layout.entries.iter()) {
        copy_payload(&mut writer, entry, record.data_size)?;
    }
    writer
        .flush()
        .map_err(ExportError::io("Failed to write", temp_file.path()))?;
    drop(writer);

    temp_file.persist(archive_path)?;
    log::info!(
        "Packed {} entries ({} bytes) into {:?}",
        layout.entries.len(),
        layout.total_size(),
        archive_path
    );
    Ok(layout.entries)
}

fn copy_payload(
    writer: &mut impl Write,
    entry: &PackEntry,
    expected_size: u64,
) -> Result<(), ExportError> {
    let missing = |source: io::Error| ExportError::MissingSource {
        logical_path: entry.logical_path.to_string(),
        path: entry.source.clone(),
        source,
    };
    let file = File::open(&entry.source).map_err(missing)?;
    // One byte more than expected, to notice files that grew
    let mut reader = file.take(expected_size + 1);
    let copied = io::copy(&mut reader, writer).map_err(missing)?;
    if copied != expected_size {
        return Err(ExportError::SourceChanged {
            path: entry.source.clone(),
        });
    }
    Ok(())
}

/// `out/level.asset` is written as `out/.level.asset.<uuid>.tmp` first.
fn temp_path_for(archive_path: &Path) -> PathBuf {
    let file_name = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    archive_path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
}

/// A temporary file that will be deleted when dropped, unless it is persisted.
struct TempFile {
    path: Option<PathBuf>,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Moves the file to its final place.
    fn persist(mut self, destination: &Path) -> Result<(), ExportError> {
        let path = match self.path.take() {
            Some(path) => path,
            None => return Ok(()),
        };
        if let Err(err) = fs::rename(&path, destination) {
            self.path = Some(path);
            return Err(ExportError::Io {
                context: "Failed to move the finished archive to",
                path: destination.to_path_buf(),
                source: err,
            });
        }
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            if let Err(err) = fs::remove_file(path) {
                if err.kind() != io::ErrorKind::NotFound {
                    log::warn!("Failed to remove temporary file {:?}: {}", path, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use asset_common::archive::HEADER_SIZE;

    use crate::logical_path::LogicalPath;

    use super::*;

    fn entry(dir: &Path, name: &str, content: &[u8]) -> PackEntry {
        let source = dir.join(name);
        fs::write(&source, content).expect("write");
        PackEntry {
            logical_path: LogicalPath::new(name),
            source,
        }
    }

    fn leftover_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn payload_follows_the_index() {
        let dir = tempfile::tempdir().expect("temp dir");
        let entries = vec![
            entry(dir.path(), "a.entity", b"name: \"a\";\n"),
            entry(dir.path(), "b.png", b"\x89PNG"),
        ];
        let archive_path = dir.path().join("scene.asset");

        let packed = pack_archive(&archive_path, &entries).expect("pack");

        let bytes = fs::read(&archive_path).expect("read archive");
        let index_size = (4 + 8 + 16) + (4 + 5 + 16);
        assert_eq!(packed[0].data_offset, HEADER_SIZE + index_size);
        assert_eq!(packed[1].data_offset, packed[0].data_end());
        assert_eq!(bytes.len() as u64, packed[1].data_end());
        assert_eq!(&bytes[..4], b"BOXF");
        assert_eq!(&bytes[4..12], &2u64.to_le_bytes());
        let start = packed[1].data_offset as usize;
        assert_eq!(&bytes[start..], b"\x89PNG");
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[test]
    fn missing_source_leaves_no_archive() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut entries = vec![entry(dir.path(), "a.entity", b"a")];
        entries.push(PackEntry {
            logical_path: LogicalPath::new("gone.png"),
            source: dir.path().join("gone.png"),
        });
        let archive_path = dir.path().join("scene.asset");

        let result = pack_archive(&archive_path, &entries);

        assert!(matches!(result, Err(ExportError::MissingSource { .. })));
        assert!(!archive_path.exists());
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_pack_keeps_the_previous_archive() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive_path = dir.path().join("scene.asset");
        fs::write(&archive_path, b"previous").expect("write");
        let entries = vec![entry(dir.path(), "caf\u{e9}.png", b"x")];

        let result = pack_archive(&archive_path, &entries);

        assert!(matches!(result, Err(ExportError::Archive(_))));
        assert_eq!(fs::read(&archive_path).expect("read"), b"previous");
    }

    #[test]
    fn size_change_during_the_copy_is_detected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let entry = entry(dir.path(), "a.obj", b"o A\n");
        let result = copy_payload(&mut Vec::<u8>::new(), &entry, 2);
        assert!(matches!(result, Err(ExportError::SourceChanged { .. })));
    }
}
