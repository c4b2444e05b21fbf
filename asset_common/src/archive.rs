//! The BOXF container.
//!
//! ```text
//! char[4]  magic = "BOXF"
//! u64      entry count
//! per entry: u32 path length, path bytes, u64 data offset, u64 data size
//! payload: entry data, concatenated in index order
//! ```
//!
//! All integers are little endian. Offsets are absolute from the start of the file,
//! entries are byte adjacent without padding.

use std::io::{self, Write};

use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"BOXF";

/// Magic plus the entry count.
pub const HEADER_SIZE: u64 = 4 + 8;

#[derive(Debug, Error)]
pub enum ArchiveFormatError {
    #[error("archive path {0:?} is not ASCII")]
    NonAsciiPath(String),
    #[error("archive path of {0} bytes does not fit the index")]
    PathTooLong(usize),
}

/// One index record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub logical_path: String,
    pub data_offset: u64,
    pub data_size: u64,
}

impl ArchiveEntry {
    pub fn data_end(&self) -> u64 {
        self.data_offset + self.data_size
    }
}

/// Size of a single index record for the given path.
pub fn index_record_size(logical_path: &str) -> u64 {
    4 + logical_path.len() as u64 + 8 + 8
}

/// Where every entry ends up, computed before a single byte is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveLayout {
    /// `files` are `(logical path, data size)` pairs in archive order.
    pub fn new<I, S>(files: I) -> Result<Self, ArchiveFormatError>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let files: Vec<(String, u64)> = files
            .into_iter()
            .map(|(path, size)| (path.into(), size))
            .collect();

        let mut index_size = 0;
        for (path, _) in files.iter() {
            validate_path(path)?;
            index_size += index_record_size(path);
        }

        let mut data_offset = HEADER_SIZE + index_size;
        let entries = files
            .into_iter()
            .map(|(logical_path, data_size)| {
                let entry = ArchiveEntry {
                    logical_path,
                    data_offset,
                    data_size,
                };
                data_offset += data_size;
                entry
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn index_size(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| index_record_size(&entry.logical_path))
            .sum()
    }

    /// Offset of the first payload byte.
    pub fn data_start(&self) -> u64 {
        HEADER_SIZE + self.index_size()
    }

    pub fn total_size(&self) -> u64 {
        self.data_start()
            + self
                .entries
                .iter()
                .map(|entry| entry.data_size)
                .sum::<u64>()
    }

    /// Writes the header and the index. The payload has to follow directly.
    pub fn write_index(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&(self.entries.len() as u64).to_le_bytes())?;
        for entry in self.entries.iter() {
            let path = entry.logical_path.as_bytes();
            // Checked when the layout was created
            let path_len = path.len() as u32;
            writer.write_all(&path_len.to_le_bytes())?;
            writer.write_all(path)?;
            writer.write_all(&entry.data_offset.to_le_bytes())?;
            writer.write_all(&entry.data_size.to_le_bytes())?;
        }
        Ok(())
    }
}

fn validate_path(path: &str) -> Result<(), ArchiveFormatError> {
    if !path.is_ascii() {
        return Err(ArchiveFormatError::NonAsciiPath(path.to_string()));
    }
    if u32::try_from(path.len()).is_err() {
        return Err(ArchiveFormatError::PathTooLong(path.len()));
    }
    Ok(())
}
