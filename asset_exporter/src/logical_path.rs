use std::fmt;

use relative_path::{RelativePath, RelativePathBuf};
use serde::{Deserialize, Serialize};

/// Name of a file inside the archive.
/// Descriptor files use the same string to point at each other.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub struct LogicalPath(RelativePathBuf);
impl LogicalPath {
    pub fn new(path: &str) -> Self {
        Self(RelativePathBuf::from(path))
    }

    pub fn with_prefix(prefix: &str, file_name: &str) -> Self {
        Self(RelativePath::new(prefix).join(file_name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
