//! Payload descriptors.
//!
//! A [`FileEndpoint`] says where one payload item comes from and where it
//! ends up: its path inside the archive and its install directory on the
//! host. Endpoints backed by a real file can take part in mirroring; data
//! endpoints carry their contents in memory.

use crate::{BundleError, BundleResult};
use std::path::{Component, Path, PathBuf};

/// One payload item of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEndpoint {
    /// Contents streamed from a file on disk.
    Source(SourceFile),
    /// Contents supplied directly.
    Data(DataFile),
}

/// A payload item backed by a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    source: PathBuf,
    destination: String,
    archive_path: String,
}

/// A payload item generated in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    data: FileData,
    destination: String,
    archive_path: String,
    /// Files the contents were generated from.
    inputs: Vec<PathBuf>,
}

/// In-memory contents of a data endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileData {
    Bytes(Vec<u8>),
    Text(String),
}

impl FileData {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }
}

impl From<Vec<u8>> for FileData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for FileData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for FileData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FileData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl FileEndpoint {
    /// Endpoint for a file whose archive path is its path relative to the
    /// current working directory.
    ///
    /// The archive layout therefore depends on where the build runs; use
    /// [`FileEndpoint::relocated`] when the layout must be fixed.
    pub fn file<P: AsRef<Path>>(source: P, destination: &str) -> BundleResult<Self> {
        let source = source.as_ref();
        ensure_file(source)?;
        let archive_path = relative_to_cwd(source)?;

        Ok(Self::Source(SourceFile {
            source: source.to_path_buf(),
            destination: destination.to_string(),
            archive_path,
        }))
    }

    /// Endpoint for a file stored under an explicit archive path.
    pub fn relocated<P: AsRef<Path>>(
        source: P,
        destination: &str,
        archive_path: &str,
    ) -> BundleResult<Self> {
        let source = source.as_ref();
        ensure_file(source)?;
        validate_archive_path(archive_path)?;

        Ok(Self::Source(SourceFile {
            source: source.to_path_buf(),
            destination: destination.to_string(),
            archive_path: archive_path.to_string(),
        }))
    }

    /// Endpoint for contents generated in memory.
    pub fn data(
        data: impl Into<FileData>,
        destination: &str,
        archive_path: &str,
    ) -> BundleResult<Self> {
        Self::generated(data, destination, archive_path, Vec::new())
    }

    /// Endpoint for contents generated from `inputs`. A mirror regenerates
    /// the installed copy when one of them changes.
    pub fn generated(
        data: impl Into<FileData>,
        destination: &str,
        archive_path: &str,
        inputs: Vec<PathBuf>,
    ) -> BundleResult<Self> {
        validate_archive_path(archive_path)?;

        Ok(Self::Data(DataFile {
            data: data.into(),
            destination: destination.to_string(),
            archive_path: archive_path.to_string(),
            inputs,
        }))
    }

    /// Path of the entry inside the archive, `/`-separated.
    #[must_use]
    pub fn archive_path(&self) -> &str {
        match self {
            Self::Source(file) => &file.archive_path,
            Self::Data(file) => &file.archive_path,
        }
    }

    /// Install directory on the host.
    #[must_use]
    pub fn destination_dir(&self) -> &str {
        match self {
            Self::Source(file) => &file.destination,
            Self::Data(file) => &file.destination,
        }
    }

    /// In-memory contents, for data endpoints.
    #[must_use]
    pub fn data_contents(&self) -> Option<&FileData> {
        match self {
            Self::Source(_) => None,
            Self::Data(file) => Some(&file.data),
        }
    }

    /// Files a data endpoint was generated from. Empty for source endpoints
    /// and for fixed data.
    #[must_use]
    pub fn watched_files(&self) -> &[PathBuf] {
        match self {
            Self::Source(_) => &[],
            Self::Data(file) => &file.inputs,
        }
    }

    /// File on disk, for source endpoints.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Self::Source(file) => Some(&file.source),
            Self::Data(_) => None,
        }
    }
}

fn ensure_file(source: &Path) -> BundleResult<()> {
    if source.is_file() {
        Ok(())
    } else {
        Err(BundleError::SourceNotFound(source.display().to_string()))
    }
}

/// Reject archive paths that could land outside the archive root.
fn validate_archive_path(archive_path: &str) -> BundleResult<()> {
    if archive_path.is_empty() {
        return Err(BundleError::InvalidPath(
            "archive path must not be empty".to_string(),
        ));
    }

    let path = Path::new(archive_path);
    let rooted = path.is_absolute()
        || path.has_root()
        || matches!(path.components().next(), Some(Component::Prefix(_)))
        || archive_path.starts_with('/')
        || archive_path.starts_with('\\');
    if rooted {
        return Err(BundleError::InvalidPath(format!(
            "archive path must be relative: {archive_path}"
        )));
    }

    if archive_path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(BundleError::InvalidPath(format!(
            "archive path must not contain '..': {archive_path}"
        )));
    }

    Ok(())
}

fn relative_to_cwd(source: &Path) -> BundleResult<String> {
    let cwd = std::env::current_dir()?;
    let absolute = std::path::absolute(source)?;

    let outside = || {
        BundleError::InvalidPath(format!(
            "{} is outside the working directory; give it an explicit archive path",
            source.display()
        ))
    };
    let relative = absolute.strip_prefix(&cwd).map_err(|_| outside())?;

    let mut segments: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::ParentDir => {
                segments.pop().ok_or_else(outside)?;
            }
            _ => {}
        }
    }

    Ok(segments.join("/"))
}
