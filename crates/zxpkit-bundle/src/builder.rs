//! Package assembly.
//!
//! [`assemble`] writes every endpoint into a zip archive, records a manifest
//! entry for each one and finishes with the serialized manifest. The
//! [`ExtensionBuilder`] wraps it with output-file handling.

use crate::{BundleError, BundleResult, FileEndpoint, FileEntry, MANIFEST_FILE, Manifest};
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builder for creating extension packages.
///
/// # Example
///
/// ```no_run
/// use zxpkit_bundle::{ExtensionBuilder, ExtensionKind, FileEndpoint, Manifest, Product};
///
/// let mut manifest = Manifest::new("My Tool", "1.0.0", ExtensionKind::Command);
/// manifest.add_product(Product::new("Flash", "12", true));
///
/// ExtensionBuilder::new(manifest)
///     .add(FileEndpoint::relocated("src/tool.jsfl", "$flash/Commands", "Commands/My Tool.jsfl")?)
///     .write("dist/my-tool.zxp")?;
/// # Ok::<(), zxpkit_bundle::BundleError>(())
/// ```
pub struct ExtensionBuilder {
    manifest: Manifest,
    endpoints: Vec<FileEndpoint>,
}

impl ExtensionBuilder {
    /// Create a new builder around a manifest.
    ///
    /// File records already present in the manifest are kept; one more is
    /// appended per endpoint when the package is written.
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            endpoints: Vec::new(),
        }
    }

    /// Add one payload endpoint.
    #[must_use]
    pub fn add(mut self, endpoint: FileEndpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Add endpoints in iteration order.
    #[must_use]
    pub fn extend<I: IntoIterator<Item = FileEndpoint>>(mut self, endpoints: I) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Write the package, creating parent directories as needed.
    ///
    /// On failure the partially written file is removed. Returns the manifest
    /// as it was serialized into the package.
    pub fn write<P: AsRef<Path>>(mut self, output_path: P) -> BundleResult<Manifest> {
        let output_path = output_path.as_ref();

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let result = write_package(output_path, &mut self.manifest, &self.endpoints);

        if let Err(err) = result {
            if let Err(cleanup) = fs::remove_file(output_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %output_path.display(),
                        error = %cleanup,
                        "Failed to remove incomplete package"
                    );
                }
            }
            return Err(err);
        }

        tracing::info!(
            path = %output_path.display(),
            files = self.endpoints.len(),
            "Package written"
        );
        Ok(self.manifest)
    }

    /// Get the current manifest (for inspection).
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get a mutable reference to the manifest (for modification).
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Endpoints queued so far.
    #[must_use]
    pub fn endpoints(&self) -> &[FileEndpoint] {
        &self.endpoints
    }
}

/// Load a manifest document and package `endpoints` into `output_path`.
pub fn build<M, O, I>(manifest_path: M, output_path: O, endpoints: I) -> BundleResult<Manifest>
where
    M: AsRef<Path>,
    O: AsRef<Path>,
    I: IntoIterator<Item = FileEndpoint>,
{
    let manifest = Manifest::from_file(manifest_path)?;
    ExtensionBuilder::new(manifest)
        .extend(endpoints)
        .write(output_path)
}

/// Write endpoints and the manifest into an open archive.
///
/// Endpoints are written strictly in order, and each one appends a file
/// record to `manifest` (duplicates included). The manifest entry is written
/// last; if the manifest fails validation nothing more is written and the
/// error is returned, leaving the archive unfinished.
pub fn assemble<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    manifest: &mut Manifest,
    endpoints: &[FileEndpoint],
) -> BundleResult<()> {
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for endpoint in endpoints {
        write_endpoint(zip, endpoint, options)?;

        manifest.add_file(FileEntry::new(
            endpoint.archive_path(),
            endpoint.destination_dir(),
        ));
    }

    let manifest_xml = manifest.to_xml()?;
    zip.start_file(MANIFEST_FILE, options)?;
    zip.write_all(manifest_xml.as_bytes())?;

    Ok(())
}

fn write_package(
    output_path: &Path,
    manifest: &mut Manifest,
    endpoints: &[FileEndpoint],
) -> BundleResult<()> {
    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(file);

    assemble(&mut zip, manifest, endpoints)?;

    zip.finish()?;
    Ok(())
}

fn write_endpoint<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    endpoint: &FileEndpoint,
    options: SimpleFileOptions,
) -> BundleResult<()> {
    let archive_path = endpoint.archive_path();
    if archive_path == MANIFEST_FILE {
        return Err(BundleError::InvalidPath(format!(
            "{MANIFEST_FILE} is reserved for the manifest"
        )));
    }

    zip.start_file(archive_path, options)?;

    if let Some(data) = endpoint.data_contents() {
        zip.write_all(data.as_bytes())?;
    } else if let Some(source) = endpoint.source_path() {
        let mut file = File::open(source)
            .map_err(|e| BundleError::SourceNotFound(format!("{}: {e}", source.display())))?;
        io::copy(&mut file, zip)?;
    }

    tracing::debug!(archive_path, destination = endpoint.destination_dir(), "Added file");
    Ok(())
}
