//! Package reading utilities.
//!
//! The [`ExtensionLoader`] opens a built package, parses its manifest and
//! gives access to the payload entries.

use crate::{BundleError, BundleResult, MANIFEST_FILE, Manifest};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Loader for extension packages.
///
/// # Example
///
/// ```no_run
/// use zxpkit_bundle::ExtensionLoader;
///
/// let mut loader = ExtensionLoader::open("dist/my-tool.zxp")?;
/// println!("{} v{}", loader.manifest().name, loader.manifest().version);
///
/// for name in loader.list_files() {
///     let digest = loader.file_sha256(&name)?;
///     println!("{digest}  {name}");
/// }
/// # Ok::<(), zxpkit_bundle::BundleError>(())
/// ```
#[derive(Debug)]
pub struct ExtensionLoader {
    archive: ZipArchive<File>,
    manifest: Manifest,
}

impl ExtensionLoader {
    /// Open a package file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> BundleResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let manifest = {
            let mut manifest_file = archive.by_name(MANIFEST_FILE).map_err(|_| {
                BundleError::MissingFile(format!("{MANIFEST_FILE} not found in package"))
            })?;

            let mut manifest_xml = String::new();
            manifest_file.read_to_string(&mut manifest_xml)?;
            Manifest::from_xml(&manifest_xml)?
        };

        Ok(Self { archive, manifest })
    }

    /// Get the package manifest.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Read an entry as bytes.
    pub fn read_file(&mut self, path: &str) -> BundleResult<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| BundleError::MissingFile(format!("File not found in package: {path}")))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Read an entry as a string.
    pub fn read_file_string(&mut self, path: &str) -> BundleResult<String> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| BundleError::MissingFile(format!("File not found in package: {path}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }

    /// SHA-256 of an entry, hex encoded.
    pub fn file_sha256(&mut self, path: &str) -> BundleResult<String> {
        Ok(compute_sha256(&self.read_file(path)?))
    }

    /// List all entries, manifest included, in archive order.
    #[must_use]
    pub fn list_files(&self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.name_for_index(i).map(String::from))
            .collect()
    }

    /// Payload entries only.
    #[must_use]
    pub fn payload_files(&self) -> Vec<String> {
        self.list_files()
            .into_iter()
            .filter(|name| name != MANIFEST_FILE)
            .collect()
    }

    /// Check if an entry exists.
    #[must_use]
    pub fn has_file(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }
}

/// Compute SHA256 hash of data and return as hex string.
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::{ExtensionBuilder, ExtensionKind, FileEndpoint, Product};
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_package(temp_dir: &TempDir) -> PathBuf {
        let package_path = temp_dir.path().join("test.zxp");

        let source = temp_dir.path().join("tool.jsfl");
        fs::write(&source, b"fl.trace('hi');").unwrap();

        let mut manifest = Manifest::new("test-tool", "1.0.0", ExtensionKind::Command);
        manifest.add_product(Product::new("Flash", "12", true));

        ExtensionBuilder::new(manifest)
            .add(FileEndpoint::relocated(&source, "$flash/Commands", "Commands/tool.jsfl").unwrap())
            .add(FileEndpoint::data("1.0.0", "$flash/Commands", "Commands/version.txt").unwrap())
            .write(&package_path)
            .unwrap();

        package_path
    }

    #[test]
    fn compute_sha256___returns_consistent_hash() {
        let hash1 = compute_sha256(b"hello world");
        let hash2 = compute_sha256(b"hello world");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn ExtensionLoader___open___reads_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let package_path = create_test_package(&temp_dir);

        let loader = ExtensionLoader::open(&package_path).unwrap();

        assert_eq!(loader.manifest().name, "test-tool");
        assert_eq!(loader.manifest().files.len(), 2);
    }

    #[test]
    fn ExtensionLoader___open___nonexistent_file___returns_error() {
        let result = ExtensionLoader::open("/nonexistent/package.zxp");

        assert!(matches!(result, Err(BundleError::Io(_))));
    }

    #[test]
    fn ExtensionLoader___open___not_a_zip___returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let fake = temp_dir.path().join("fake.zxp");
        fs::write(&fake, b"not a zip file").unwrap();

        let result = ExtensionLoader::open(&fake);

        assert!(matches!(result, Err(BundleError::Zip(_))));
    }

    #[test]
    fn ExtensionLoader___open___missing_manifest___returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let package_path = temp_dir.path().join("no-manifest.zxp");

        let file = File::create(&package_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("some-file.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"content").unwrap();
        zip.finish().unwrap();

        let err = ExtensionLoader::open(&package_path).unwrap_err();

        assert!(matches!(err, BundleError::MissingFile(_)));
        assert!(err.to_string().contains(MANIFEST_FILE));
    }

    #[test]
    fn ExtensionLoader___list_files___manifest_is_last() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ExtensionLoader::open(create_test_package(&temp_dir)).unwrap();

        assert_eq!(
            loader.list_files(),
            vec![
                "Commands/tool.jsfl".to_string(),
                "Commands/version.txt".to_string(),
                MANIFEST_FILE.to_string(),
            ]
        );
        assert_eq!(loader.payload_files().len(), 2);
    }

    #[test]
    fn ExtensionLoader___read_file___returns_contents() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ExtensionLoader::open(create_test_package(&temp_dir)).unwrap();

        assert_eq!(
            loader.read_file("Commands/tool.jsfl").unwrap(),
            b"fl.trace('hi');"
        );
        assert_eq!(
            loader.read_file_string("Commands/version.txt").unwrap(),
            "1.0.0"
        );
    }

    #[test]
    fn ExtensionLoader___read_file___missing_entry___returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ExtensionLoader::open(create_test_package(&temp_dir)).unwrap();

        let result = loader.read_file("Commands/missing.jsfl");

        assert!(matches!(result, Err(BundleError::MissingFile(_))));
        assert!(!loader.has_file("Commands/missing.jsfl"));
    }

    #[test]
    fn ExtensionLoader___file_sha256___matches_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ExtensionLoader::open(create_test_package(&temp_dir)).unwrap();

        assert_eq!(
            loader.file_sha256("Commands/tool.jsfl").unwrap(),
            compute_sha256(b"fl.trace('hi');")
        );
    }
}
