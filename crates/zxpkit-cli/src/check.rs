//! Check command implementation

use crate::project::Project;
use anyhow::{Context, Result};
use std::path::Path;
use zxpkit_bundle::{FileEntry, Manifest};

/// Summary of a successful dry run.
#[derive(Debug)]
pub struct CheckReport {
    pub manifest: Manifest,
    pub generated: usize,
}

/// Load the project and manifest, resolve every include and validate the
/// manifest as it would be written, without touching the output path.
pub fn dry_run(config: &Path) -> Result<CheckReport> {
    let project = Project::from_file(config)?;

    let mut manifest = Manifest::from_file(&project.manifest).with_context(|| {
        format!("Failed to load manifest: {}", project.manifest.display())
    })?;

    let endpoints = project.endpoints()?;
    let generated = endpoints
        .iter()
        .filter(|e| e.data_contents().is_some())
        .count();
    for endpoint in &endpoints {
        manifest.add_file(FileEntry::new(
            endpoint.archive_path(),
            endpoint.destination_dir(),
        ));
    }

    manifest
        .validate()
        .context("Manifest would be rejected at build time")?;

    Ok(CheckReport {
        manifest,
        generated,
    })
}

/// Check command implementation
pub fn run(config: &Path) -> Result<()> {
    println!("Checking project: {}", config.display());

    let report = dry_run(config)?;
    let manifest = &report.manifest;

    println!(
        "✓ Extension: {} v{} ({})",
        manifest.name, manifest.version, manifest.kind
    );
    println!("✓ Products: {}", manifest.products.len());
    println!(
        "✓ Files: {} ({} generated)",
        manifest.files.len(),
        report.generated
    );
    println!("\nProject is valid!");

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_project(temp_dir: &TempDir, manifest: &str) -> PathBuf {
        let root = temp_dir.path().display().to_string().replace('\\', "/");
        fs::write(temp_dir.path().join("extension.mxi"), manifest).unwrap();
        fs::write(temp_dir.path().join("tool.jsfl"), "// tool").unwrap();
        let config = temp_dir.path().join("zxpkit.toml");
        fs::write(
            &config,
            format!(
                r#"manifest = "{root}/extension.mxi"
output = "{root}/dist/tool.zxp"

[[include]]
source = "{root}/tool.jsfl"
archive-path = "Commands/Tool.jsfl"
destination = "$flash/Commands"

[[include]]
archive-path = "Commands/version.txt"
destination = "$flash/Commands"
text = "1.0.0"
"#
            ),
        )
        .unwrap();
        config
    }

    #[test]
    fn dry_run___valid_project___reports_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = write_project(
            &temp_dir,
            r#"<macromedia-extension name="tool" version="1.0.0" type="panel" requires-restart="false" locked="false">
  <products><product name="Flash" version="12" primary="true"/></products>
  <files/>
</macromedia-extension>"#,
        );

        let report = dry_run(&config).unwrap();

        assert_eq!(report.manifest.files.len(), 2);
        assert_eq!(report.generated, 1);
        assert!(!temp_dir.path().join("dist").exists());
        run(&config).unwrap();
    }

    #[test]
    fn dry_run___no_products___returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = write_project(
            &temp_dir,
            r#"<macromedia-extension name="tool" version="1.0.0" type="command" requires-restart="false" locked="false">
  <products/>
  <files/>
</macromedia-extension>"#,
        );

        let err = dry_run(&config).unwrap_err();

        assert!(err.to_string().contains("rejected at build time"));
    }

    #[test]
    fn dry_run___malformed_manifest___returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = write_project(
            &temp_dir,
            r#"<macromedia-extension name="tool" version="1.0.0" type="command" requires-restart="maybe" locked="false">
  <products><product name="Flash" version="12" primary="true"/></products>
  <files/>
</macromedia-extension>"#,
        );

        let err = dry_run(&config).unwrap_err();

        assert!(err.to_string().contains("Failed to load manifest"));
    }
}
