//! Build command implementation

use crate::project::Project;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use zxpkit_bundle::{ExtensionBuilder, Manifest};

/// Run the build command
pub fn run(config: &Path, output: Option<PathBuf>) -> Result<()> {
    let project = Project::from_file(config)?;
    let output_path = output.unwrap_or_else(|| project.output.clone());

    let manifest = Manifest::from_file(&project.manifest).with_context(|| {
        format!("Failed to load manifest: {}", project.manifest.display())
    })?;

    println!("Building package: {} v{}", manifest.name, manifest.version);

    let endpoints = project.endpoints()?;
    for endpoint in &endpoints {
        match endpoint.source_path() {
            Some(source) => println!(
                "  Adding file: {} -> {}",
                source.display(),
                endpoint.archive_path()
            ),
            None => println!("  Adding generated file: {}", endpoint.archive_path()),
        }
    }

    let manifest = ExtensionBuilder::new(manifest)
        .extend(endpoints)
        .write(&output_path)
        .with_context(|| format!("Failed to write package: {}", output_path.display()))?;

    println!(
        "Package created: {} ({} files)",
        output_path.display(),
        manifest.files.len()
    );
    Ok(())
}
