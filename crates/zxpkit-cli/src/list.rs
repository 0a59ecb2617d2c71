//! List command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use zxpkit_bundle::ExtensionLoader;

#[derive(Debug, Serialize)]
pub struct PackageListing {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub author: Option<String>,
    pub products: Vec<ProductListing>,
    pub files: Vec<FileListing>,
    pub entries: Vec<EntryListing>,
}

#[derive(Debug, Serialize)]
pub struct ProductListing {
    pub name: String,
    pub version: String,
    pub primary: bool,
}

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub source: String,
    pub destination: String,
    #[serde(rename = "file-type")]
    pub file_type: String,
}

#[derive(Debug, Serialize)]
pub struct EntryListing {
    pub name: String,
    pub sha256: String,
}

/// Read a package into a listing.
pub fn describe(package_path: &Path) -> Result<PackageListing> {
    let mut loader = ExtensionLoader::open(package_path)
        .with_context(|| format!("Failed to open: {}", package_path.display()))?;

    let mut entries = Vec::new();
    for name in loader.list_files() {
        let sha256 = loader.file_sha256(&name)?;
        entries.push(EntryListing { name, sha256 });
    }

    let manifest = loader.manifest();
    Ok(PackageListing {
        name: manifest.name.clone(),
        version: manifest.version.clone(),
        kind: manifest.kind.to_string(),
        author: manifest.author.clone(),
        products: manifest
            .products
            .iter()
            .map(|p| ProductListing {
                name: p.name.clone(),
                version: p.version.clone(),
                primary: p.primary,
            })
            .collect(),
        files: manifest
            .files
            .iter()
            .map(|f| FileListing {
                source: f.source.clone(),
                destination: f.destination.clone(),
                file_type: f.file_type.as_str().to_string(),
            })
            .collect(),
        entries,
    })
}

/// List contents of a package.
pub fn run(package_path: &Path, json: bool) -> Result<()> {
    let listing = describe(package_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!(
        "Package: {} v{} ({})",
        listing.name, listing.version, listing.kind
    );
    if let Some(author) = &listing.author {
        println!("Author: {author}");
    }

    println!("\nProducts:");
    for product in &listing.products {
        let primary = if product.primary { " (primary)" } else { "" };
        println!("  {} {}{primary}", product.name, product.version);
    }

    println!("\nFiles:");
    for file in &listing.files {
        println!("  {} -> {}", file.source, file.destination);
    }

    println!("\nEntries:");
    for entry in &listing.entries {
        println!("  {}  {}", entry.sha256, entry.name);
    }

    Ok(())
}
