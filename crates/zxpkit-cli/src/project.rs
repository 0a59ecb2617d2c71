//! Project file parsing
//!
//! A project file names the manifest source, the package to write and the
//! ordered list of files to include. Relative paths are resolved against the
//! working directory.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use zxpkit_bundle::{ConcatFiles, FileData, FileEndpoint, Preprocessor};

/// Default project file name.
pub const PROJECT_FILE: &str = "zxpkit.toml";

/// zxpkit.toml structure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Project {
    /// Manifest source document.
    pub manifest: PathBuf,

    /// Package to write.
    pub output: PathBuf,

    #[serde(default, rename = "include")]
    pub includes: Vec<IncludeSpec>,
}

/// One `[[include]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IncludeSpec {
    #[serde(default)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub archive_path: Option<String>,

    pub destination: String,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub concat: Option<ConcatSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcatSpec {
    pub sources: Vec<PathBuf>,

    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl Project {
    /// Load a project from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid project file: {}", path.display()))
    }

    /// Parse a project from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let project: Self = toml::from_str(content).context("Failed to parse project file")?;
        project.validate()?;
        Ok(project)
    }

    /// Check the shape of every include table.
    pub fn validate(&self) -> Result<()> {
        if self.includes.is_empty() {
            bail!("At least one [[include]] entry is required");
        }

        for (index, include) in self.includes.iter().enumerate() {
            include
                .validate()
                .with_context(|| format!("include #{}", index + 1))?;
        }

        Ok(())
    }

    /// Build the endpoints in include order.
    ///
    /// Sources are checked and preprocessors run here, so the result reflects
    /// the files on disk at the time of the call.
    pub fn endpoints(&self) -> Result<Vec<FileEndpoint>> {
        self.includes
            .iter()
            .enumerate()
            .map(|(index, include)| {
                include
                    .endpoint()
                    .with_context(|| format!("include #{}", index + 1))
            })
            .collect()
    }
}

impl IncludeSpec {
    fn validate(&self) -> Result<()> {
        let kinds = [
            self.source.is_some(),
            self.text.is_some(),
            self.concat.is_some(),
        ];
        if kinds.iter().filter(|set| **set).count() != 1 {
            bail!("Exactly one of `source`, `text` or `concat` must be set");
        }

        if self.source.is_none() && self.archive_path.is_none() {
            bail!("`archive-path` is required for generated content");
        }

        Ok(())
    }

    /// Endpoint described by this include.
    pub fn endpoint(&self) -> Result<FileEndpoint> {
        self.validate()?;

        let endpoint = match (&self.source, &self.archive_path) {
            (Some(source), Some(archive_path)) => {
                FileEndpoint::relocated(source, &self.destination, archive_path)?
            }
            (Some(source), None) => FileEndpoint::file(source, &self.destination)?,
            (None, Some(archive_path)) => {
                if let Some(text) = &self.text {
                    FileEndpoint::data(
                        FileData::Text(text.clone()),
                        &self.destination,
                        archive_path,
                    )?
                } else if let Some(concat) = &self.concat {
                    ConcatFiles::new(concat.sources.iter().cloned())
                        .strict(concat.strict)
                        .into_endpoint(&self.destination, archive_path)?
                } else {
                    bail!("Exactly one of `source`, `text` or `concat` must be set");
                }
            }
            (None, None) => bail!("`archive-path` is required for generated content"),
        };

        Ok(endpoint)
    }
}
