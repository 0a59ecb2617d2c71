//! Generated-content hooks for data endpoints.

use crate::{BundleError, BundleResult, FileData, FileEndpoint};
use std::fs;
use std::path::PathBuf;

/// Produces the text of a data endpoint at build time.
pub trait Preprocessor {
    /// Name used to refer to the preprocessor from configuration.
    fn name(&self) -> &'static str;

    /// Files the output is read from.
    fn watched_files(&self) -> &[PathBuf];

    /// Produce the generated text.
    fn run(&mut self) -> BundleResult<String>;

    /// Run and wrap the result in a data endpoint that remembers its inputs.
    fn into_endpoint(mut self, destination: &str, archive_path: &str) -> BundleResult<FileEndpoint>
    where
        Self: Sized,
    {
        let text = self.run()?;
        let inputs = self.watched_files().to_vec();
        FileEndpoint::generated(FileData::Text(text), destination, archive_path, inputs)
    }
}

/// Joins several UTF-8 files into one, each followed by a newline, with
/// trailing newlines stripped from the result.
///
/// In strict mode a missing input is an error; otherwise it is skipped with a
/// warning.
#[derive(Debug, Clone)]
pub struct ConcatFiles {
    sources: Vec<PathBuf>,
    strict: bool,
}

impl ConcatFiles {
    #[must_use]
    pub fn new<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            strict: true,
        }
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

impl Preprocessor for ConcatFiles {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn watched_files(&self) -> &[PathBuf] {
        &self.sources
    }

    fn run(&mut self) -> BundleResult<String> {
        let mut contents = String::new();

        for source in &self.sources {
            if !source.is_file() {
                if self.strict {
                    return Err(BundleError::SourceNotFound(source.display().to_string()));
                }
                tracing::warn!(path = %source.display(), "Source file not found, skipping");
                continue;
            }

            contents.push_str(&fs::read_to_string(source)?);
            contents.push('\n');
        }

        let trimmed = contents.trim_end_matches('\n').len();
        contents.truncate(trimmed);
        Ok(contents)
    }
}
