//! Error types for bundle operations.

use thiserror::Error;

/// Errors that can occur during bundle operations.
#[derive(Debug, Error)]
pub enum BundleError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed manifest document.
    #[error("XML error: {0}")]
    Xml(String),

    /// Required attribute absent from a manifest element.
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// Attribute present but not one of its allowed values.
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    /// Required child element absent from the manifest document.
    #[error("Required element <{0}> not found")]
    MissingElement(String),

    /// Manifest validation error.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Archive path or source path rejected.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Payload source file not found.
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    /// Missing required file in an existing package.
    #[error("Missing required file: {0}")]
    MissingFile(String),

    /// Filesystem observer error.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Endpoint configuration supplied by the caller could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<quick_xml::Error> for BundleError {
    fn from(err: quick_xml::Error) -> Self {
        BundleError::Xml(err.to_string())
    }
}

impl BundleError {
    /// True for errors raised while reading a manifest document.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            BundleError::Xml(_)
                | BundleError::MissingAttribute { .. }
                | BundleError::InvalidAttribute { .. }
                | BundleError::MissingElement(_)
        )
    }

    /// True for invariant violations caught before anything is written.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            BundleError::InvalidManifest(_) | BundleError::InvalidPath(_)
        )
    }

    pub(crate) fn missing_attribute(element: &str, attribute: &str) -> Self {
        BundleError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub(crate) fn invalid_attribute(element: &str, attribute: &str, value: &str) -> Self {
        BundleError::InvalidAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}
