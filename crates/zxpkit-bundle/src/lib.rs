//! Extension package format for zxpkit
//!
//! This crate provides types and utilities for assembling `.zxp`/`.mxp`
//! extension packages - zip archives holding payload files plus a generated
//! `extension_data.mxi` manifest describing where each file is installed and
//! which host products the extension supports.
//!
//! # Package Structure
//!
//! ```text
//! my-tool-1.0.0.zxp
//! ├── extension_data.mxi          # generated manifest (XML)
//! ├── Commands/
//! │   └── My Tool.jsfl            # installed to $flash/Commands
//! └── WindowSWF/
//!     └── My Panel.swf            # installed to $flash/WindowSWF
//! ```
//!
//! # Example
//!
//! ```no_run
//! use zxpkit_bundle::{ExtensionBuilder, FileEndpoint, Manifest};
//!
//! let manifest = Manifest::from_file("extension.mxi")?;
//! ExtensionBuilder::new(manifest)
//!     .add(FileEndpoint::file("Commands/My Tool.jsfl", "$flash/Commands")?)
//!     .add(FileEndpoint::data("1.0.0", "$flash/Commands", "Commands/version.txt")?)
//!     .write("dist/my-tool-1.0.0.zxp")?;
//! # Ok::<(), zxpkit_bundle::BundleError>(())
//! ```
//!
//! During development, [`Mirror`] watches the source tree and copies every
//! edited payload file straight into an installed copy of the extension.

mod error;
mod manifest;

pub mod builder;
pub mod endpoint;
pub mod loader;
pub mod mirror;
pub mod preprocess;
pub mod xml;

pub use builder::{ExtensionBuilder, assemble, build};
pub use endpoint::{FileData, FileEndpoint};
pub use error::BundleError;
pub use loader::ExtensionLoader;
pub use manifest::{ExtensionKind, FileEntry, FileType, Manifest, Product};
pub use mirror::{
    EndpointSource, GeneratedTarget, InstallRoot, Mirror, MirrorTarget, canonical_path,
};
pub use preprocess::{ConcatFiles, Preprocessor};

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Conventional file extension for packages targeting current hosts.
pub const PACKAGE_EXTENSION: &str = "zxp";

/// Reserved archive entry holding the serialized manifest.
pub const MANIFEST_FILE: &str = "extension_data.mxi";

/// Root element of the manifest document.
pub const MANIFEST_ROOT: &str = "macromedia-extension";

/// Symbolic destination root that stands for the host's configuration directory.
pub const DEFAULT_ROOT_TOKEN: &str = "$flash";
