//! Manifest schema for extension packages.
//!
//! The manifest (`extension_data.mxi`) names the extension, lists the host
//! products it supports and records where each payload file is installed.

use crate::xml::{self, XmlElement};
use crate::{BundleError, BundleResult, MANIFEST_ROOT};
use std::fmt;
use std::path::Path;

/// Extension manifest - the descriptor bundled into every package.
///
/// Child elements are always written in the same order, whatever order a
/// loaded document used:
/// `author`, `products`, `update`, `description`, `ui-access`,
/// `license-agreement`, `files`, `signatures`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Extension name.
    pub name: String,

    /// Extension version.
    pub version: String,

    /// How the host presents the extension.
    pub kind: ExtensionKind,

    /// Whether the host must restart after installation.
    pub requires_restart: bool,

    /// Whether the extension can be disabled by the user.
    pub locked: bool,

    /// Author name.
    pub author: Option<String>,

    /// Description text, kept verbatim.
    pub description: Option<String>,

    /// Update URL.
    pub update: Option<String>,

    /// UI access instructions.
    pub ui_access: Option<String>,

    /// License agreement text.
    pub license_agreement: Option<String>,

    /// Opaque signature block.
    pub signatures: Option<String>,

    /// Compatible host products. Must not be empty when serialized.
    pub products: Vec<Product>,

    /// Payload records. Must not be empty when serialized.
    pub files: Vec<FileEntry>,
}

/// Extension type attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    /// Menu command.
    Command,
    /// Dockable panel.
    Panel,
}

/// One compatible host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub version: String,
    pub primary: bool,
}

/// Manifest record for one payload file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path of the file inside the archive.
    pub source: String,

    /// Install directory on the host, usually starting with `$flash`.
    pub destination: String,

    pub file_type: FileType,
}

/// `file-type` attribute of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[default]
    Ordinary,
}

impl ExtensionKind {
    /// Spelling written to the `type` attribute.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Panel => "flashpanel",
        }
    }

    /// Parse the `type` attribute. Matching ignores case and also accepts a
    /// bare `panel`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "command" => Some(Self::Command),
            "panel" | "flashpanel" => Some(Self::Panel),
            _ => None,
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FileType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ordinary" => Some(Self::Ordinary),
            _ => None,
        }
    }
}

impl Product {
    #[must_use]
    pub fn new(name: &str, version: &str, primary: bool) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            primary,
        }
    }

    fn load(element: &XmlElement) -> BundleResult<Self> {
        Ok(Self {
            name: element.required_attribute("name")?.to_string(),
            version: element.required_attribute("version")?.to_string(),
            primary: bool_attribute(element, "primary")?,
        })
    }

    fn dump(&self) -> XmlElement {
        XmlElement::new("product")
            .with_attribute("name", &self.name)
            .with_attribute("version", &self.version)
            .with_attribute("primary", bool_token(self.primary))
    }
}

impl FileEntry {
    #[must_use]
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            file_type: FileType::Ordinary,
        }
    }

    fn load(element: &XmlElement) -> BundleResult<Self> {
        let file_type = match element.attribute("file-type") {
            None => FileType::default(),
            Some(value) => FileType::parse(value)
                .ok_or_else(|| BundleError::invalid_attribute("file", "file-type", value))?,
        };

        Ok(Self {
            source: element.required_attribute("source")?.to_string(),
            destination: element.required_attribute("destination")?.to_string(),
            file_type,
        })
    }

    fn dump(&self) -> XmlElement {
        XmlElement::new("file")
            .with_attribute("source", &self.source)
            .with_attribute("destination", &self.destination)
            .with_attribute("file-type", self.file_type.as_str())
    }
}

impl Manifest {
    /// Create a manifest with the required scalar fields and nothing else.
    #[must_use]
    pub fn new(name: &str, version: &str, kind: ExtensionKind) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            kind,
            requires_restart: false,
            locked: false,
            author: None,
            description: None,
            update: None,
            ui_access: None,
            license_agreement: None,
            signatures: None,
            products: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Add a compatible product.
    pub fn add_product(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Append a payload record. Duplicates are kept.
    pub fn add_file(&mut self, entry: FileEntry) {
        self.files.push(entry);
    }

    /// Build a manifest from a parsed document.
    pub fn load(root: &XmlElement) -> BundleResult<Self> {
        if root.name != MANIFEST_ROOT {
            return Err(BundleError::Xml(format!(
                "expected root element <{MANIFEST_ROOT}>, found <{}>",
                root.name
            )));
        }

        let kind_value = root.required_attribute("type")?;
        let kind = ExtensionKind::parse(kind_value)
            .ok_or_else(|| BundleError::invalid_attribute(&root.name, "type", kind_value))?;

        let products = root
            .child("products")
            .ok_or_else(|| BundleError::MissingElement("products".to_string()))?
            .children_named("product")
            .map(Product::load)
            .collect::<BundleResult<Vec<_>>>()?;

        let files = root
            .child("files")
            .ok_or_else(|| BundleError::MissingElement("files".to_string()))?
            .children_named("file")
            .map(FileEntry::load)
            .collect::<BundleResult<Vec<_>>>()?;

        Ok(Self {
            name: root.required_attribute("name")?.to_string(),
            version: root.required_attribute("version")?.to_string(),
            kind,
            requires_restart: bool_attribute(root, "requires-restart")?,
            locked: bool_attribute(root, "locked")?,
            author: root
                .child("author")
                .and_then(|a| a.attribute("name"))
                .map(String::from),
            description: child_text(root, "description"),
            update: child_text(root, "update"),
            ui_access: child_text(root, "ui-access"),
            license_agreement: child_text(root, "license-agreement"),
            signatures: child_text(root, "signatures"),
            products,
            files,
        })
    }

    /// Build the document tree for this manifest.
    pub fn dump(&self) -> BundleResult<XmlElement> {
        self.validate()?;

        let mut root = XmlElement::new(MANIFEST_ROOT)
            .with_attribute("name", &self.name)
            .with_attribute("version", &self.version)
            .with_attribute("type", self.kind.as_str())
            .with_attribute("requires-restart", bool_token(self.requires_restart))
            .with_attribute("locked", bool_token(self.locked));

        if let Some(author) = &self.author {
            root.push(XmlElement::new("author").with_attribute("name", author));
        }

        let mut products = XmlElement::new("products");
        for product in &self.products {
            products.push(product.dump());
        }
        root.push(products);

        push_text(&mut root, "update", self.update.as_deref());
        push_text(&mut root, "description", self.description.as_deref());
        push_text(&mut root, "ui-access", self.ui_access.as_deref());
        push_text(
            &mut root,
            "license-agreement",
            self.license_agreement.as_deref(),
        );

        let mut files = XmlElement::new("files");
        for file in &self.files {
            files.push(file.dump());
        }
        root.push(files);

        push_text(&mut root, "signatures", self.signatures.as_deref());

        Ok(root)
    }

    /// Validate the invariants checked at serialization time.
    pub fn validate(&self) -> BundleResult<()> {
        if self.products.is_empty() {
            return Err(BundleError::InvalidManifest(
                "at least one product is required".to_string(),
            ));
        }

        if self.files.is_empty() {
            return Err(BundleError::InvalidManifest(
                "at least one file is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a manifest document.
    pub fn from_xml(document: &str) -> BundleResult<Self> {
        Self::load(&xml::parse(document)?)
    }

    /// Read and parse a manifest document from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> BundleResult<Self> {
        let document = std::fs::read_to_string(path.as_ref())?;
        Self::from_xml(&document)
    }

    /// Serialize to a document with the XML declaration the installer expects.
    pub fn to_xml(&self) -> BundleResult<String> {
        xml::to_string(&self.dump()?)
    }
}

fn bool_token(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn bool_attribute(element: &XmlElement, key: &str) -> BundleResult<bool> {
    match element.required_attribute(key)? {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(BundleError::invalid_attribute(&element.name, key, other)),
    }
}

fn child_text(root: &XmlElement, name: &str) -> Option<String> {
    root.child(name).and_then(|c| c.text.clone())
}

fn push_text(root: &mut XmlElement, name: &str, text: Option<&str>) {
    if let Some(text) = text {
        root.push(XmlElement::new(name).with_text(text));
    }
}
