//! Development-mode mirroring.
//!
//! A [`Mirror`] maps every file-backed endpoint to the place it is installed
//! on the host and, while watching, copies a source file over its installed
//! copy each time it changes. Generated endpoints that remember their inputs
//! are rewritten when one of those inputs changes.
//!
//! The mapping is rebuilt from its [`EndpointSource`] after every event that
//! touches a mapped file or a path registered with [`Mirror::refresh_on`].
//! Registering the project file makes edits to the endpoint set take effect
//! without restarting; otherwise they are only seen after the next change to
//! an already mapped file.
//!
//! Filesystem events arrive on the observer's own thread and are handed over
//! a channel to the single loop that owns the mapping.

use crate::{BundleError, BundleResult, DEFAULT_ROOT_TOKEN, FileData, FileEndpoint};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;

/// Supplies the current endpoint set. Called once on start and again after
/// every mirrored change.
pub trait EndpointSource {
    fn endpoints(&self) -> BundleResult<Vec<FileEndpoint>>;
}

impl<F> EndpointSource for F
where
    F: Fn() -> BundleResult<Vec<FileEndpoint>>,
{
    fn endpoints(&self) -> BundleResult<Vec<FileEndpoint>> {
        self()
    }
}

/// Host install directory standing behind the symbolic destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoot {
    token: String,
    dir: PathBuf,
}

impl InstallRoot {
    /// Install root for the default `$flash` token.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            token: DEFAULT_ROOT_TOKEN.to_string(),
            dir: dir.into(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Substitute the token at the start of `destination`.
    ///
    /// Destinations that do not start with the token are used as given.
    #[must_use]
    pub fn resolve(&self, destination: &str) -> PathBuf {
        match destination.strip_prefix(self.token.as_str()) {
            Some("") => self.dir.clone(),
            Some(rest) if rest.starts_with(['/', '\\']) => {
                self.dir.join(rest.trim_start_matches(['/', '\\']))
            }
            _ => PathBuf::from(destination),
        }
    }
}

/// Where one watched source file is copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTarget {
    /// Source file as configured.
    pub source: PathBuf,
    /// Absolute install path.
    pub destination: PathBuf,
}

/// Installed copy of a generated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTarget {
    /// Canonical paths of the files the contents are built from.
    pub inputs: Vec<PathBuf>,
    /// Absolute install path.
    pub destination: PathBuf,
    /// Contents as of the last refresh.
    pub data: FileData,
}

/// Source-to-installed-copy mapping plus the loop that keeps it applied.
pub struct Mirror<S> {
    source: S,
    install_root: InstallRoot,
    targets: HashMap<PathBuf, MirrorTarget>,
    generated: Vec<GeneratedTarget>,
    refresh_paths: Vec<PathBuf>,
}

impl<S: EndpointSource> Mirror<S> {
    /// Build the initial mapping.
    pub fn new(source: S, install_root: InstallRoot) -> BundleResult<Self> {
        let mut mirror = Self {
            source,
            install_root,
            targets: HashMap::new(),
            generated: Vec::new(),
            refresh_paths: Vec::new(),
        };
        mirror.refresh()?;
        Ok(mirror)
    }

    /// Also rebuild the mapping when `path` changes, without copying it.
    /// Meant for the file the endpoint source reads its configuration from.
    #[must_use]
    pub fn refresh_on<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.refresh_paths.push(canonical_path(path.as_ref()));
        self
    }

    /// Paths registered with [`Mirror::refresh_on`], canonicalized.
    #[must_use]
    pub fn refresh_paths(&self) -> &[PathBuf] {
        &self.refresh_paths
    }

    /// Rebuild the mapping from the endpoint source. Returns the number of
    /// mirrored source files.
    pub fn refresh(&mut self) -> BundleResult<usize> {
        let endpoints = self.source.endpoints()?;
        self.targets = mirror_targets(&endpoints, &self.install_root);
        self.generated = generated_targets(&endpoints, &self.install_root);
        tracing::debug!(
            files = self.targets.len(),
            generated = self.generated.len(),
            "Mirror mapping rebuilt"
        );
        Ok(self.targets.len())
    }

    /// Current mapping, keyed by canonical source path.
    #[must_use]
    pub fn targets(&self) -> &HashMap<PathBuf, MirrorTarget> {
        &self.targets
    }

    /// Installed path for a source file, if it is watched.
    #[must_use]
    pub fn target_for(&self, path: &Path) -> Option<&Path> {
        self.targets
            .get(&canonical_path(path))
            .map(|t| t.destination.as_path())
    }

    /// Generated endpoints with at least one input.
    #[must_use]
    pub fn generated(&self) -> &[GeneratedTarget] {
        &self.generated
    }

    #[must_use]
    pub fn install_root(&self) -> &InstallRoot {
        &self.install_root
    }

    /// Apply one filesystem event. Returns the number of files written.
    ///
    /// Paths outside the mapping are ignored. A failed write is logged and
    /// skipped. After any matching path the mapping is rebuilt; if that fails
    /// the previous mapping stays in place and no generated file is
    /// rewritten. Generated files are written from the rebuilt mapping, so
    /// they carry the contents of their inputs as of this event.
    pub fn handle_event(&mut self, event: &Event) -> usize {
        if !is_change(&event.kind) {
            return 0;
        }

        let mut matched = false;
        let mut regenerate: Vec<PathBuf> = Vec::new();
        let mut written = 0;

        for path in &event.paths {
            let key = canonical_path(path);

            if self.refresh_paths.contains(&key) {
                matched = true;
            }
            for generated in self.generated.iter().filter(|g| g.inputs.contains(&key)) {
                matched = true;
                if !regenerate.contains(&generated.destination) {
                    regenerate.push(generated.destination.clone());
                }
            }

            let Some(target) = self.targets.get(&key) else {
                continue;
            };
            matched = true;

            match copy_file(&target.source, &target.destination) {
                Ok(bytes) => {
                    written += 1;
                    tracing::info!(
                        source = %target.source.display(),
                        destination = %target.destination.display(),
                        bytes,
                        "Mirrored file"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        source = %target.source.display(),
                        destination = %target.destination.display(),
                        error = %e,
                        "Failed to mirror file"
                    );
                }
            }
        }

        if !matched {
            return written;
        }
        if let Err(e) = self.refresh() {
            tracing::error!(error = %e, "Failed to refresh mirror mapping, keeping previous one");
            return written;
        }

        for destination in &regenerate {
            let Some(generated) = self.generated.iter().find(|g| &g.destination == destination)
            else {
                continue;
            };

            match write_file(&generated.destination, generated.data.as_bytes()) {
                Ok(()) => {
                    written += 1;
                    tracing::info!(
                        destination = %generated.destination.display(),
                        bytes = generated.data.as_bytes().len(),
                        "Regenerated file"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %generated.destination.display(),
                        error = %e,
                        "Failed to regenerate file"
                    );
                }
            }
        }

        written
    }

    /// Watch `root` recursively and mirror changes until Ctrl+C.
    pub async fn watch<P: AsRef<Path>>(self, root: P) -> BundleResult<()> {
        let interrupt = async {
            tokio::signal::ctrl_c().await?;
            tracing::info!("Interrupt received, stopping watcher");
            Ok::<(), BundleError>(())
        };
        self.run_until(root.as_ref(), interrupt).await
    }

    async fn run_until<F>(mut self, root: &Path, shutdown: F) -> BundleResult<()>
    where
        F: Future<Output = BundleResult<()>>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            // The receiver only goes away when the loop below has ended.
            let _ = tx.send(result);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        let watched_root = canonical_path(root);
        for path in &self.refresh_paths {
            if !path.starts_with(&watched_root) {
                watcher.watch(path, RecursiveMode::NonRecursive)?;
            }
        }

        tracing::info!(
            root = %root.display(),
            files = self.targets.len(),
            "Watching for changes"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                received = rx.recv() => match received {
                    Some(Ok(event)) => {
                        self.handle_event(&event);
                    }
                    Some(Err(e)) => tracing::error!(error = %e, "File watcher error"),
                    None => break,
                },
            }
        }

        drop(watcher);
        Ok(())
    }
}

/// Map canonical source paths to install paths for every file-backed
/// endpoint. Data endpoints have nothing to watch and are left out.
pub fn mirror_targets(
    endpoints: &[FileEndpoint],
    install_root: &InstallRoot,
) -> HashMap<PathBuf, MirrorTarget> {
    endpoints
        .iter()
        .filter_map(|endpoint| {
            let source = endpoint.source_path()?;
            Some((
                canonical_path(source),
                MirrorTarget {
                    source: source.to_path_buf(),
                    destination: install_path(endpoint, install_root),
                },
            ))
        })
        .collect()
}

/// Install paths of the data endpoints that were generated from files.
/// Fixed data has no inputs and is left out.
pub fn generated_targets(
    endpoints: &[FileEndpoint],
    install_root: &InstallRoot,
) -> Vec<GeneratedTarget> {
    endpoints
        .iter()
        .filter(|endpoint| !endpoint.watched_files().is_empty())
        .filter_map(|endpoint| {
            let data = endpoint.data_contents()?;
            Some(GeneratedTarget {
                inputs: endpoint
                    .watched_files()
                    .iter()
                    .map(|input| canonical_path(input))
                    .collect(),
                destination: install_path(endpoint, install_root),
                data: data.clone(),
            })
        })
        .collect()
}

fn install_path(endpoint: &FileEndpoint, install_root: &InstallRoot) -> PathBuf {
    resolve_path(
        &install_root
            .resolve(endpoint.destination_dir())
            .join(endpoint.archive_path()),
    )
}

/// Comparison key for a path: absolute, symlinks resolved as far as the path
/// exists, no trailing separator, and case-folded on platforms whose
/// filesystems are case-insensitive by default.
#[must_use]
pub fn canonical_path(path: &Path) -> PathBuf {
    let resolved = resolve_path(path);
    if cfg!(any(windows, target_os = "macos")) {
        if let Some(s) = resolved.to_str() {
            return PathBuf::from(s.to_lowercase());
        }
    }
    resolved
}

/// Absolute, symlink-resolved form of a path that may not exist yet. The
/// deepest existing ancestor is canonicalized and the rest re-appended.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if let Ok(resolved) = dunce::canonicalize(&absolute) {
        return resolved;
    }

    // Parent segments of a missing path cannot be resolved by the OS.
    let normalized = lexical_normalize(&absolute);
    let mut existing = normalized.as_path();
    let mut missing: Vec<&OsStr> = Vec::new();
    loop {
        if let Ok(resolved) = dunce::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |acc, segment| acc.join(segment));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(_)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

fn copy_file(source: &Path, destination: &Path) -> std::io::Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)
}

fn write_file(destination: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, contents)
}
