//! Watch command implementation

use crate::project::Project;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use zxpkit_bundle::{BundleError, BundleResult, FileEndpoint, InstallRoot, Mirror};

/// Run the watch command
///
/// The project file is re-read every time the mapping is refreshed, and
/// editing it triggers a refresh, so changes to its include list apply
/// without a restart.
pub fn run(config: &Path, config_dir: PathBuf, token: &str, root: &Path) -> Result<()> {
    let mirror = start_mirror(config, config_dir, token)?;

    println!(
        "Mirroring {} files into {}",
        mirror.targets().len(),
        mirror.install_root().dir().display()
    );
    for target in mirror.targets().values() {
        println!(
            "  {} -> {}",
            target.source.display(),
            target.destination.display()
        );
    }
    for generated in mirror.generated() {
        println!(
            "  {} inputs -> {}",
            generated.inputs.len(),
            generated.destination.display()
        );
    }
    println!("Press Ctrl+C to stop");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime
        .block_on(mirror.watch(root))
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    Ok(())
}

fn start_mirror(
    config: &Path,
    config_dir: PathBuf,
    token: &str,
) -> Result<Mirror<impl Fn() -> BundleResult<Vec<FileEndpoint>>>> {
    let install_root = InstallRoot::new(config_dir).with_token(token);
    let project_file = config.to_path_buf();

    let mirror = Mirror::new(move || project_endpoints(&project_file), install_root)
        .context("Failed to build the watch mapping")?;
    Ok(mirror.refresh_on(config))
}

fn project_endpoints(config: &Path) -> BundleResult<Vec<FileEndpoint>> {
    Project::from_file(config)
        .and_then(|project| project.endpoints())
        .map_err(|e| BundleError::Config(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn project_endpoints___invalid_project___returns_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("zxpkit.toml");
        fs::write(&config, "manifest = ").unwrap();

        let result = project_endpoints(&config);

        assert!(matches!(result, Err(BundleError::Config(_))));
    }

    #[test]
    fn project_endpoints___reads_current_project() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("zxpkit.toml");
        fs::write(
            &config,
            "manifest = \"m.mxi\"\noutput = \"o.zxp\"\n\n[[include]]\narchive-path = \"x.txt\"\ndestination = \"$flash\"\ntext = \"x\"\n",
        )
        .unwrap();

        let endpoints = project_endpoints(&config).unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].archive_path(), "x.txt");
    }

    #[test]
    fn start_mirror___edited_project_file___picks_up_new_include() {
        let temp_dir = TempDir::new().unwrap();
        let install = TempDir::new().unwrap();
        let root = temp_dir.path().display().to_string().replace('\\', "/");
        let config = temp_dir.path().join("zxpkit.toml");
        let header = format!(
            "manifest = \"{root}/m.mxi\"\noutput = \"{root}/o.zxp\"\n\n[[include]]\narchive-path = \"x.txt\"\ndestination = \"$flash\"\ntext = \"x\"\n"
        );
        fs::write(&config, &header).unwrap();
        let tool = temp_dir.path().join("tool.jsfl");
        fs::write(&tool, "// tool").unwrap();

        let mut mirror = start_mirror(&config, install.path().to_path_buf(), "$flash").unwrap();
        assert!(mirror.targets().is_empty());

        fs::write(
            &config,
            format!(
                "{header}\n[[include]]\nsource = \"{root}/tool.jsfl\"\narchive-path = \"tool.jsfl\"\ndestination = \"$flash\"\n"
            ),
        )
        .unwrap();
        let event = notify::Event::new(notify::EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(config.clone());
        mirror.handle_event(&event);

        assert!(mirror.target_for(&tool).is_some());
    }
}
