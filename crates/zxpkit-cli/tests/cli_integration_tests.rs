//! Integration tests for the zxpkit binary.
//!
//! Each test runs the binary inside a scratch project directory, so relative
//! paths in the project file resolve the way they do for users.

#![allow(non_snake_case)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<macromedia-extension name="Timeline Tools" version="1.2.0" type="command" requires-restart="false" locked="false">
  <author name="Studio Ops"/>
  <products>
    <product name="Flash" version="12" primary="true"/>
  </products>
  <description><![CDATA[Adds <timeline> helpers.]]></description>
  <files/>
</macromedia-extension>"#;

const PROJECT: &str = r#"
manifest = "extension.mxi"
output = "dist/timeline-tools.zxp"

[[include]]
source = "Commands/Timeline Tools.jsfl"
destination = "$flash/Commands"

[[include]]
source = "build/panel.swf"
archive-path = "WindowSWF/Timeline.swf"
destination = "$flash/WindowSWF"

[[include]]
archive-path = "Commands/lib.jsfl"
destination = "$flash/Commands"
concat = { sources = ["lib/a.js", "lib/b.js"] }
"#;

/// Lay out a complete project in a scratch directory.
fn create_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let write = |relative: &str, contents: &str| {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    };

    write("extension.mxi", MANIFEST);
    write("zxpkit.toml", PROJECT);
    write("Commands/Timeline Tools.jsfl", "fl.trace('timeline');");
    write("build/panel.swf", "SWF");
    write("lib/a.js", "var a = 1;\n");
    write("lib/b.js", "var b = 2;\n");
    dir
}

fn zxpkit(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zxpkit"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("FLASH_CONFIG_DIR")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn build___default_project___writes_package() {
    let project = create_project();

    let output = zxpkit(project.path(), &["build"]);

    assert!(output.status.success(), "{output:?}");
    assert!(project.path().join("dist/timeline-tools.zxp").is_file());
    assert!(stdout(&output).contains("Package created"));
}

#[test]
fn build___then_list_json___reports_entries_in_include_order() {
    let project = create_project();
    assert!(zxpkit(project.path(), &["build"]).status.success());

    let output = zxpkit(
        project.path(),
        &["list", "dist/timeline-tools.zxp", "--json"],
    );

    assert!(output.status.success(), "{output:?}");
    let listing: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let entries: Vec<&str> = listing["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        entries,
        vec![
            "Commands/Timeline Tools.jsfl",
            "WindowSWF/Timeline.swf",
            "Commands/lib.jsfl",
            "extension_data.mxi",
        ]
    );
    assert_eq!(listing["name"], "Timeline Tools");
    assert_eq!(listing["files"][1]["destination"], "$flash/WindowSWF");
}

#[test]
fn build___missing_source___fails_without_package() {
    let project = create_project();
    fs::remove_file(project.path().join("build/panel.swf")).unwrap();

    let output = zxpkit(project.path(), &["build"]);

    assert!(!output.status.success());
    assert!(!project.path().join("dist/timeline-tools.zxp").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("include #2"));
}

#[test]
fn check___valid_project___succeeds_without_writing() {
    let project = create_project();

    let output = zxpkit(project.path(), &["check"]);

    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("Project is valid"));
    assert!(!project.path().join("dist").exists());
}

#[test]
fn watch___without_config_dir___fails() {
    let project = create_project();

    let output = zxpkit(project.path(), &["watch"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--config-dir"));
}

#[test]
fn list___missing_package___fails() {
    let project = create_project();

    let output = zxpkit(project.path(), &["list", "missing.zxp"]);

    assert!(!output.status.success());
}
