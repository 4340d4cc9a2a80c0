//! End-to-end tests for the `kiln` binary.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use assert_cmd::Command;
use image::{ImageBuffer, ImageFormat, Rgba};
use predicates::prelude::*;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn logo() -> Vec<u8> {
    let img = ImageBuffer::from_fn(32, 32, |x, y| Rgba([x as u8 * 8, y as u8 * 8, 90, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "src/index.js",
        b"import { title } from './title';\nimport './main.scss';\nconsole.log(title);\n",
    );
    write(root, "src/title.js", b"export const title = 'kiln';\n");
    write(root, "src/main.scss", b"$pad: 0;\nbody { margin: $pad; }\n");
    write(
        root,
        "src/index.html",
        b"<html><head><title>Home</title></head><body></body></html>",
    );
    write(root, "src/images/icon.png", &logo());
    dir
}

fn kiln() -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("KILN_DEV_SERVER__PORT")
        .env_remove("KILN_OUT_DIR")
        .env_remove("KILN_FILENAME");
    cmd
}

#[test]
fn test_help_lists_commands() {
    kiln()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_inspect_prints_production_config_by_default() {
    let dir = project();
    let output = kiln()
        .args(["inspect", "--cwd"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mode"], "production");
    assert_eq!(json["devServer"]["port"], 9001);
    assert_eq!(json["devServer"]["watch"]["notification"], "content-changed");
    assert_eq!(json["output"]["filename"], "bundle.js");
}

#[test]
fn test_inspect_reads_mode_from_passthrough_args() {
    let dir = project();
    let output = kiln()
        .args(["inspect", "--cwd"])
        .arg(dir.path())
        .args(["--", "--mode=development", "--hot"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mode"], "development");
    assert_eq!(json["optimization"]["minimizer"], serde_json::json!([]));
}

#[test]
fn test_inspect_honors_settings_file() {
    let dir = project();
    write(
        dir.path(),
        "kiln.config.json",
        br#"{ "out_dir": "dist", "dev_server": { "port": 3000 } }"#,
    );

    let output = kiln()
        .args(["inspect", "--cwd"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["devServer"]["port"], 3000);
    assert!(json["output"]["path"].as_str().unwrap().ends_with("dist"));
}

#[test]
fn test_build_writes_public_dir() {
    let dir = project();
    kiln()
        .args(["build", "--cwd"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Build Summary"));

    let public = dir.path().join("public");
    let bundle = fs::read_to_string(public.join("bundle.js")).unwrap();
    assert!(!bundle.contains("console.log"));
    assert!(public.join("bundle.js.map").is_file());
    assert!(public.join("main.css").is_file());

    let page = fs::read_to_string(public.join("index.html")).unwrap();
    assert!(page.contains(r#"<script src="bundle.js"></script>"#));
}

#[test]
fn test_clean_removes_stale_files() {
    let dir = project();
    write(dir.path(), "public/stale.js", b"old");

    kiln()
        .args(["build", "--clean", "--mode", "development", "--cwd"])
        .arg(dir.path())
        .assert()
        .success();

    let public = dir.path().join("public");
    assert!(!public.join("stale.js").exists());
    assert!(public.join("bundle.js").is_file());
    assert!(!public.join("main.css").exists());
}

#[test]
fn test_missing_favicon_fails_with_hint() {
    let dir = project();
    fs::remove_file(dir.path().join("src/images/icon.png")).unwrap();

    kiln()
        .args(["build", "--cwd"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("icon.png"))
        .stderr(predicate::str::contains("Hint:"));

    assert!(!dir.path().join("public/bundle.js").exists());
}

#[test]
fn test_unresolved_import_fails_the_build() {
    let dir = project();
    write(dir.path(), "src/index.js", b"import 'missing-package';\n");

    kiln()
        .args(["build", "--cwd"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing-package"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = project();
    kiln()
        .args(["inspect", "--config", "does-not-exist.json", "--cwd"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
